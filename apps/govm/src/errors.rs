//! Error types for govm.
//!
//! Every toolchain component returns [`GovmError`] so that only the command
//! layer decides how a failure ends the process. Commands wrap these errors in
//! `anyhow::Error` for context, and `main` downcasts back to pick an exit code
//! and print a remedy.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used by the toolchain components.
pub type Result<T, E = GovmError> = std::result::Result<T, E>;

/// Failure conditions of the version-state machine.
#[derive(Debug, Error)]
pub enum GovmError {
    /// The host CPU has no published Go distribution.
    #[error("unsupported architecture: {arch}")]
    UnsupportedArchitecture {
        /// Identifier reported by the host.
        arch: String,
    },

    /// The remote version index could not be queried or held no version.
    #[error("remote version index unavailable: {message}")]
    RemoteUnavailable {
        /// What went wrong.
        message: String,
    },

    /// Network or HTTP failure while retrieving an archive.
    #[error("download failed for {url}: {message}")]
    DownloadFailed {
        /// Archive URL.
        url: String,
        /// What went wrong on the last attempt.
        message: String,
    },

    /// The downloaded archive is not a readable gzip-compressed tar.
    #[error("corrupt archive {}: {message}", path.display())]
    CorruptArchive {
        /// Location of the archive (already removed).
        path: PathBuf,
        /// What the structural check found.
        message: String,
    },

    /// Not enough free space under the install root.
    #[error(
        "insufficient disk space at {}: {required} bytes required, {available} bytes available",
        path.display()
    )]
    InsufficientSpace {
        /// Install root that was checked.
        path: PathBuf,
        /// Bytes required.
        required: u64,
        /// Bytes available.
        available: u64,
    },

    /// A version string is not of the `major.minor[.patch]` shape.
    #[error("invalid version format: '{input}'")]
    InvalidVersionFormat {
        /// The rejected input.
        input: String,
    },

    /// No installed directory exists for the requested version.
    #[error("version {version} is not installed")]
    VersionNotInstalled {
        /// Requested version.
        version: String,
    },

    /// An installed directory is missing its entry-point binary.
    #[error("invalid installation at {}: go binary not found", path.display())]
    InvalidInstallation {
        /// The version directory.
        path: PathBuf,
    },

    /// The active pointer could not be moved to the requested version.
    #[error("failed to switch to {version}: {message}")]
    SwitchFailed {
        /// Requested version.
        version: String,
        /// What went wrong.
        message: String,
    },

    /// The legacy binary did not report a parseable version.
    #[error("cannot determine the version of the installation at {}", path.display())]
    VersionUndeterminable {
        /// Legacy installation directory.
        path: PathBuf,
    },

    /// Migration failed; the legacy installation was restored.
    #[error("migration failed: {message}")]
    MigrationFailed {
        /// What went wrong.
        message: String,
    },

    /// Migration failed and the legacy installation could not be restored.
    #[error("migration failed and could not be undone: {message} (backup kept at {})", backup.display())]
    MigrationUnrecoverable {
        /// Location of the untouched backup copy.
        backup: PathBuf,
        /// What went wrong during the restore.
        message: String,
    },

    /// The filesystem refused an operation for lack of privileges.
    #[error("permission denied: {message}")]
    PermissionDenied {
        /// The operation that was refused.
        message: String,
    },

    /// Any other I/O failure.
    #[error("{message}")]
    Io {
        /// The operation that failed.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The operator interrupted the process.
    #[error("interrupted")]
    Interrupted,
}

impl GovmError {
    /// Wraps an I/O error, routing permission failures to [`GovmError::PermissionDenied`].
    #[must_use]
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        let message = message.into();
        if source.kind() == io::ErrorKind::PermissionDenied {
            Self::PermissionDenied { message }
        } else {
            Self::Io { message, source }
        }
    }

    /// Creates a new `InvalidVersionFormat` error.
    #[must_use]
    pub fn invalid_version(input: impl Into<String>) -> Self {
        Self::InvalidVersionFormat {
            input: input.into(),
        }
    }

    /// Creates a new `RemoteUnavailable` error.
    #[must_use]
    pub fn remote_unavailable(message: impl Into<String>) -> Self {
        Self::RemoteUnavailable {
            message: message.into(),
        }
    }

    /// Creates a new `SwitchFailed` error.
    #[must_use]
    pub fn switch_failed(version: impl ToString, message: impl Into<String>) -> Self {
        Self::SwitchFailed {
            version: version.to_string(),
            message: message.into(),
        }
    }

    /// Creates a new `MigrationFailed` error.
    #[must_use]
    pub fn migration_failed(message: impl Into<String>) -> Self {
        Self::MigrationFailed {
            message: message.into(),
        }
    }

    /// Operator-facing hint for conditions with an obvious remedy.
    #[must_use]
    pub fn remedy(&self) -> Option<&'static str> {
        match self {
            Self::InvalidVersionFormat { .. } => {
                Some("expected a version like 1.23 or 1.23.1 (a leading 'go' is accepted)")
            }
            Self::PermissionDenied { .. } => {
                Some("re-run with elevated privileges or choose a writable --root")
            }
            Self::RemoteUnavailable { .. } | Self::DownloadFailed { .. } | Self::CorruptArchive { .. } => {
                Some("check your network connection and run the command again")
            }
            Self::InsufficientSpace { .. } => Some("free some disk space or run 'govm cleanup'"),
            Self::VersionNotInstalled { .. } => Some("install it first with 'govm install <version>'"),
            Self::InvalidInstallation { .. } => Some("reinstall it with 'govm install --force <version>'"),
            Self::MigrationUnrecoverable { .. } => {
                Some("restore the backup to the install root by hand before running govm again")
            }
            _ => None,
        }
    }
}

impl From<inquire::InquireError> for GovmError {
    fn from(err: inquire::InquireError) -> Self {
        match err {
            inquire::InquireError::OperationInterrupted => Self::Interrupted,
            inquire::InquireError::NotTTY => Self::Io {
                message: "no terminal for interactive prompt; pass --yes to run unattended".to_string(),
                source: io::Error::other("not a tty"),
            },
            inquire::InquireError::IO(source) => Self::io("prompt failed", source),
            other => Self::Io {
                message: format!("prompt failed: {other}"),
                source: io::Error::other(other.to_string()),
            },
        }
    }
}

/// Attaches a message to `std::io::Result` values.
pub trait IoResultExt<T> {
    /// Converts the error with [`GovmError::io`], building the message lazily.
    fn io_context<F, S>(self, message: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn io_context<F, S>(self, message: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| GovmError::io(message(), e))
    }
}
