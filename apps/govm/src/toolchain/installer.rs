//! Transactional installation of one version.
//!
//! An install fetches the archive into the scratch directory, checks free
//! space, extracts into a staging tree beside the final location, and renames
//! the staging tree into place. The completion marker is written last. Every
//! step after the transaction begins runs under a [`TransactionGuard`], so an
//! early return or a dropped future rolls the partial work back.
//!
//! Switching to the new version is a separate step; see
//! [`crate::toolchain::switcher`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::{GovmError, IoResultExt, Result};
use crate::toolchain::archive;
use crate::toolchain::download::{ArchiveFetcher, FetchedArchive, archive_name};
use crate::toolchain::paths::{self, InstallLayout, InstallMarker};
use crate::toolchain::platform::Platform;
use crate::toolchain::transaction::{Transaction, TransactionGuard};
use crate::toolchain::version::ToolchainVersion;

/// Free space multiple required relative to the archive size.
const SPACE_FACTOR: u64 = 2;

/// Reports the bytes available to unprivileged writers under a path.
pub type SpaceProbe = fn(&Path) -> io::Result<u64>;

fn disk_available(path: &Path) -> io::Result<u64> {
    fs4::available_space(path)
}

/// Result of a completed install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOutcome {
    pub version: ToolchainVersion,
    pub dir: PathBuf,
    /// An earlier directory for this version was replaced.
    pub reinstalled: bool,
}

pub struct Installer<'a, F: ArchiveFetcher> {
    layout: &'a InstallLayout,
    fetcher: &'a F,
    platform: Platform,
    space_probe: SpaceProbe,
}

impl<'a, F: ArchiveFetcher> Installer<'a, F> {
    #[must_use]
    pub fn new(layout: &'a InstallLayout, fetcher: &'a F, platform: Platform) -> Self {
        Self {
            layout,
            fetcher,
            platform,
            space_probe: disk_available,
        }
    }

    /// Replaces the free-space probe.
    #[must_use]
    pub fn with_space_probe(mut self, probe: SpaceProbe) -> Self {
        self.space_probe = probe;
        self
    }

    /// Installs `version` into its versioned directory.
    ///
    /// An existing directory for the same version is replaced. The active
    /// pointer is not changed.
    ///
    /// # Errors
    ///
    /// Propagates fetch failures unchanged. Returns
    /// [`GovmError::InsufficientSpace`] when the install root has less than
    /// twice the archive size free, [`GovmError::CorruptArchive`] when the
    /// extracted tree has no `bin/go`, and I/O errors for filesystem failures.
    /// Partial work is rolled back before the error is returned.
    pub async fn install(&self, version: &ToolchainVersion) -> Result<InstallOutcome> {
        let root = self.layout.root();
        fs::create_dir_all(root).io_context(|| format!("failed to create {}", root.display()))?;

        let scratch = self.layout.scratch_dir();
        let mut tx = Transaction::begin(*version, self.layout);
        tx.scratch_archive = Some(scratch.join(archive_name(version, self.platform)));
        let mut guard = TransactionGuard::new(self.layout, tx);
        tracing::debug!(%version, previous = ?guard.record().previous_target, "install started");

        let fetched = self.fetcher.fetch(version, self.platform, &scratch).await?;
        guard.record_mut().scratch_archive = Some(fetched.path.clone());
        self.ensure_space(&fetched)?;

        let staging = self.layout.staging_dir(version);
        if staging.exists() {
            tracing::info!(path = %staging.display(), "removing stale staging directory");
            fs::remove_dir_all(&staging)
                .io_context(|| format!("failed to remove {}", staging.display()))?;
        }
        guard.record_mut().staging_dir = Some(staging.clone());
        archive::extract_tar_gz(&fetched.path, &staging)?;
        if !paths::has_valid_binary(&staging) {
            return Err(GovmError::CorruptArchive {
                path: fetched.path.clone(),
                message: "archive does not contain bin/go".to_string(),
            });
        }

        let dir = self.layout.version_dir(version);
        let reinstalled = dir.exists();
        if reinstalled {
            tracing::info!(path = %dir.display(), "replacing existing installation");
            fs::remove_dir_all(&dir).io_context(|| format!("failed to remove {}", dir.display()))?;
        }

        guard.record_mut().created_dir = Some(dir.clone());
        fs::rename(&staging, &dir).io_context(|| {
            format!("failed to move {} to {}", staging.display(), dir.display())
        })?;
        InstallLayout::write_marker(&dir, &InstallMarker::now(version))?;

        discard_archive(&fetched.path);
        let _ = fs::remove_dir(&scratch);

        guard.commit();
        tracing::info!(%version, dir = %dir.display(), "installed");
        Ok(InstallOutcome {
            version: *version,
            dir,
            reinstalled,
        })
    }

    fn ensure_space(&self, fetched: &FetchedArchive) -> Result<()> {
        let root = self.layout.root();
        let available = (self.space_probe)(root)
            .io_context(|| format!("failed to query free space at {}", root.display()))?;
        let required = fetched.size.saturating_mul(SPACE_FACTOR);
        tracing::debug!(required, available, "disk space check");
        if available < required {
            discard_archive(&fetched.path);
            return Err(GovmError::InsufficientSpace {
                path: root.to_path_buf(),
                required,
                available,
            });
        }
        Ok(())
    }
}

fn discard_archive(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed archive"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove archive"),
    }
}
