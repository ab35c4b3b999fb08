//! Legacy layout conversion.
//!
//! A host that installed Go by hand has a plain directory at `<root>/go`.
//! Migration copies it to a backup, renames it to `<root>/go-<version>`, puts
//! the pointer in its place, and checks that the binary still answers with
//! the same version. The backup is deleted only after that check passes.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::errors::{GovmError, IoResultExt, Result};
use crate::toolchain::paths::{self, InstallLayout, InstallMarker};
use crate::toolchain::prompt::Prompter;
use crate::toolchain::rollback::RollbackReport;
use crate::toolchain::store::{ActiveEntry, ToolchainStore};
use crate::toolchain::transaction::{Transaction, TransactionGuard};
use crate::toolchain::version::ToolchainVersion;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// `<root>/go` is not a legacy directory.
    NotApplicable,
    Declined,
    Migrated {
        version: ToolchainVersion,
        dir: PathBuf,
    },
}

pub struct Migrator<'a, S: ToolchainStore, P: Prompter + ?Sized> {
    layout: &'a InstallLayout,
    store: &'a S,
    prompter: &'a P,
}

impl<'a, S: ToolchainStore, P: Prompter + ?Sized> Migrator<'a, S, P> {
    #[must_use]
    pub fn new(layout: &'a InstallLayout, store: &'a S, prompter: &'a P) -> Self {
        Self {
            layout,
            store,
            prompter,
        }
    }

    /// Converts a legacy installation into a versioned directory plus pointer.
    ///
    /// # Errors
    ///
    /// - [`GovmError::VersionUndeterminable`] if the legacy binary reports no version
    /// - [`GovmError::MigrationFailed`] if verification fails and the legacy
    ///   directory was restored
    /// - [`GovmError::MigrationUnrecoverable`] if the restore itself failed
    /// - Filesystem errors from the backup or rename steps, after rollback
    pub fn migrate(&self) -> Result<MigrationOutcome> {
        let ActiveEntry::Legacy(legacy) = self.store.active_entry() else {
            return Ok(MigrationOutcome::NotApplicable);
        };
        let version = self
            .store
            .query_version(&paths::binary_in(&legacy))
            .ok_or_else(|| GovmError::VersionUndeterminable {
                path: legacy.clone(),
            })?;

        let dir = self.layout.version_dir(&version);
        let question = format!(
            "Go {version} is installed directly at {}. Move it to {} so govm can manage it?",
            legacy.display(),
            dir.display()
        );
        if !self.prompter.confirm(&question, true)? {
            tracing::info!(%version, "migration declined");
            return Ok(MigrationOutcome::Declined);
        }

        let backup = self.layout.backup_dir(&version);
        let mut guard = TransactionGuard::new(self.layout, Transaction::begin(version, self.layout));
        match self.convert(&mut guard, &legacy, &dir, &backup) {
            Ok(()) => {
                if let Err(e) = fs::remove_dir_all(&backup) {
                    tracing::warn!(path = %backup.display(), error = %e, "failed to remove migration backup");
                }
                guard.commit();
                tracing::info!(%version, dir = %dir.display(), "legacy installation migrated");
                Ok(MigrationOutcome::Migrated { version, dir })
            }
            Err(e) => {
                tracing::warn!(%version, error = %e, "migration failed; restoring legacy installation");
                let report = guard.roll_back_now();
                Err(classify_failure(e, &report, backup))
            }
        }
    }

    fn convert(
        &self,
        guard: &mut TransactionGuard<'_>,
        legacy: &Path,
        dir: &Path,
        backup: &Path,
    ) -> Result<()> {
        let version = guard.record().version;

        if backup.exists() {
            tracing::info!(path = %backup.display(), "removing stale migration backup");
            fs::remove_dir_all(backup)
                .io_context(|| format!("failed to remove {}", backup.display()))?;
        }
        guard.record_mut().legacy_backup = Some(backup.to_path_buf());
        tracing::info!(from = %legacy.display(), to = %backup.display(), "backing up legacy installation");
        copy_tree(legacy, backup)?;

        if dir.exists() {
            tracing::info!(path = %dir.display(), "removing existing directory of the same version");
            fs::remove_dir_all(dir).io_context(|| format!("failed to remove {}", dir.display()))?;
        }

        guard.record_mut().created_dir = Some(dir.to_path_buf());
        fs::rename(legacy, dir).io_context(|| {
            format!("failed to move {} to {}", legacy.display(), dir.display())
        })?;
        self.layout.repoint(dir).io_context(|| {
            format!("failed to create {}", self.layout.active_link().display())
        })?;

        let reported = self
            .store
            .query_version(&paths::binary_in(&self.layout.active_link()));
        match reported {
            Some(reported) if version.matches(&reported) => {}
            Some(reported) => {
                return Err(GovmError::migration_failed(format!(
                    "migrated binary reports {reported}, expected {version}"
                )));
            }
            None => {
                return Err(GovmError::migration_failed(
                    "migrated binary did not report a version",
                ));
            }
        }

        InstallLayout::write_marker(dir, &InstallMarker::now(&version))
    }
}

/// Maps a failed conversion to the error reported to the operator.
///
/// A rollback that could not finish always wins, since only the backup is
/// left to recover from.
fn classify_failure(error: GovmError, report: &RollbackReport, backup: PathBuf) -> GovmError {
    if report.is_clean() {
        match error {
            GovmError::MigrationFailed { .. } | GovmError::PermissionDenied { .. } => error,
            other => GovmError::migration_failed(other.to_string()),
        }
    } else {
        GovmError::MigrationUnrecoverable {
            backup,
            message: format!("{error}; {}", report.failures.join("; ")),
        }
    }
}

/// Copies `src` to `dst`, keeping symlinks as links and file permissions.
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| {
            let message = format!("failed to walk {}", src.display());
            match e.into_io_error() {
                Some(io) => GovmError::io(message, io),
                None => GovmError::io(message.clone(), std::io::Error::other(message)),
            }
        })?;
        let relative = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)
                .io_context(|| format!("failed to create {}", target.display()))?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())
                .io_context(|| format!("failed to read link {}", entry.path().display()))?;
            copy_symlink(&link, &target)
                .io_context(|| format!("failed to create link {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target).io_context(|| {
                format!("failed to copy {} to {}", entry.path().display(), target.display())
            })?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(link, target)
}

#[cfg(windows)]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(link, target)
}
