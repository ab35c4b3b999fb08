//! Installation transactions.
//!
//! A [`Transaction`] records what an install or migration has touched so far.
//! It is owned by a [`TransactionGuard`] for the duration of the operation:
//!
//! ```ignore
//! let mut guard = TransactionGuard::new(&layout, Transaction::begin(version, &layout));
//! guard.record_mut().created_dir = Some(dir);
//! // ... further steps, each returning early with `?` on failure ...
//! guard.commit();
//! ```
//!
//! Dropping the guard without committing runs the rollback, so an early
//! return, an unwinding panic, or a cancelled future all undo the partial
//! work. A committed guard does nothing.

use std::path::PathBuf;

use crate::toolchain::paths::InstallLayout;
use crate::toolchain::rollback::{self, RollbackReport};
use crate::toolchain::version::ToolchainVersion;

/// State captured while an install or migration is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub version: ToolchainVersion,
    /// Target of the active pointer when the operation began.
    pub previous_target: Option<PathBuf>,
    /// Final scratch path of the archive for this version.
    pub scratch_archive: Option<PathBuf>,
    pub staging_dir: Option<PathBuf>,
    /// Version directory this transaction moved into place.
    pub created_dir: Option<PathBuf>,
    /// Copy of a legacy installation taken before migrating it.
    pub legacy_backup: Option<PathBuf>,
}

impl Transaction {
    /// Starts a transaction, recording the current pointer target.
    #[must_use]
    pub fn begin(version: ToolchainVersion, layout: &InstallLayout) -> Self {
        Self {
            version,
            previous_target: current_link_target(layout),
            scratch_archive: None,
            staging_dir: None,
            created_dir: None,
            legacy_backup: None,
        }
    }
}

fn current_link_target(layout: &InstallLayout) -> Option<PathBuf> {
    let link = layout.active_link();
    let meta = std::fs::symlink_metadata(&link).ok()?;
    if !meta.file_type().is_symlink() {
        return None;
    }
    std::fs::read_link(&link)
        .ok()
        .map(|target| layout.root().join(target))
}

/// Scope guard that rolls a [`Transaction`] back unless it is committed.
#[derive(Debug)]
pub struct TransactionGuard<'a> {
    layout: &'a InstallLayout,
    record: Transaction,
    armed: bool,
}

impl<'a> TransactionGuard<'a> {
    #[must_use]
    pub fn new(layout: &'a InstallLayout, record: Transaction) -> Self {
        Self {
            layout,
            record,
            armed: true,
        }
    }

    /// Mutable access for recording progress.
    pub fn record_mut(&mut self) -> &mut Transaction {
        &mut self.record
    }

    #[must_use]
    pub fn record(&self) -> &Transaction {
        &self.record
    }

    /// Marks the operation complete; nothing is undone.
    pub fn commit(mut self) -> Transaction {
        self.armed = false;
        self.record.clone()
    }

    /// Rolls back immediately and returns what happened.
    #[must_use]
    pub fn roll_back_now(mut self) -> RollbackReport {
        self.armed = false;
        rollback::roll_back(self.layout, &self.record)
    }
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!(version = %self.record.version, "operation did not complete; rolling back");
            rollback::roll_back(self.layout, &self.record).log();
        }
    }
}
