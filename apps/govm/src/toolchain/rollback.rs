//! Undo for interrupted or failed installs and migrations.
//!
//! Rollback is best effort. Each step runs regardless of earlier failures,
//! nothing is retried, and failures are collected in the [`RollbackReport`]
//! for the caller to surface.
//!
//! Steps, in order:
//!
//! 1. Remove the version directory this transaction created, unless it
//!    carries a completion marker
//! 2. Remove the scratch archive, its partial download, and the staging tree
//! 3. Put a legacy installation back from its backup copy
//! 4. Force the active pointer back to its recorded previous target

use std::fs;
use std::io;
use std::path::Path;

use crate::toolchain::download::partial_path;
use crate::toolchain::paths::InstallLayout;
use crate::toolchain::transaction::Transaction;

/// Outcome of a rollback.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RollbackReport {
    /// Destructive actions that were carried out.
    pub actions: Vec<String>,
    /// Steps that could not be completed.
    pub failures: Vec<String>,
}

impl RollbackReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Emits the failures at warn level.
    pub fn log(&self) {
        for failure in &self.failures {
            tracing::warn!("rollback incomplete: {failure}");
        }
    }

    fn done(&mut self, action: String) {
        tracing::info!("rollback: {action}");
        self.actions.push(action);
    }

    fn failed(&mut self, failure: String) {
        tracing::warn!("rollback: {failure}");
        self.failures.push(failure);
    }
}

/// Undoes the recorded effects of `tx`.
pub fn roll_back(layout: &InstallLayout, tx: &Transaction) -> RollbackReport {
    let mut report = RollbackReport::default();

    if let Some(dir) = &tx.created_dir
        && dir.is_dir()
    {
        if InstallLayout::read_marker(dir).is_some() {
            tracing::debug!(dir = %dir.display(), "keeping completed installation");
        } else {
            remove_tree(dir, &mut report);
        }
    }

    if let Some(archive) = &tx.scratch_archive {
        remove_file(archive, &mut report);
        remove_file(&partial_path(archive), &mut report);
        if let Some(scratch) = archive.parent() {
            // Only succeeds once the directory is empty.
            let _ = fs::remove_dir(scratch);
        }
    }

    if let Some(staging) = &tx.staging_dir
        && staging.exists()
    {
        remove_tree(staging, &mut report);
    }

    if let Some(backup) = &tx.legacy_backup {
        restore_legacy(layout, backup, &mut report);
    }

    if let Some(previous) = &tx.previous_target {
        match layout.repoint(previous) {
            Ok(()) => report.done(format!(
                "restored {} -> {}",
                layout.active_link().display(),
                previous.display()
            )),
            Err(e) => report.failed(format!(
                "could not restore {} -> {}: {e}",
                layout.active_link().display(),
                previous.display()
            )),
        }
    }

    report
}

fn restore_legacy(layout: &InstallLayout, backup: &Path, report: &mut RollbackReport) {
    if !backup.exists() {
        return;
    }
    let active = layout.active_link();
    let occupied_by_dir = fs::symlink_metadata(&active).is_ok_and(|m| m.is_dir());
    if occupied_by_dir {
        // The legacy directory never moved; the copy is redundant.
        remove_tree(backup, report);
        return;
    }

    if let Err(e) = layout.remove_link() {
        report.failed(format!("could not remove {}: {e}", active.display()));
        return;
    }
    match fs::rename(backup, &active) {
        Ok(()) => report.done(format!(
            "restored legacy installation {} from {}",
            active.display(),
            backup.display()
        )),
        Err(e) => report.failed(format!(
            "could not move {} back to {}: {e}",
            backup.display(),
            active.display()
        )),
    }
}

fn remove_tree(dir: &Path, report: &mut RollbackReport) {
    match fs::remove_dir_all(dir) {
        Ok(()) => report.done(format!("removed {}", dir.display())),
        Err(e) => report.failed(format!("could not remove {}: {e}", dir.display())),
    }
}

fn remove_file(path: &Path, report: &mut RollbackReport) {
    match fs::remove_file(path) {
        Ok(()) => report.done(format!("removed {}", path.display())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => report.failed(format!("could not remove {}: {e}", path.display())),
    }
}
