//! Removal of versions other than the active one.
//!
//! Candidates are computed before anything is shown to the operator, and only
//! candidates can be selected, so the active directory is never at risk
//! regardless of input.

use crate::errors::Result;
use crate::toolchain::catalog::Catalog;
use crate::toolchain::prompt::{CleanupChoice, Prompter};
use crate::toolchain::store::ToolchainStore;
use crate::toolchain::version::ToolchainVersion;

/// Outcome of one cleanup run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: Vec<ToolchainVersion>,
    /// Versions whose removal failed, with the reason.
    pub failed: Vec<(ToolchainVersion, String)>,
    /// Versions that were never candidates.
    pub protected: Vec<ToolchainVersion>,
}

pub struct CleanupManager<'a, S: ToolchainStore> {
    store: &'a S,
}

impl<'a, S: ToolchainStore> CleanupManager<'a, S> {
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Installed versions that may be removed, newest first.
    ///
    /// Both the version resolved through the search path and the version the
    /// pointer targets are excluded.
    ///
    /// # Errors
    ///
    /// Returns an error if the install root cannot be read.
    pub fn removable(&self) -> Result<(Vec<ToolchainVersion>, Vec<ToolchainVersion>)> {
        let catalog = Catalog::new(self.store);
        let mut protected: Vec<ToolchainVersion> = catalog
            .active_version()
            .map(|active| active.version)
            .into_iter()
            .chain(catalog.pointer_version())
            .collect();
        protected.dedup();

        let removable = catalog
            .list_installed()?
            .into_iter()
            .map(|installed| installed.version)
            .filter(|version| !protected.contains(version))
            .collect();
        Ok((removable, protected))
    }

    /// Removes the versions the prompter selects.
    ///
    /// # Errors
    ///
    /// Returns an error if the install root cannot be read or the prompt
    /// fails. Individual removal failures are collected in the report.
    pub fn cleanup<P: Prompter + ?Sized>(&self, prompter: &P) -> Result<CleanupReport> {
        let (removable, protected) = self.removable()?;
        let mut report = CleanupReport {
            protected,
            ..CleanupReport::default()
        };
        if removable.is_empty() {
            tracing::info!("no versions to clean up");
            return Ok(report);
        }

        let labels: Vec<String> = removable.iter().map(ToString::to_string).collect();
        let chosen: Vec<ToolchainVersion> = match prompter.choose_cleanup(&labels)? {
            CleanupChoice::All => removable,
            CleanupChoice::Selected(indices) => {
                let mut indices = indices;
                indices.sort_unstable();
                indices.dedup();
                indices
                    .into_iter()
                    .filter_map(|i| {
                        let picked = removable.get(i).copied();
                        if picked.is_none() {
                            tracing::debug!(index = i, "ignoring out-of-range selection");
                        }
                        picked
                    })
                    .collect()
            }
            CleanupChoice::None => Vec::new(),
        };

        for version in chosen {
            match self.store.remove(&version) {
                Ok(()) => {
                    tracing::info!(%version, "removed");
                    report.removed.push(version);
                }
                Err(e) => {
                    tracing::warn!(%version, error = %e, "failed to remove");
                    report.failed.push((version, e.to_string()));
                }
            }
        }
        Ok(report)
    }
}
