//! Installed and active version discovery.
//!
//! The active version is resolved in priority order:
//!
//! 1. **Search path** - the `go` binary found on `PATH`, queried for its version
//! 2. **Active pointer** - the symlink at `<root>/go`; the version comes from the
//!    target directory name, or from running the target binary if the name
//!    does not parse
//! 3. **Legacy directory** - a plain `<root>/go` directory with a valid binary
//!
//! All lookups are read-only.

use crate::errors::Result;
use crate::toolchain::paths;
use crate::toolchain::store::{ActiveEntry, InstalledToolchain, ToolchainStore};
use crate::toolchain::version::ToolchainVersion;
use std::path::PathBuf;

/// Which lookup rule produced the active version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveSource {
    SearchPath,
    Pointer,
    Legacy,
}

/// The toolchain currently in effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveToolchain {
    pub version: ToolchainVersion,
    pub binary: PathBuf,
    /// Directory containing `bin/go`.
    pub install_root: PathBuf,
    pub source: ActiveSource,
}

/// Read-only view over a [`ToolchainStore`].
pub struct Catalog<'a, S: ToolchainStore> {
    store: &'a S,
}

impl<'a, S: ToolchainStore> Catalog<'a, S> {
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Returns the active toolchain, or `None` when nothing is active.
    #[must_use]
    pub fn active_version(&self) -> Option<ActiveToolchain> {
        self.from_search_path()
            .or_else(|| self.from_pointer())
            .or_else(|| self.from_legacy())
    }

    /// Version the active pointer resolves to, ignoring the search path.
    #[must_use]
    pub fn pointer_version(&self) -> Option<ToolchainVersion> {
        self.from_pointer().map(|active| active.version)
    }

    /// Installed versions ordered newest to oldest.
    ///
    /// # Errors
    ///
    /// Returns an error if the install root cannot be read.
    pub fn list_installed(&self) -> Result<Vec<InstalledToolchain>> {
        let mut installed = self.store.list()?;
        installed.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(installed)
    }

    /// Whether a valid installation of `version` exists.
    #[must_use]
    pub fn is_installed(&self, version: &ToolchainVersion) -> bool {
        self.store
            .get(version)
            .is_some_and(|dir| self.store.has_binary(&dir))
    }

    fn from_search_path(&self) -> Option<ActiveToolchain> {
        let binary = self.store.locate_on_path()?;
        let version = self.store.query_version(&binary)?;
        let install_root = binary
            .parent()
            .and_then(|bin| bin.parent())
            .map_or_else(|| binary.clone(), PathBuf::from);
        tracing::debug!(binary = %binary.display(), %version, "active version from search path");
        Some(ActiveToolchain {
            version,
            binary,
            install_root,
            source: ActiveSource::SearchPath,
        })
    }

    fn from_pointer(&self) -> Option<ActiveToolchain> {
        let ActiveEntry::Link(target) = self.store.active_entry() else {
            return None;
        };
        let binary = paths::binary_in(&target);
        let from_name = target
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(paths::parse_version_dir_name);
        let version = match from_name {
            Some(version) => version,
            None => self.store.query_version(&binary)?,
        };
        Some(ActiveToolchain {
            version,
            binary,
            install_root: target,
            source: ActiveSource::Pointer,
        })
    }

    fn from_legacy(&self) -> Option<ActiveToolchain> {
        let ActiveEntry::Legacy(dir) = self.store.active_entry() else {
            return None;
        };
        if !self.store.has_binary(&dir) {
            return None;
        }
        let binary = paths::binary_in(&dir);
        let version = self.store.query_version(&binary)?;
        Some(ActiveToolchain {
            version,
            binary,
            install_root: dir,
            source: ActiveSource::Legacy,
        })
    }
}
