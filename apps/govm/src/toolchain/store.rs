//! Repository interface over the install root.
//!
//! The catalog, switcher, and cleanup logic only see the filesystem through
//! [`ToolchainStore`], which keeps them testable against an in-memory fake.

use crate::errors::{IoResultExt, Result};
use crate::toolchain::paths::{self, InstallLayout};
use crate::toolchain::version::{ToolchainVersion, extract_first_version};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A valid installed version directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledToolchain {
    pub version: ToolchainVersion,
    pub dir: PathBuf,
}

/// What currently occupies the well-known active path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveEntry {
    /// A symlink; the target is resolved against the install root.
    Link(PathBuf),
    /// A plain directory from before versioned installs were adopted.
    Legacy(PathBuf),
    Absent,
}

/// Read and remove access to installed toolchains.
pub trait ToolchainStore {
    /// Every directory following the versioned naming convention that holds a
    /// valid binary, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns an error if the install root exists but cannot be read.
    fn list(&self) -> Result<Vec<InstalledToolchain>>;

    /// Directory for `version` if one exists, valid or not.
    fn get(&self, version: &ToolchainVersion) -> Option<PathBuf>;

    /// Whether `dir` holds an executable entry-point binary.
    fn has_binary(&self, dir: &Path) -> bool;

    /// Deletes the directory of `version`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be removed.
    fn remove(&self, version: &ToolchainVersion) -> Result<()>;

    fn active_entry(&self) -> ActiveEntry;

    /// Runs `<binary> version` and parses the reported version.
    fn query_version(&self, binary: &Path) -> Option<ToolchainVersion>;

    /// Resolves the toolchain binary through the command search path.
    fn locate_on_path(&self) -> Option<PathBuf>;
}

/// [`ToolchainStore`] backed by the real filesystem.
#[derive(Debug, Clone)]
pub struct FsStore {
    layout: InstallLayout,
    search_path: Option<OsString>,
}

impl FsStore {
    /// Creates a store that searches the process `PATH`.
    #[must_use]
    pub fn new(layout: InstallLayout) -> Self {
        Self {
            layout,
            search_path: std::env::var_os("PATH"),
        }
    }

    /// Replaces the search path consulted by [`ToolchainStore::locate_on_path`].
    #[cfg(test)]
    #[must_use]
    pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
        self.search_path = search_path;
        self
    }
}

impl ToolchainStore for FsStore {
    fn list(&self) -> Result<Vec<InstalledToolchain>> {
        let root = self.layout.root();
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).io_context(|| format!("failed to read {}", root.display()));
            }
        };

        let mut installed = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(version) = name.to_str().and_then(paths::parse_version_dir_name) else {
                continue;
            };
            if !entry.file_type().is_ok_and(|t| t.is_dir()) {
                continue;
            }
            let dir = entry.path();
            if paths::has_valid_binary(&dir) {
                installed.push(InstalledToolchain { version, dir });
            } else {
                tracing::debug!(dir = %dir.display(), "skipping directory without a go binary");
            }
        }
        Ok(installed)
    }

    fn get(&self, version: &ToolchainVersion) -> Option<PathBuf> {
        let dir = self.layout.version_dir(version);
        dir.is_dir().then_some(dir)
    }

    fn has_binary(&self, dir: &Path) -> bool {
        paths::has_valid_binary(dir)
    }

    fn remove(&self, version: &ToolchainVersion) -> Result<()> {
        let dir = self.layout.version_dir(version);
        fs::remove_dir_all(&dir).io_context(|| format!("failed to remove {}", dir.display()))
    }

    fn active_entry(&self) -> ActiveEntry {
        let link = self.layout.active_link();
        match fs::symlink_metadata(&link) {
            Ok(meta) if meta.file_type().is_symlink() => match fs::read_link(&link) {
                Ok(target) => ActiveEntry::Link(self.layout.root().join(target)),
                Err(e) => {
                    tracing::warn!(link = %link.display(), error = %e, "unreadable active link");
                    ActiveEntry::Absent
                }
            },
            Ok(meta) if meta.is_dir() => ActiveEntry::Legacy(link),
            Ok(_) => {
                tracing::warn!(path = %link.display(), "active path is neither a link nor a directory");
                ActiveEntry::Absent
            }
            Err(_) => ActiveEntry::Absent,
        }
    }

    fn query_version(&self, binary: &Path) -> Option<ToolchainVersion> {
        let output = match Command::new(binary).arg("version").output() {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(binary = %binary.display(), error = %e, "failed to run version query");
                return None;
            }
        };
        if !output.status.success() {
            tracing::debug!(binary = %binary.display(), status = %output.status, "version query failed");
            return None;
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let version = extract_first_version(&stdout);
        tracing::debug!(binary = %binary.display(), output = %stdout.trim(), ?version, "queried version");
        version
    }

    fn locate_on_path(&self) -> Option<PathBuf> {
        let search_path = self.search_path.as_ref()?;
        let cwd = std::env::current_dir().unwrap_or_else(|_| self.layout.root().to_path_buf());
        which::which_in("go", Some(search_path), cwd).ok()
    }
}
