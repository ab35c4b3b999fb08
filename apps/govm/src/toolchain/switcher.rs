//! Active version switching.
//!
//! The pointer is replaced with a single rename (see
//! [`InstallLayout::repoint`]), so `<root>/go` always resolves either to the
//! old target or to the new one. After the swap the new binary is asked for
//! its version; a mismatch puts the old target back.

use std::path::PathBuf;

use crate::errors::{GovmError, Result};
use crate::toolchain::paths::{self, InstallLayout};
use crate::toolchain::store::{ActiveEntry, ToolchainStore};
use crate::toolchain::version::ToolchainVersion;

pub struct Switcher<'a, S: ToolchainStore> {
    layout: &'a InstallLayout,
    store: &'a S,
}

impl<'a, S: ToolchainStore> Switcher<'a, S> {
    #[must_use]
    pub fn new(layout: &'a InstallLayout, store: &'a S) -> Self {
        Self { layout, store }
    }

    /// Points `<root>/go` at the installed directory of `version`.
    ///
    /// Returns the directory now active.
    ///
    /// # Errors
    ///
    /// - [`GovmError::VersionNotInstalled`] if no directory exists for `version`
    /// - [`GovmError::InvalidInstallation`] if the directory has no `bin/go`
    /// - [`GovmError::SwitchFailed`] if `<root>/go` is a legacy directory, the
    ///   pointer cannot be replaced, or the new binary reports another version
    pub fn switch_to(&self, version: &ToolchainVersion) -> Result<PathBuf> {
        let dir = self
            .store
            .get(version)
            .ok_or_else(|| GovmError::VersionNotInstalled {
                version: version.to_string(),
            })?;
        if !self.store.has_binary(&dir) {
            return Err(GovmError::InvalidInstallation { path: dir });
        }

        let link = self.layout.active_link();
        let previous = match self.store.active_entry() {
            ActiveEntry::Legacy(path) => {
                return Err(GovmError::switch_failed(
                    version,
                    format!(
                        "{} is a legacy installation; run 'govm migrate' first",
                        path.display()
                    ),
                ));
            }
            ActiveEntry::Link(target) => Some(target),
            ActiveEntry::Absent => None,
        };

        self.layout.repoint(&dir).map_err(|e| {
            GovmError::switch_failed(version, format!("failed to update {}: {e}", link.display()))
        })?;
        tracing::info!(%version, target = %dir.display(), "pointer updated");

        match self.store.query_version(&paths::binary_in(&link)) {
            Some(reported) if version.matches(&reported) => Ok(dir),
            reported => {
                self.restore(previous.as_ref());
                let found = reported.map_or_else(|| "no version".to_string(), |r| r.to_string());
                Err(GovmError::switch_failed(
                    version,
                    format!("the new binary reported {found}"),
                ))
            }
        }
    }

    fn restore(&self, previous: Option<&PathBuf>) {
        let result = match previous {
            Some(target) => {
                tracing::info!(target = %target.display(), "restoring previous pointer");
                self.layout.repoint(target).map_err(|e| e.to_string())
            }
            None => {
                tracing::info!("removing pointer");
                self.layout.remove_link().map_err(|e| e.to_string())
            }
        };
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to restore the previous pointer");
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::toolchain::store::FsStore;
    use crate::toolchain::testing::fake_go_install;
    use std::fs;
    use tempfile::TempDir;

    fn v(s: &str) -> ToolchainVersion {
        ToolchainVersion::parse(s).unwrap()
    }

    fn setup() -> (TempDir, InstallLayout, FsStore) {
        let tmp = TempDir::new().unwrap();
        let layout = InstallLayout::new(tmp.path());
        let store = FsStore::new(layout.clone()).with_search_path(None);
        (tmp, layout, store)
    }

    #[test]
    fn switch_points_link_at_version_dir() {
        let (_tmp, layout, store) = setup();
        let old = layout.version_dir(&v("1.22.5"));
        let new = layout.version_dir(&v("1.23.1"));
        fake_go_install(&old, "1.22.5");
        fake_go_install(&new, "1.23.1");
        layout.repoint(&old).unwrap();

        let active = Switcher::new(&layout, &store).switch_to(&v("go1.23.1")).unwrap();
        assert_eq!(active, new);
        assert_eq!(fs::read_link(layout.active_link()).unwrap(), new);
        assert_eq!(
            store.query_version(&paths::binary_in(&layout.active_link())),
            Some(v("1.23.1"))
        );
    }

    #[test]
    fn missing_version_is_not_installed() {
        let (_tmp, layout, store) = setup();
        let err = Switcher::new(&layout, &store).switch_to(&v("1.23.1")).unwrap_err();
        assert!(matches!(err, GovmError::VersionNotInstalled { .. }));
        assert!(fs::symlink_metadata(layout.active_link()).is_err());
    }

    #[test]
    fn directory_without_binary_is_invalid_and_kept() {
        let (_tmp, layout, store) = setup();
        let dir = layout.version_dir(&v("1.23.1"));
        fs::create_dir_all(dir.join("src")).unwrap();

        let err = Switcher::new(&layout, &store).switch_to(&v("1.23.1")).unwrap_err();
        assert!(matches!(err, GovmError::InvalidInstallation { .. }));
        assert!(dir.join("src").is_dir());
    }

    #[test]
    fn version_mismatch_restores_previous_target() {
        let (_tmp, layout, store) = setup();
        let old = layout.version_dir(&v("1.22.5"));
        let liar = layout.version_dir(&v("1.23.1"));
        fake_go_install(&old, "1.22.5");
        fake_go_install(&liar, "1.19.0");
        layout.repoint(&old).unwrap();

        let err = Switcher::new(&layout, &store).switch_to(&v("1.23.1")).unwrap_err();
        assert!(matches!(err, GovmError::SwitchFailed { .. }));
        assert!(err.to_string().contains("1.19.0"));
        assert_eq!(fs::read_link(layout.active_link()).unwrap(), old);
    }

    #[test]
    fn mismatch_without_previous_pointer_removes_link() {
        let (_tmp, layout, store) = setup();
        let liar = layout.version_dir(&v("1.23.1"));
        fake_go_install(&liar, "1.19.0");

        assert!(Switcher::new(&layout, &store).switch_to(&v("1.23.1")).is_err());
        assert!(fs::symlink_metadata(layout.active_link()).is_err());
    }

    #[test]
    fn legacy_directory_blocks_switch() {
        let (_tmp, layout, store) = setup();
        fake_go_install(&layout.active_link(), "1.20.0");
        fake_go_install(&layout.version_dir(&v("1.23.1")), "1.23.1");

        let err = Switcher::new(&layout, &store).switch_to(&v("1.23.1")).unwrap_err();
        assert!(err.to_string().contains("govm migrate"));
        let meta = fs::symlink_metadata(layout.active_link()).unwrap();
        assert!(meta.is_dir());
    }

    #[test]
    fn switching_to_active_version_is_idempotent() {
        let (_tmp, layout, store) = setup();
        let dir = layout.version_dir(&v("1.23.1"));
        fake_go_install(&dir, "1.23.1");
        let switcher = Switcher::new(&layout, &store);
        switcher.switch_to(&v("1.23.1")).unwrap();
        switcher.switch_to(&v("1.23.1")).unwrap();
        assert_eq!(fs::read_link(layout.active_link()).unwrap(), dir);
        let mut names: Vec<_> = fs::read_dir(layout.root())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        names.sort();
        assert_eq!(names, ["go", "go-1.23.1"]);
    }
}
