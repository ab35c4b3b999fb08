//! Command modules for the govm CLI.
//!
//! ## Version Commands
//!
//! - [`install`] - Install (and switch to) a version; also the default command
//! - [`use_cmd`] - Switch to an installed version
//! - [`list`] - List installed versions
//! - [`latest`] - Print the newest published version
//!
//! ## Maintenance Commands
//!
//! - [`cleanup`] - Remove inactive versions
//! - [`migrate`] - Convert a hand-made installation
//! - [`env`] - Print the shell environment
//! - [`version`] - Display version information

pub mod cleanup;
pub mod env;
pub mod install;
pub mod latest;
pub mod list;
pub mod migrate;
pub mod use_cmd;
pub mod version;

use crate::config::Settings;
use crate::toolchain::prompt::{InquirePrompter, Prompter, Unattended};
use crate::toolchain::{FsStore, InstallLayout};

/// Resolved settings plus the filesystem view every command works on.
pub struct Session {
    pub settings: Settings,
    pub layout: InstallLayout,
    pub store: FsStore,
}

impl Session {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        let layout = InstallLayout::new(&settings.install_root);
        let store = FsStore::new(layout.clone());
        Self {
            settings,
            layout,
            store,
        }
    }

    /// Prompter honouring `--yes`.
    #[must_use]
    pub fn prompter(&self, force_unattended: bool) -> Box<dyn Prompter> {
        if force_unattended || self.settings.unattended {
            Box::new(Unattended)
        } else {
            Box::new(InquirePrompter)
        }
    }
}
