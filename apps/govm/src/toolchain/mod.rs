//! Go toolchain version management.
//!
//! ## Module Structure
//!
//! - [`platform`] - OS and architecture detection
//! - [`version`] - Version identifiers and normalization
//! - [`paths`] - Install root layout and the active pointer
//! - [`store`] - Filesystem access behind a trait
//! - [`catalog`] - Installed and active version discovery
//! - [`remote`] - Latest published version lookup
//! - [`download`] - HTTP retrieval with retries and verification
//! - [`verify`] - SHA-256 checksums
//! - [`archive`] - tar.gz inspection and extraction
//! - [`installer`] - Transactional installation
//! - [`switcher`] - Atomic pointer switching
//! - [`migrator`] - Legacy layout conversion
//! - [`cleanup`] - Removal of inactive versions
//! - [`transaction`] / [`rollback`] - Undo of partial work
//! - [`prompt`] - Operator confirmation
//! - [`shell`] - Environment exports and profile setup

pub mod archive;
pub mod catalog;
pub mod cleanup;
pub mod download;
pub mod installer;
pub mod migrator;
pub mod paths;
pub mod platform;
pub mod prompt;
pub mod remote;
pub mod rollback;
pub mod shell;
pub mod store;
pub mod switcher;
pub mod transaction;
pub mod verify;
pub mod version;

#[cfg(test)]
pub mod testing;

pub use paths::InstallLayout;
pub use platform::Platform;
pub use store::FsStore;
pub use version::ToolchainVersion;
