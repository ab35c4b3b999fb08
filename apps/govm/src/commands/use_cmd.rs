//! Use command for the govm CLI.
//!
//! Makes an installed version active by repointing `<root>/go`.
//!
//! ## Usage
//!
//! ```bash
//! govm use 1.22.5
//! ```

use anyhow::Result;
use clap::Args;

use super::Session;
use crate::toolchain::ToolchainVersion;
use crate::toolchain::switcher::Switcher;

/// Arguments for the use command.
#[derive(Args, Debug)]
pub struct UseArgs {
    /// Installed version to activate.
    pub version: String,
}

/// Executes the use command.
///
/// # Errors
///
/// Returns an error if the version is malformed, not installed, or the
/// pointer cannot be switched.
pub fn execute(args: &UseArgs, session: &Session) -> Result<()> {
    let version = ToolchainVersion::parse(&args.version)?;
    let dir = Switcher::new(&session.layout, &session.store).switch_to(&version)?;
    println!("Now using Go {version} ({}).", dir.display());
    Ok(())
}
