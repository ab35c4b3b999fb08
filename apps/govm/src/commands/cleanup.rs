//! Cleanup command for the govm CLI.
//!
//! Removes installed versions other than the active one.
//!
//! ## Usage
//!
//! ```bash
//! govm cleanup          # Ask which versions to remove
//! govm cleanup --all    # Remove every inactive version
//! ```

use anyhow::{Result, bail};
use clap::Args;

use super::Session;
use crate::toolchain::cleanup::{CleanupManager, CleanupReport};

/// Arguments for the cleanup command.
#[derive(Args, Debug, Default)]
pub struct CleanupArgs {
    /// Remove every inactive version without asking.
    #[clap(long)]
    pub all: bool,
}

/// Executes the cleanup command.
///
/// Every selected version is attempted; failures are reported one by one and
/// then fail the command as a whole.
///
/// # Errors
///
/// Returns an error if the install root cannot be read, the prompt fails, or
/// any selected version could not be removed.
pub fn execute(args: &CleanupArgs, session: &Session) -> Result<()> {
    let prompter = session.prompter(args.all);
    let report = CleanupManager::new(&session.store).cleanup(&*prompter)?;

    for version in &report.protected {
        println!("Keeping Go {version} (active).");
    }
    if report.removed.is_empty() && report.failed.is_empty() {
        println!("Nothing to remove.");
    }
    for version in &report.removed {
        println!("Removed Go {version}.");
    }
    for (version, reason) in &report.failed {
        eprintln!("Failed to remove Go {version}: {reason}");
    }
    ensure_all_removed(&report)
}

fn ensure_all_removed(report: &CleanupReport) -> Result<()> {
    if report.failed.is_empty() {
        return Ok(());
    }
    let versions: Vec<String> = report.failed.iter().map(|(v, _)| v.to_string()).collect();
    bail!(
        "failed to remove {} version(s): {}",
        versions.len(),
        versions.join(", ")
    )
}
