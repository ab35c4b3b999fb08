//! List command for the govm CLI.
//!
//! Displays installed Go versions, newest first, and marks the active one.
//!
//! ## Usage
//!
//! ```bash
//! govm list
//! govm list --remote
//! ```
//!
//! ## Output Format
//!
//! ```text
//! Installed versions:
//! * 1.23.1    (active, installed today)
//!   1.22.5    (installed 3 weeks ago)
//! ```

use anyhow::Result;
use clap::Args;

use super::Session;
use crate::toolchain::InstallLayout;
use crate::toolchain::catalog::{ActiveSource, Catalog};
use crate::toolchain::remote::RemoteOracle;

/// Arguments for the list command.
#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Also show the latest published release.
    #[clap(long)]
    pub remote: bool,
}

/// Executes the list command.
///
/// # Errors
///
/// Returns an error if the install root cannot be read, or with `--remote`
/// if the version index is unavailable.
pub async fn execute(args: &ListArgs, session: &Session) -> Result<()> {
    let catalog = Catalog::new(&session.store);
    let installed = catalog.list_installed()?;
    let active = catalog.active_version();

    if let Some(active) = active.as_ref().filter(|a| a.source == ActiveSource::Legacy) {
        println!(
            "Go {} is installed directly at {} (run 'govm migrate' to manage it).",
            active.version,
            active.install_root.display()
        );
    }

    if installed.is_empty() {
        println!("No versions installed.");
        println!();
        println!("Run 'govm install' to install the latest release.");
    } else {
        println!("Installed versions:");
        for toolchain in &installed {
            let is_active = active
                .as_ref()
                .is_some_and(|a| a.source != ActiveSource::Legacy && a.version == toolchain.version);

            let mut info_parts = Vec::new();
            if is_active {
                info_parts.push("active".to_string());
            }
            if let Some(marker) = InstallLayout::read_marker(&toolchain.dir) {
                info_parts.push(format!("installed {}", marker.installed_ago()));
            }

            let marker = if is_active { "*" } else { " " };
            if info_parts.is_empty() {
                println!("{marker} {}", toolchain.version);
            } else {
                println!("{marker} {}    ({})", toolchain.version, info_parts.join(", "));
            }
        }
    }

    if let Some(active) = active.as_ref().filter(|a| a.source == ActiveSource::SearchPath)
        && !active.binary.starts_with(session.layout.active_link())
    {
        println!();
        println!(
            "Note: 'go' on PATH resolves to {} (Go {}).",
            active.binary.display(),
            active.version
        );
    }

    if args.remote {
        let latest = RemoteOracle::new(&session.settings)?.latest_version().await?;
        println!();
        if installed.iter().any(|t| t.version == latest) {
            println!("Latest release: {latest} (installed)");
        } else {
            println!("Latest release: {latest}");
        }
    }
    Ok(())
}
