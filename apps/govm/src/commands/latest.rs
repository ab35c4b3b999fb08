//! Latest command for the govm CLI.
//!
//! Prints the newest published Go release.

use anyhow::Result;

use super::Session;
use crate::toolchain::remote::RemoteOracle;

/// Executes the latest command.
///
/// # Errors
///
/// Returns an error if the remote index is unavailable.
pub async fn execute(session: &Session) -> Result<()> {
    let latest = RemoteOracle::new(&session.settings)?.latest_version().await?;
    println!("{latest}");
    Ok(())
}
