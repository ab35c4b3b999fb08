//! Install command for the govm CLI.
//!
//! Installs a Go version and makes it active. Running `govm` with no
//! subcommand does the same for the latest release.
//!
//! ## Usage
//!
//! ```bash
//! govm install            # Install and switch to the latest release
//! govm install 1.22.5     # Install a specific version
//! govm install go1.22     # The go prefix is accepted
//! govm install --force    # Reinstall even if present
//! ```
//!
//! A legacy installation at `<root>/go` is migrated first, and the command
//! stops there; run it again to install another version.

use anyhow::{Context, Result};
use clap::Args;

use super::Session;
use crate::toolchain::catalog::{ActiveSource, Catalog};
use crate::toolchain::download::HttpDownloader;
use crate::toolchain::installer::Installer;
use crate::toolchain::migrator::{MigrationOutcome, Migrator};
use crate::toolchain::remote::RemoteOracle;
use crate::toolchain::shell::{self, EnvContract};
use crate::toolchain::switcher::Switcher;
use crate::toolchain::{Platform, ToolchainVersion};

/// Arguments for the install command.
#[derive(Args, Debug, Default)]
pub struct InstallArgs {
    /// Version to install (e.g., "1.22.5" or "go1.22").
    ///
    /// If omitted, installs the latest published release.
    pub version: Option<String>,

    /// Reinstall even when the version is already present.
    #[clap(long)]
    pub force: bool,

    /// Install without making the version active.
    #[clap(long)]
    pub no_switch: bool,

    /// Append the Go environment to your shell profile.
    #[clap(long)]
    pub configure_shell: bool,
}

/// Executes the install command.
///
/// # Process
///
/// 1. Migrate a legacy installation if one is present, then stop
/// 2. Validate the requested version, or ask the remote index for the latest
/// 3. Download and install unless already installed (or `--force`)
/// 4. Switch the active pointer unless `--no-switch`
///
/// # Errors
///
/// Returns an error if validation, migration, download, installation, or
/// switching fails.
pub async fn execute(args: &InstallArgs, session: &Session) -> Result<()> {
    let prompter = session.prompter(false);
    let migration = Migrator::new(&session.layout, &session.store, &*prompter).migrate()?;
    match migration {
        MigrationOutcome::Migrated { version, dir } => {
            println!("Migrated Go {version} to {}.", dir.display());
            println!("Run 'govm install' again to install another version.");
            return Ok(());
        }
        MigrationOutcome::Declined => {
            println!("Keeping the existing installation at {}.", session.layout.active_link().display());
            println!("govm cannot install versions until it is migrated ('govm migrate').");
            return Ok(());
        }
        MigrationOutcome::NotApplicable => {}
    }

    let version = match &args.version {
        Some(input) => ToolchainVersion::parse(input)?,
        None => {
            println!("Checking latest Go release...");
            RemoteOracle::new(&session.settings)?.latest_version().await?
        }
    };

    let catalog = Catalog::new(&session.store);
    if catalog.is_installed(&version) && !args.force {
        println!("Go {version} is already installed.");
    } else {
        let platform = Platform::detect()?;
        let downloader = HttpDownloader::new(&session.settings, session.settings.unattended)?;
        println!("Installing Go {version} for {platform}...");
        let outcome = Installer::new(&session.layout, &downloader, platform)
            .install(&version)
            .await
            .with_context(|| format!("Failed to install Go {version}"))?;
        if outcome.reinstalled {
            println!("Reinstalled Go {version} in {}.", outcome.dir.display());
        } else {
            println!("Installed Go {version} in {}.", outcome.dir.display());
        }
    }

    if args.no_switch {
        println!("Run 'govm use {version}' to make it active.");
    } else {
        Switcher::new(&session.layout, &session.store).switch_to(&version)?;
        println!("Now using Go {version}.");
        warn_if_shadowed(session, &version);
    }

    let env = EnvContract::from_settings(&session.settings);
    if args.configure_shell {
        let result = shell::configure_profile(&env)?;
        println!("{}", shell::format_result_message(&result, &env));
    } else {
        println!("Run 'eval \"$(govm env)\"' to set GOPATH, GOBIN, and PATH in this shell.");
    }
    Ok(())
}

/// Warns when another `go` earlier on the search path hides the active one.
fn warn_if_shadowed(session: &Session, version: &ToolchainVersion) {
    let Some(active) = Catalog::new(&session.store).active_version() else {
        return;
    };
    let managed = session.layout.active_link();
    if active.source == ActiveSource::SearchPath
        && !active.binary.starts_with(&managed)
        && active.version != *version
    {
        eprintln!(
            "Warning: {} (Go {}) appears earlier on PATH than {}.",
            active.binary.display(),
            active.version,
            managed.join("bin").display()
        );
    }
}
