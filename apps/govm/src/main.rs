#![warn(clippy::pedantic)]

//! # govm
//!
//! Keeps several Go toolchains side by side under one install root and
//! exposes exactly one of them through `<root>/go`.
//!
//! ## Subcommands
//!
//! - `install` - Install a version and make it active (the default)
//! - `use` - Switch to an installed version
//! - `list` - List installed versions
//! - `cleanup` - Remove inactive versions
//! - `migrate` - Adopt a hand-made installation at `<root>/go`
//! - `latest` - Print the newest published release
//! - `env` - Print GOPATH, GOBIN, and PATH exports
//! - `version` - Display version information
//!
//! ## Examples
//!
//! Install and switch to the latest release:
//! ```bash
//! sudo govm
//! ```
//!
//! Install a specific version without prompts:
//! ```bash
//! sudo govm --yes install 1.22.5
//! ```
//!
//! Remove everything but the active version:
//! ```bash
//! sudo govm cleanup --all
//! ```

mod commands;
mod config;
mod errors;
mod toolchain;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{Session, cleanup, env, install, latest, list, migrate, use_cmd, version};
use config::{Overrides, Settings};
use errors::GovmError;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive.
const LOG_ENV: &str = "GOVM_LOG";

/// Exit status for an operator interrupt.
const EXIT_INTERRUPTED: i32 = 130;

/// Side-by-side Go toolchain manager.
#[derive(Parser)]
#[command(
    name = "govm",
    author,
    version,
    about = "Install, switch, and clean up Go toolchains",
    long_about = "govm keeps several Go toolchains under one install root and exposes the active \
    one through <root>/go. Running it without a subcommand installs and activates the latest \
    release.",
    after_help = "\
ACTIVE VERSION RESOLUTION:
    1. The 'go' binary found on PATH
    2. The <root>/go symlink
    3. A standalone installation at <root>/go (migrated on the next install)

ENVIRONMENT VARIABLES:
    GOVM_ROOT               Install root (default: /usr/local)
    GOVM_UNATTENDED         Answer every prompt with its default
    GOVM_CONFIG             Config file (default: <config dir>/govm/config.toml)
    GOVM_DOWNLOAD_URL       Archive base URL (default: https://go.dev/dl)
    GOVM_INDEX_URL          Latest-version index (default: https://go.dev/VERSION?m=text)
    GOVM_LOG                Log filter, e.g. 'govm=debug'"
)]
pub struct Cli {
    /// Run unattended: accept every default without prompting.
    #[clap(short = 'y', long = "yes", alias = "silent", global = true, env = "GOVM_UNATTENDED")]
    pub yes: bool,

    /// Install root holding the versioned directories and the `go` pointer.
    #[clap(long, global = true, env = "GOVM_ROOT", value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug).
    #[clap(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands for the govm CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Install a Go version and make it active.
    ///
    /// Installs the latest release when no version is given. A standalone
    /// installation at <root>/go is migrated first.
    Install(install::InstallArgs),

    /// Switch to an installed version.
    Use(use_cmd::UseArgs),

    /// List installed versions.
    ///
    /// The active version is marked with an asterisk.
    List(list::ListArgs),

    /// Remove installed versions other than the active one.
    Cleanup(cleanup::CleanupArgs),

    /// Convert a standalone installation at <root>/go into a managed version.
    Migrate,

    /// Print the latest published Go release.
    Latest,

    /// Print GOPATH, GOBIN, and PATH exports for the shell.
    Env(env::EnvArgs),

    /// Display version information.
    ///
    /// Use --verbose for the build commit and platform.
    Version,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Routes log output to stderr; `GOVM_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Prints the error and returns the exit code.
///
/// An interrupt exits with 130 and a short notice; every other failure
/// prints the error chain and, when one is known, a remedy.
fn handle_error(e: &anyhow::Error) -> i32 {
    let govm_error = e.downcast_ref::<GovmError>();
    if let Some(GovmError::Interrupted) = govm_error {
        eprintln!("Interrupted.");
        return EXIT_INTERRUPTED;
    }
    eprintln!("Error: {e:#}");
    if let Some(remedy) = govm_error.and_then(GovmError::remedy) {
        eprintln!("Hint: {remedy}");
    }
    1
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = Overrides {
        install_root: cli.root,
        unattended: cli.yes,
    };

    match cli.command {
        Some(Commands::Version) => version::execute(cli.verbose > 0),
        Some(Commands::Env(args)) => env::execute(&args, &session(&overrides)?),
        Some(Commands::Use(args)) => use_cmd::execute(&args, &session(&overrides)?),
        Some(Commands::List(args)) => list::execute(&args, &session(&overrides)?).await,
        Some(Commands::Latest) => latest::execute(&session(&overrides)?).await,
        Some(Commands::Cleanup(args)) => cleanup::execute(&args, &session(&overrides)?),
        Some(Commands::Migrate) => {
            let session = session(&overrides)?;
            interruptible(async { migrate::execute(&session) }).await
        }
        Some(Commands::Install(args)) => {
            let session = session(&overrides)?;
            interruptible(install::execute(&args, &session)).await
        }
        None => {
            let session = session(&overrides)?;
            interruptible(install::execute(&install::InstallArgs::default(), &session)).await
        }
    }
}

fn session(overrides: &Overrides) -> Result<Session> {
    Ok(Session::new(Settings::load(overrides)?))
}

/// Races `operation` against SIGINT and SIGTERM.
///
/// Both handlers are installed before `operation` is first polled and are
/// checked first on every wake-up. On a signal the operation future is
/// dropped, which runs the rollback of any transaction it holds before
/// `Interrupted` is returned.
#[cfg(unix)]
async fn interruptible<F>(operation: F) -> Result<()>
where
    F: std::future::Future<Output = Result<()>>,
{
    use anyhow::Context;
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt = signal(SignalKind::interrupt()).context("failed to watch SIGINT")?;
    let mut terminate = signal(SignalKind::terminate()).context("failed to watch SIGTERM")?;

    tokio::select! {
        biased;
        _ = interrupt.recv() => {
            tracing::warn!("interrupt received");
            Err(GovmError::Interrupted.into())
        }
        _ = terminate.recv() => {
            tracing::warn!("termination requested");
            Err(GovmError::Interrupted.into())
        }
        result = operation => result,
    }
}

#[cfg(not(unix))]
async fn interruptible<F>(operation: F) -> Result<()>
where
    F: std::future::Future<Output = Result<()>>,
{
    tokio::select! {
        biased;
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupt received");
            Err(GovmError::Interrupted.into())
        }
        result = operation => result,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn termination_signal_interrupts_the_operation() {
        let result = interruptible(async {
            std::process::Command::new("kill")
                .args(["-TERM", &std::process::id().to_string()])
                .status()?;
            std::future::pending::<()>().await;
            Ok::<(), anyhow::Error>(())
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GovmError>(),
            Some(GovmError::Interrupted)
        ));
        assert_eq!(handle_error(&err), EXIT_INTERRUPTED);
    }
}
