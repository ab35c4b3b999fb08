//! Env command for the govm CLI.
//!
//! Prints the environment downstream tools expect, ready for `eval`:
//!
//! ```bash
//! eval "$(govm env)"
//! govm env --shell fish | source
//! ```

use anyhow::Result;
use clap::Args;

use super::Session;
use crate::toolchain::shell::{EnvContract, Shell};

/// Arguments for the env command.
#[derive(Args, Debug, Default)]
pub struct EnvArgs {
    /// Shell syntax to print. Defaults to the shell in $SHELL, else bash.
    #[clap(long, value_enum)]
    pub shell: Option<Shell>,
}

/// Executes the env command.
#[allow(clippy::unnecessary_wraps)]
pub fn execute(args: &EnvArgs, session: &Session) -> Result<()> {
    let shell = args.shell.or_else(Shell::detect).unwrap_or(Shell::Bash);
    print!("{}", shell.exports(&EnvContract::from_settings(&session.settings)));
    Ok(())
}
