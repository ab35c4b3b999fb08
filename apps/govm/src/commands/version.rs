//! Version command for the govm CLI.
//!
//! Displays the govm version. With the global `--verbose` flag, also shows
//! the git commit it was built from and the host platform.

use anyhow::Result;

use crate::toolchain::Platform;

/// Executes the version command.
#[allow(clippy::unnecessary_wraps)]
pub fn execute(verbose: bool) -> Result<()> {
    println!("govm {}", env!("CARGO_PKG_VERSION"));
    if verbose {
        println!();
        println!("Build Information:");
        println!("  Version:  {}", env!("CARGO_PKG_VERSION"));
        println!("  Commit:   {}", git_commit());
        println!("  Platform: {}", platform_string());
    }
    Ok(())
}

/// Returns the git commit hash embedded at build time, or a fallback.
fn git_commit() -> &'static str {
    option_env!("GOVM_GIT_COMMIT").unwrap_or("unknown")
}

/// Distribution platform tag, or the raw host pair when unsupported.
fn platform_string() -> String {
    Platform::detect().map_or_else(
        |_| format!("{}-{} (unsupported)", std::env::consts::OS, std::env::consts::ARCH),
        |platform| platform.to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_succeeds_in_both_modes() {
        assert!(execute(false).is_ok());
        assert!(execute(true).is_ok());
    }

    #[test]
    fn platform_string_is_not_empty() {
        let platform = platform_string();
        assert!(platform.contains('-'));
    }

    #[test]
    fn git_commit_returns_value() {
        assert!(!git_commit().is_empty());
    }
}
