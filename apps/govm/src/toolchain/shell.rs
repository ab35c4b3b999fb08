//! Environment contract and shell profile setup.
//!
//! Downstream tools expect three settings:
//!
//! - `GOPATH`: the workspace root (default `$HOME/go`)
//! - `GOBIN`: `$GOPATH/bin`
//! - `PATH`: extended with `<root>/go/bin` and `$GOBIN`
//!
//! ## Supported Shells
//!
//! - Bash: `~/.bashrc` or `~/.bash_profile`
//! - Zsh: `~/.zshrc`
//! - Fish: `~/.config/fish/config.fish`
//!
//! ## Profile block
//!
//! For bash/zsh:
//! ```bash
//! # govm Go toolchain
//! export GOPATH="/home/me/go"
//! export GOBIN="/home/me/go/bin"
//! export PATH="/usr/local/go/bin:$GOBIN:$PATH"
//! ```
//!
//! For fish:
//! ```fish
//! # govm Go toolchain
//! set -gx GOPATH /home/me/go
//! set -gx GOBIN /home/me/go/bin
//! set -gx PATH /usr/local/go/bin $GOBIN $PATH
//! ```
//!
//! The block is appended once; a profile that already has the marker line is
//! left alone.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::toolchain::paths::InstallLayout;

/// Marker comment identifying the govm block in a profile.
const PROFILE_MARKER: &str = "# govm Go toolchain";

/// Values exported to the shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvContract {
    pub gopath: PathBuf,
    pub gobin: PathBuf,
    /// `bin` directory behind the active pointer.
    pub toolchain_bin: PathBuf,
}

impl EnvContract {
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let layout = InstallLayout::new(&settings.install_root);
        Self {
            gopath: settings.workspace_root.clone(),
            gobin: settings.binaries_dir(),
            toolchain_bin: layout.active_link().join("bin"),
        }
    }
}

/// Represents supported shell types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
}

impl Shell {
    /// Detects the user's shell from the SHELL environment variable.
    ///
    /// Returns `None` if the shell cannot be determined or is not supported.
    #[must_use]
    pub fn detect() -> Option<Self> {
        let shell_path = std::env::var("SHELL").ok()?;
        Self::from_path(&shell_path)
    }

    /// Parses a shell from a path string (e.g., "/bin/bash").
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let shell_name = Path::new(path).file_name()?.to_str()?;
        match shell_name {
            "bash" => Some(Self::Bash),
            "zsh" => Some(Self::Zsh),
            "fish" => Some(Self::Fish),
            _ => None,
        }
    }

    /// Returns the profile files to check for this shell.
    #[must_use]
    pub fn profile_candidates(self, home_dir: &Path) -> Vec<PathBuf> {
        match self {
            Self::Bash => vec![home_dir.join(".bashrc"), home_dir.join(".bash_profile")],
            Self::Zsh => vec![home_dir.join(".zshrc")],
            Self::Fish => vec![home_dir.join(".config").join("fish").join("config.fish")],
        }
    }

    /// Export statements for `env`, one per line.
    #[must_use]
    pub fn exports(self, env: &EnvContract) -> String {
        match self {
            Self::Bash | Self::Zsh => format!(
                "export GOPATH=\"{}\"\nexport GOBIN=\"{}\"\nexport PATH=\"{}:$GOBIN:$PATH\"\n",
                sh_escape(&env.gopath),
                sh_escape(&env.gobin),
                sh_escape(&env.toolchain_bin)
            ),
            Self::Fish => format!(
                "set -gx GOPATH {}\nset -gx GOBIN {}\nset -gx PATH {} $GOBIN $PATH\n",
                fish_quote(&env.gopath),
                fish_quote(&env.gobin),
                fish_quote(&env.toolchain_bin)
            ),
        }
    }

    /// The marked block appended to a profile.
    #[must_use]
    pub fn profile_block(self, env: &EnvContract) -> String {
        format!("\n{PROFILE_MARKER}\n{}", self.exports(env))
    }

    #[must_use]
    pub fn source_command(self, profile_path: &Path) -> String {
        let _ = self;
        format!("source {}", profile_path.display())
    }
}

/// Escapes a path for use inside double quotes in bash/zsh.
fn sh_escape(path: &Path) -> String {
    path.display()
        .to_string()
        .replace('\\', "\\\\")
        .replace('$', "\\$")
        .replace('`', "\\`")
        .replace('"', "\\\"")
}

/// Single-quotes a path for fish when it contains special characters.
fn fish_quote(path: &Path) -> String {
    let path_str = path.display().to_string();
    let needs_quotes = path_str.chars().any(|c| {
        matches!(
            c,
            ' ' | '$' | '\\' | '\'' | '*' | '?' | '(' | ')' | '[' | ']' | '{' | '}'
        )
    });
    if needs_quotes {
        format!("'{}'", path_str.replace('\'', "\\'"))
    } else {
        path_str
    }
}

/// Result of attempting to configure a shell profile.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigureResult {
    /// The block was appended to the profile.
    Added {
        profile: PathBuf,
        source_command: String,
    },
    /// The profile already carries the marker.
    AlreadyConfigured { profile: PathBuf },
    NoProfileFound,
    ShellNotDetected,
}

/// Appends the environment block to the detected shell's profile.
///
/// # Errors
///
/// Returns an error if reading or writing the profile fails. An undetected
/// shell or missing profile is reported through [`ConfigureResult`].
pub fn configure_profile(env: &EnvContract) -> Result<ConfigureResult> {
    let Some(shell) = Shell::detect() else {
        return Ok(ConfigureResult::ShellNotDetected);
    };
    let Some(home_dir) = dirs::home_dir() else {
        return Ok(ConfigureResult::NoProfileFound);
    };
    configure_profile_in(shell, &home_dir, env)
}

/// [`configure_profile`] with an explicit shell and home directory.
///
/// # Errors
///
/// Returns an error if reading or writing the profile fails.
pub fn configure_profile_in(
    shell: Shell,
    home_dir: &Path,
    env: &EnvContract,
) -> Result<ConfigureResult> {
    let candidates = shell.profile_candidates(home_dir);
    let Some(profile_path) = candidates.iter().find(|p| p.exists()).cloned() else {
        return Ok(ConfigureResult::NoProfileFound);
    };

    if is_configured(&profile_path)? {
        tracing::debug!(profile = %profile_path.display(), "profile already configured");
        return Ok(ConfigureResult::AlreadyConfigured {
            profile: profile_path,
        });
    }

    append_to_file(&profile_path, &shell.profile_block(env))?;
    tracing::info!(profile = %profile_path.display(), "updated shell profile");
    Ok(ConfigureResult::Added {
        source_command: shell.source_command(&profile_path),
        profile: profile_path,
    })
}

fn is_configured(profile_path: &Path) -> Result<bool> {
    let content = std::fs::read_to_string(profile_path)
        .with_context(|| format!("Failed to read profile: {}", profile_path.display()))?;
    Ok(content.lines().any(|line| line.trim() == PROFILE_MARKER))
}

fn append_to_file(path: &Path, content: &str) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io::Write;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open profile for writing: {}", path.display()))?;

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to profile: {}", path.display()))?;

    Ok(())
}

/// Returns a human-readable message describing the configuration result.
#[must_use]
pub fn format_result_message(result: &ConfigureResult, env: &EnvContract) -> String {
    match result {
        ConfigureResult::Added {
            profile,
            source_command,
        } => format!(
            "Added the Go environment to {}\nRun '{source_command}' to use it in this shell.",
            profile.display()
        ),
        ConfigureResult::AlreadyConfigured { profile } => {
            format!("Go environment already configured in {}", profile.display())
        }
        ConfigureResult::NoProfileFound => format!(
            "Could not find a shell profile. Add these lines to it:\n{}",
            Shell::Bash.exports(env)
        ),
        ConfigureResult::ShellNotDetected => format!(
            "Could not detect your shell. Add these lines to its profile:\n{}",
            Shell::Bash.exports(env)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn contract() -> EnvContract {
        EnvContract {
            gopath: PathBuf::from("/home/user/go"),
            gobin: PathBuf::from("/home/user/go/bin"),
            toolchain_bin: PathBuf::from("/usr/local/go/bin"),
        }
    }

    #[test]
    fn shell_from_path() {
        assert_eq!(Shell::from_path("/bin/bash"), Some(Shell::Bash));
        assert_eq!(Shell::from_path("/usr/local/bin/zsh"), Some(Shell::Zsh));
        assert_eq!(Shell::from_path("/usr/bin/fish"), Some(Shell::Fish));
        assert_eq!(Shell::from_path("/bin/sh"), None);
        assert_eq!(Shell::from_path(""), None);
    }

    #[test]
    fn profile_candidates_bash() {
        let home = PathBuf::from("/home/user");
        let candidates = Shell::Bash.profile_candidates(&home);
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/home/user/.bashrc"),
                PathBuf::from("/home/user/.bash_profile")
            ]
        );
    }

    #[test]
    fn profile_candidates_fish() {
        let home = PathBuf::from("/home/user");
        assert_eq!(
            Shell::Fish.profile_candidates(&home),
            vec![PathBuf::from("/home/user/.config/fish/config.fish")]
        );
    }

    #[test]
    fn sh_exports_cover_the_contract() {
        let exports = Shell::Bash.exports(&contract());
        assert_eq!(
            exports,
            "export GOPATH=\"/home/user/go\"\n\
             export GOBIN=\"/home/user/go/bin\"\n\
             export PATH=\"/usr/local/go/bin:$GOBIN:$PATH\"\n"
        );
        assert_eq!(Shell::Zsh.exports(&contract()), exports);
    }

    #[test]
    fn fish_exports_use_set_gx() {
        let exports = Shell::Fish.exports(&contract());
        assert!(exports.contains("set -gx GOPATH /home/user/go\n"));
        assert!(exports.contains("set -gx GOBIN /home/user/go/bin\n"));
        assert!(exports.contains("set -gx PATH /usr/local/go/bin $GOBIN $PATH\n"));
    }

    #[test]
    fn sh_escapes_special_chars() {
        let env = EnvContract {
            gopath: PathBuf::from("/home/user/$HOME/`test`/\"q\""),
            ..contract()
        };
        let exports = Shell::Bash.exports(&env);
        assert!(exports.contains(r#"export GOPATH="/home/user/\$HOME/\`test\`/\"q\"""#));
    }

    #[test]
    fn fish_quotes_paths_with_spaces_and_quotes() {
        assert_eq!(
            fish_quote(Path::new("/home/user/My Documents/go")),
            "'/home/user/My Documents/go'"
        );
        assert_eq!(fish_quote(Path::new("/home/it's/go")), r"'/home/it\'s/go'");
        assert_eq!(fish_quote(Path::new("/plain/go")), "/plain/go");
    }

    #[test]
    fn profile_block_is_appended_once() {
        let home = TempDir::new().unwrap();
        let profile = home.path().join(".zshrc");
        std::fs::write(&profile, "# existing\n").unwrap();

        let first = configure_profile_in(Shell::Zsh, home.path(), &contract()).unwrap();
        assert!(matches!(first, ConfigureResult::Added { .. }));
        let second = configure_profile_in(Shell::Zsh, home.path(), &contract()).unwrap();
        assert_eq!(
            second,
            ConfigureResult::AlreadyConfigured {
                profile: profile.clone()
            }
        );

        let content = std::fs::read_to_string(&profile).unwrap();
        assert!(content.starts_with("# existing\n"));
        assert_eq!(content.matches(PROFILE_MARKER).count(), 1);
        assert!(content.contains("export GOBIN=\"/home/user/go/bin\""));
    }

    #[test]
    fn bash_prefers_bashrc_over_bash_profile() {
        let home = TempDir::new().unwrap();
        std::fs::write(home.path().join(".bash_profile"), "").unwrap();
        std::fs::write(home.path().join(".bashrc"), "").unwrap();

        let result = configure_profile_in(Shell::Bash, home.path(), &contract()).unwrap();
        let ConfigureResult::Added { profile, source_command } = result else {
            panic!("expected Added, got {result:?}");
        };
        assert_eq!(profile, home.path().join(".bashrc"));
        assert!(source_command.starts_with("source "));
        assert!(
            std::fs::read_to_string(home.path().join(".bash_profile"))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn missing_profile_is_reported_not_created() {
        let home = TempDir::new().unwrap();
        let result = configure_profile_in(Shell::Fish, home.path(), &contract()).unwrap();
        assert_eq!(result, ConfigureResult::NoProfileFound);
        assert!(!home.path().join(".config").exists());
        let message = format_result_message(&result, &contract());
        assert!(message.contains("export GOPATH"));
    }
}
