//! Runtime settings.
//!
//! Values are resolved in priority order:
//!
//! 1. Command-line flags and their environment variables (`--root` / `GOVM_ROOT`,
//!    `--yes` / `GOVM_UNATTENDED`)
//! 2. Dedicated environment overrides (`GOVM_DOWNLOAD_URL`, `GOVM_INDEX_URL`)
//! 3. The TOML file at `GOVM_CONFIG`, or `<config dir>/govm/config.toml`
//! 4. Built-in defaults
//!
//! ## File format
//!
//! ```toml
//! install_root = "/usr/local"
//! download_base_url = "https://go.dev/dl"
//! version_index_url = "https://go.dev/VERSION?m=text"
//! workspace_root = "/home/me/go"
//! timeout_secs = 300
//! retries = 3
//! ```

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::toolchain::paths::DEFAULT_INSTALL_ROOT;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "GOVM_CONFIG";

/// Environment variable overriding the archive download base URL.
pub const DOWNLOAD_URL_ENV: &str = "GOVM_DOWNLOAD_URL";

/// Environment variable overriding the latest-version index URL.
pub const INDEX_URL_ENV: &str = "GOVM_INDEX_URL";

const DEFAULT_DOWNLOAD_BASE_URL: &str = "https://go.dev/dl";
const DEFAULT_VERSION_INDEX_URL: &str = "https://go.dev/VERSION?m=text";
const DEFAULT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_RETRIES: u32 = 3;
const MAX_RETRIES: u32 = 10;

/// Contents of the optional config file.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub install_root: Option<PathBuf>,
    pub download_base_url: Option<String>,
    pub version_index_url: Option<String>,
    pub workspace_root: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub retries: Option<u32>,
}

/// Values supplied on the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub install_root: Option<PathBuf>,
    pub unattended: bool,
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub install_root: PathBuf,
    pub download_base_url: String,
    pub version_index_url: String,
    /// `GOPATH` for downstream tools.
    pub workspace_root: PathBuf,
    pub timeout: Duration,
    /// Total download attempts per archive.
    pub retries: u32,
    pub unattended: bool,
}

impl Settings {
    /// Loads settings from the process environment and the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named config file is missing, or if
    /// any config file fails to parse.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let file = match non_empty_env(CONFIG_ENV) {
            Some(path) => read_config_file(Path::new(&path))?,
            None => match default_config_path() {
                Some(path) if path.is_file() => read_config_file(&path)?,
                _ => FileConfig::default(),
            },
        };
        Self::resolve(file, overrides, non_empty_env, dirs::home_dir())
    }

    /// Merges the layers without touching the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero retry count or a relative install root.
    pub fn resolve(
        file: FileConfig,
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
        home: Option<PathBuf>,
    ) -> Result<Self> {
        let install_root = overrides
            .install_root
            .clone()
            .or(file.install_root)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INSTALL_ROOT));
        if install_root.is_relative() {
            bail!("install root must be an absolute path: {}", install_root.display());
        }

        let download_base_url = env(DOWNLOAD_URL_ENV)
            .or(file.download_base_url)
            .unwrap_or_else(|| DEFAULT_DOWNLOAD_BASE_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();
        let version_index_url = env(INDEX_URL_ENV)
            .or(file.version_index_url)
            .unwrap_or_else(|| DEFAULT_VERSION_INDEX_URL.to_string())
            .trim()
            .to_string();

        let workspace_root = file
            .workspace_root
            .or_else(|| home.map(|h| h.join("go")))
            .unwrap_or_else(|| PathBuf::from("go"));

        let retries = file.retries.unwrap_or(DEFAULT_RETRIES);
        if !(1..=MAX_RETRIES).contains(&retries) {
            bail!("retries must be between 1 and {MAX_RETRIES}, got {retries}");
        }

        Ok(Self {
            install_root,
            download_base_url,
            version_index_url,
            workspace_root,
            timeout: Duration::from_secs(file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            retries,
            unattended: overrides.unattended,
        })
    }

    /// `GOBIN`, the binaries-output directory under the workspace root.
    #[must_use]
    pub fn binaries_dir(&self) -> PathBuf {
        self.workspace_root.join("bin")
    }
}

/// Default config file location.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("govm").join("config.toml"))
}

fn read_config_file(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config file: {}", path.display()))
}

fn parse_config(content: &str) -> Result<FileConfig> {
    Ok(toml::from_str(content)?)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_apply_without_any_layer() {
        let settings = Settings::resolve(
            FileConfig::default(),
            &Overrides::default(),
            no_env,
            Some(PathBuf::from("/home/me")),
        )
        .unwrap();
        assert_eq!(settings.install_root, PathBuf::from("/usr/local"));
        assert_eq!(settings.download_base_url, "https://go.dev/dl");
        assert_eq!(settings.version_index_url, "https://go.dev/VERSION?m=text");
        assert_eq!(settings.workspace_root, PathBuf::from("/home/me/go"));
        assert_eq!(settings.binaries_dir(), PathBuf::from("/home/me/go/bin"));
        assert_eq!(settings.timeout, Duration::from_secs(300));
        assert_eq!(settings.retries, 3);
        assert!(!settings.unattended);
    }

    #[test]
    fn command_line_beats_file() {
        let file = FileConfig {
            install_root: Some(PathBuf::from("/opt/file")),
            ..FileConfig::default()
        };
        let overrides = Overrides {
            install_root: Some(PathBuf::from("/opt/flag")),
            unattended: true,
        };
        let settings = Settings::resolve(file, &overrides, no_env, None).unwrap();
        assert_eq!(settings.install_root, PathBuf::from("/opt/flag"));
        assert!(settings.unattended);
    }

    #[test]
    fn environment_beats_file_for_urls() {
        let file = FileConfig {
            download_base_url: Some("https://file.example/dl".to_string()),
            version_index_url: Some("https://file.example/VERSION".to_string()),
            ..FileConfig::default()
        };
        let env = |name: &str| (name == DOWNLOAD_URL_ENV).then(|| "http://mirror.local/go/".to_string());
        let settings = Settings::resolve(file, &Overrides::default(), env, None).unwrap();
        assert_eq!(settings.download_base_url, "http://mirror.local/go");
        assert_eq!(settings.version_index_url, "https://file.example/VERSION");
    }

    #[test]
    fn file_values_are_used() {
        let file = parse_config(
            r#"
            install_root = "/opt/go"
            workspace_root = "/srv/gopath"
            timeout_secs = 10
            retries = 5
            "#,
        )
        .unwrap();
        let settings = Settings::resolve(file, &Overrides::default(), no_env, None).unwrap();
        assert_eq!(settings.install_root, PathBuf::from("/opt/go"));
        assert_eq!(settings.workspace_root, PathBuf::from("/srv/gopath"));
        assert_eq!(settings.timeout, Duration::from_secs(10));
        assert_eq!(settings.retries, 5);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse_config("install_dir = \"/opt\"").is_err());
    }

    #[test]
    fn zero_retries_rejected() {
        let file = FileConfig {
            retries: Some(0),
            ..FileConfig::default()
        };
        assert!(Settings::resolve(file, &Overrides::default(), no_env, None).is_err());
    }

    #[test]
    fn excessive_retries_rejected() {
        let file = FileConfig {
            retries: Some(4_000_000_000),
            ..FileConfig::default()
        };
        let err = Settings::resolve(file, &Overrides::default(), no_env, None).unwrap_err();
        assert!(err.to_string().contains("between 1 and 10"), "{err}");

        let file = FileConfig {
            retries: Some(MAX_RETRIES),
            ..FileConfig::default()
        };
        assert!(Settings::resolve(file, &Overrides::default(), no_env, None).is_ok());
    }

    #[test]
    fn relative_root_rejected() {
        let overrides = Overrides {
            install_root: Some(PathBuf::from("relative/root")),
            unattended: false,
        };
        let err = Settings::resolve(FileConfig::default(), &overrides, no_env, None).unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    #[serial_test::serial]
    fn load_reads_explicit_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("govm.toml");
        std::fs::write(&path, "install_root = \"/opt/from-file\"\n").unwrap();

        // SAFETY: serialized with the other environment-mutating tests.
        unsafe {
            std::env::set_var(CONFIG_ENV, &path);
        }
        let settings = Settings::load(&Overrides::default());
        // SAFETY: restoring previous state.
        unsafe {
            std::env::remove_var(CONFIG_ENV);
        }

        assert_eq!(settings.unwrap().install_root, PathBuf::from("/opt/from-file"));
    }

    #[test]
    #[serial_test::serial]
    fn load_fails_for_missing_explicit_file() {
        // SAFETY: serialized with the other environment-mutating tests.
        unsafe {
            std::env::set_var(CONFIG_ENV, "/nonexistent/govm/config.toml");
        }
        let result = Settings::load(&Overrides::default());
        // SAFETY: restoring previous state.
        unsafe {
            std::env::remove_var(CONFIG_ENV);
        }
        assert!(result.is_err());
    }
}
