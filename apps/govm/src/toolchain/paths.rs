//! Filesystem layout of a govm install root.
//!
//! ```text
//! /usr/local/                  # install root (or GOVM_ROOT / --root)
//!   go -> go-1.23.1            # active version pointer (symlink)
//!   go-1.22.5/                 # installed version directory
//!     bin/go                   # entry-point binary
//!     .govm-install.json       # completion marker
//!   go-1.23.1/
//!   .govm-scratch/             # downloaded archives, removed after install
//!   .govm-staging-1.23.1/      # extraction in progress
//!   .govm-backup-1.20.0/       # legacy copy kept while migrating
//! ```
//!
//! Before migration the well-known `go` entry is a plain directory holding a
//! single unversioned installation.

use crate::errors::{IoResultExt, Result};
use crate::toolchain::version::ToolchainVersion;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default install root.
pub const DEFAULT_INSTALL_ROOT: &str = "/usr/local";

/// Name of the active version pointer inside the install root.
pub const ACTIVE_LINK_NAME: &str = "go";

/// Prefix of installed version directory names.
pub const VERSION_DIR_PREFIX: &str = "go-";

/// Completion marker written as the last step of a successful install.
const MARKER_FILE: &str = ".govm-install.json";

const SCRATCH_DIR: &str = ".govm-scratch";
const STAGING_PREFIX: &str = ".govm-staging-";
const BACKUP_PREFIX: &str = ".govm-backup-";
const LINK_TEMP_NAME: &str = ".go.govm-swap";

/// Contents of the completion marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallMarker {
    pub version: String,
    /// Install date as `YYYY-MM-DD` (UTC).
    pub installed_at: String,
}

impl InstallMarker {
    /// Creates a marker for `version` stamped with today's date.
    #[must_use]
    pub fn now(version: &ToolchainVersion) -> Self {
        Self {
            version: version.to_string(),
            installed_at: format_date(unix_days_now()),
        }
    }

    /// Returns a relative description such as "today" or "3 weeks ago".
    #[must_use]
    pub fn installed_ago(&self) -> String {
        match parse_date(&self.installed_at) {
            Some(days) => describe_age(unix_days_now().saturating_sub(days)),
            None => self.installed_at.clone(),
        }
    }
}

/// Paths under one install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
}

impl InstallLayout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The well-known path holding either the pointer or a legacy install.
    #[must_use]
    pub fn active_link(&self) -> PathBuf {
        self.root.join(ACTIVE_LINK_NAME)
    }

    /// Sibling path used to build a replacement pointer before renaming it
    /// over [`Self::active_link`].
    #[must_use]
    pub fn link_swap_path(&self) -> PathBuf {
        self.root.join(LINK_TEMP_NAME)
    }

    #[must_use]
    pub fn version_dir(&self, version: &ToolchainVersion) -> PathBuf {
        self.root.join(format!("{VERSION_DIR_PREFIX}{version}"))
    }

    #[must_use]
    pub fn scratch_dir(&self) -> PathBuf {
        self.root.join(SCRATCH_DIR)
    }

    #[must_use]
    pub fn staging_dir(&self, version: &ToolchainVersion) -> PathBuf {
        self.root.join(format!("{STAGING_PREFIX}{version}"))
    }

    #[must_use]
    pub fn backup_dir(&self, version: &ToolchainVersion) -> PathBuf {
        self.root.join(format!("{BACKUP_PREFIX}{version}"))
    }

    /// Atomically points [`Self::active_link`] at `target`.
    ///
    /// A new symlink is created at [`Self::link_swap_path`] and renamed over
    /// the pointer, so the well-known path is never absent while an earlier
    /// pointer exists. Renaming over a real directory fails, which leaves a
    /// legacy installation untouched.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error when the link cannot be created or
    /// renamed into place.
    pub fn repoint(&self, target: &Path) -> io::Result<()> {
        let swap = self.link_swap_path();
        match fs::symlink_metadata(&swap) {
            Ok(_) => fs::remove_file(&swap)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        create_link(target, &swap)?;
        if let Err(e) = fs::rename(&swap, self.active_link()) {
            let _ = fs::remove_file(&swap);
            return Err(e);
        }
        Ok(())
    }

    /// Removes the pointer if it is a symlink. Never touches a directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the symlink exists but cannot be removed.
    pub fn remove_link(&self) -> Result<()> {
        let link = self.active_link();
        match fs::symlink_metadata(&link) {
            Ok(meta) if meta.file_type().is_symlink() => fs::remove_file(&link)
                .io_context(|| format!("failed to remove {}", link.display())),
            _ => Ok(()),
        }
    }

    /// Writes the completion marker into `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker cannot be serialized or written.
    pub fn write_marker(dir: &Path, marker: &InstallMarker) -> Result<()> {
        let path = dir.join(MARKER_FILE);
        let json = serde_json::to_string_pretty(marker)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
            .io_context(|| "failed to serialize install marker")?;
        fs::write(&path, json).io_context(|| format!("failed to write {}", path.display()))
    }

    /// Reads the completion marker of `dir`, if present and readable.
    #[must_use]
    pub fn read_marker(dir: &Path) -> Option<InstallMarker> {
        let content = fs::read_to_string(dir.join(MARKER_FILE)).ok()?;
        serde_json::from_str(&content).ok()
    }
}

/// Location of the entry-point binary inside an installation directory.
#[must_use]
pub fn binary_in(dir: &Path) -> PathBuf {
    dir.join("bin").join(format!("go{}", std::env::consts::EXE_SUFFIX))
}

/// Whether `dir` satisfies the installation invariant: an executable
/// entry-point binary at the fixed relative path.
#[must_use]
pub fn has_valid_binary(dir: &Path) -> bool {
    is_executable(&binary_in(dir))
}

/// Parses an installed directory name such as `go-1.21.0`.
///
/// Only the bare form is accepted after the prefix.
#[must_use]
pub fn parse_version_dir_name(name: &str) -> Option<ToolchainVersion> {
    let suffix = name.strip_prefix(VERSION_DIR_PREFIX)?;
    if !suffix.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    ToolchainVersion::parse(suffix).ok()
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(unix)]
fn create_link(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_link(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}

fn unix_days_now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() / 86_400)
}

/// Formats days since the Unix epoch as `YYYY-MM-DD`.
fn format_date(days: u64) -> String {
    let (year, month, day) = civil_from_days(days);
    format!("{year:04}-{month:02}-{day:02}")
}

/// Parses `YYYY-MM-DD` into days since the Unix epoch.
fn parse_date(date: &str) -> Option<u64> {
    let mut parts = date.splitn(3, '-').map(str::parse::<u64>);
    let (Some(Ok(year)), Some(Ok(month)), Some(Ok(day))) = (parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    if year < 1970 || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some(days_from_civil(year, month, day))
}

// Gregorian calendar conversion on 400-year eras.
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z % 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

fn days_from_civil(year: u64, month: u64, day: u64) -> u64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = year / 400;
    let yoe = year % 400;
    let mp = if month > 2 { month - 3 } else { month + 9 };
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    (era * 146_097 + doe).saturating_sub(719_468)
}

fn describe_age(days: u64) -> String {
    match days {
        0 => "today".to_string(),
        1 => "yesterday".to_string(),
        2..=6 => format!("{days} days ago"),
        7..=13 => "1 week ago".to_string(),
        14..=27 => format!("{} weeks ago", days / 7),
        28..=59 => "1 month ago".to_string(),
        60..=364 => format!("{} months ago", days / 30),
        365..=729 => "1 year ago".to_string(),
        _ => format!("{} years ago", days / 365),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn v(s: &str) -> ToolchainVersion {
        ToolchainVersion::parse(s).unwrap()
    }

    #[test]
    fn layout_paths_are_siblings_of_the_pointer() {
        let layout = InstallLayout::new("/usr/local");
        assert_eq!(layout.active_link(), PathBuf::from("/usr/local/go"));
        assert_eq!(layout.version_dir(&v("1.21.0")), PathBuf::from("/usr/local/go-1.21.0"));
        assert_eq!(
            layout.staging_dir(&v("go1.21.0")),
            PathBuf::from("/usr/local/.govm-staging-1.21.0")
        );
        assert_eq!(
            layout.backup_dir(&v("1.20")),
            PathBuf::from("/usr/local/.govm-backup-1.20")
        );
    }

    #[test]
    fn dir_names_parse_only_in_bare_form() {
        assert_eq!(parse_version_dir_name("go-1.21.0"), Some(v("1.21.0")));
        assert_eq!(parse_version_dir_name("go-1.22"), Some(v("1.22")));
        assert_eq!(parse_version_dir_name("go-go1.22"), None);
        assert_eq!(parse_version_dir_name("go"), None);
        assert_eq!(parse_version_dir_name("go-latest"), None);
        assert_eq!(parse_version_dir_name("rust-1.70.0"), None);
    }

    #[test]
    fn marker_round_trips_through_directory() {
        let tmp = TempDir::new().unwrap();
        let marker = InstallMarker::now(&v("1.21.0"));
        InstallLayout::write_marker(tmp.path(), &marker).unwrap();
        assert_eq!(InstallLayout::read_marker(tmp.path()), Some(marker));
    }

    #[test]
    fn missing_marker_reads_as_none() {
        let tmp = TempDir::new().unwrap();
        assert!(InstallLayout::read_marker(tmp.path()).is_none());
    }

    #[test]
    fn fresh_marker_is_from_today() {
        let marker = InstallMarker::now(&v("1.21.0"));
        assert_eq!(marker.installed_ago(), "today");
    }

    #[test]
    fn unparseable_date_is_shown_verbatim() {
        let marker = InstallMarker {
            version: "1.21.0".to_string(),
            installed_at: "sometime".to_string(),
        };
        assert_eq!(marker.installed_ago(), "sometime");
    }

    #[test]
    fn calendar_conversion_matches_known_dates() {
        assert_eq!(format_date(0), "1970-01-01");
        assert_eq!(format_date(19_966), "2024-08-31");
        assert_eq!(format_date(11_016), "2000-02-29");
        assert_eq!(parse_date("2024-08-31"), Some(19_966));
        assert_eq!(parse_date("2000-02-29"), Some(11_016));
        assert_eq!(parse_date("2024-13-01"), None);
    }

    #[test]
    fn age_descriptions() {
        assert_eq!(describe_age(1), "yesterday");
        assert_eq!(describe_age(3), "3 days ago");
        assert_eq!(describe_age(15), "2 weeks ago");
        assert_eq!(describe_age(90), "3 months ago");
        assert_eq!(describe_age(800), "2 years ago");
    }

    #[cfg(unix)]
    #[test]
    fn repoint_replaces_existing_link() {
        let tmp = TempDir::new().unwrap();
        let layout = InstallLayout::new(tmp.path());
        let first = tmp.path().join("go-1.21.0");
        let second = tmp.path().join("go-1.22.0");
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();

        layout.repoint(&first).unwrap();
        assert_eq!(fs::read_link(layout.active_link()).unwrap(), first);
        layout.repoint(&second).unwrap();
        assert_eq!(fs::read_link(layout.active_link()).unwrap(), second);
        assert!(fs::symlink_metadata(layout.link_swap_path()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn repoint_refuses_to_replace_a_directory() {
        let tmp = TempDir::new().unwrap();
        let layout = InstallLayout::new(tmp.path());
        fs::create_dir_all(layout.active_link().join("bin")).unwrap();
        let target = tmp.path().join("go-1.21.0");
        fs::create_dir_all(&target).unwrap();

        assert!(layout.repoint(&target).is_err());
        assert!(layout.active_link().join("bin").is_dir());
        assert!(fs::symlink_metadata(layout.link_swap_path()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn remove_link_leaves_directories_alone() {
        let tmp = TempDir::new().unwrap();
        let layout = InstallLayout::new(tmp.path());
        fs::create_dir_all(layout.active_link()).unwrap();
        layout.remove_link().unwrap();
        assert!(layout.active_link().is_dir());
    }
}
