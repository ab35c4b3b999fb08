//! Toolchain version identifiers.
//!
//! Go releases are named `major.minor[.patch]` and usually carry a `go`
//! prefix (`go1.21.0`). Everything in govm works with the bare form: the
//! prefix is stripped on parse and never written back out.

use crate::errors::{GovmError, Result};
use std::fmt;
use std::str::FromStr;

/// Distribution-name prefix stripped during normalization.
pub const DISTRIBUTION_PREFIX: &str = "go";

/// A bare `major.minor[.patch]` version.
///
/// Ordering is numeric per component. A version without a patch sorts
/// before the same `major.minor` with any patch, so `1.21 < 1.21.0 < 1.21.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ToolchainVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: Option<u32>,
}

impl ToolchainVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: Option<u32>) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses a bare or `go`-prefixed version string.
    ///
    /// # Errors
    ///
    /// Returns [`GovmError::InvalidVersionFormat`] unless the input is two or
    /// three dot-separated decimal components.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let bare = trimmed
            .strip_prefix(DISTRIBUTION_PREFIX)
            .unwrap_or(trimmed);

        let mut components = Vec::with_capacity(3);
        for part in bare.split('.') {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(GovmError::invalid_version(input.trim()));
            }
            let value = part
                .parse::<u32>()
                .map_err(|_| GovmError::invalid_version(input.trim()))?;
            components.push(value);
        }

        match components.as_slice() {
            [major, minor] => Ok(Self::new(*major, *minor, None)),
            [major, minor, patch] => Ok(Self::new(*major, *minor, Some(*patch))),
            _ => Err(GovmError::invalid_version(input.trim())),
        }
    }

    /// Whether a version reported by a binary agrees with this one.
    ///
    /// Patches are compared only when both sides carry one, so `1.22`
    /// matches a binary reporting `1.22.0`.
    #[must_use]
    pub fn matches(&self, reported: &Self) -> bool {
        self.major == reported.major
            && self.minor == reported.minor
            && match (self.patch, reported.patch) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
    }
}

impl FromStr for ToolchainVersion {
    type Err = GovmError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ToolchainVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.patch {
            Some(patch) => write!(f, "{}.{}.{patch}", self.major, self.minor),
            None => write!(f, "{}.{}", self.major, self.minor),
        }
    }
}

/// Returns the first whitespace-separated token in `text` that parses as a
/// version.
///
/// Works on the remote index (`go1.23.1\ntime 2024-...`) and on the output of
/// `go version` (`go version go1.21.0 linux/amd64`).
#[must_use]
pub fn extract_first_version(text: &str) -> Option<ToolchainVersion> {
    text.split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '.'))
        .filter(|token| token.starts_with(DISTRIBUTION_PREFIX) || token.starts_with(|c: char| c.is_ascii_digit()))
        .find_map(|token| ToolchainVersion::parse(token).ok())
}
