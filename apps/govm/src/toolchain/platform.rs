//! Host platform resolution.
//!
//! Maps the host CPU and operating system identifiers to the tags used in Go
//! distribution archive names (`go1.23.1.linux-amd64.tar.gz`).
//!
//! ## Architectures
//!
//! | Host identifier              | Tag       |
//! |------------------------------|-----------|
//! | `x86_64`, `amd64`            | `amd64`   |
//! | `aarch64`, `arm64`           | `arm64`   |
//! | `armv6l`, `armv7l`, `arm`    | `armv6l`  |
//! | `i386`, `i686`, `x86`        | `386`     |
//! | `ppc64le`, `powerpc64le`     | `ppc64le` |
//! | `s390x`                      | `s390x`   |

use crate::errors::{GovmError, Result};
use std::fmt;

/// CPU architecture tag of a Go distribution archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Amd64,
    Arm64,
    Armv6l,
    I386,
    Ppc64le,
    S390x,
}

impl Arch {
    /// Resolves a host CPU identifier, as printed by `uname -m` or
    /// `std::env::consts::ARCH`.
    ///
    /// # Errors
    ///
    /// Returns [`GovmError::UnsupportedArchitecture`] for any identifier not in
    /// the table above.
    pub fn from_host_identifier(identifier: &str) -> Result<Self> {
        match identifier.trim() {
            "x86_64" | "amd64" => Ok(Self::Amd64),
            "aarch64" | "arm64" => Ok(Self::Arm64),
            "armv6l" | "armv7l" | "arm" => Ok(Self::Armv6l),
            "i386" | "i686" | "x86" => Ok(Self::I386),
            "ppc64le" | "powerpc64le" => Ok(Self::Ppc64le),
            "s390x" => Ok(Self::S390x),
            other => Err(GovmError::UnsupportedArchitecture {
                arch: other.to_string(),
            }),
        }
    }

    /// Returns the tag used in archive file names.
    #[must_use = "returns the tag without side effects"]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
            Self::Armv6l => "armv6l",
            Self::I386 => "386",
            Self::Ppc64le => "ppc64le",
            Self::S390x => "s390x",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operating system tag of a Go distribution archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    Darwin,
    FreeBsd,
}

impl Os {
    /// Resolves an operating system name as found in `std::env::consts::OS`.
    ///
    /// # Errors
    ///
    /// Returns [`GovmError::UnsupportedArchitecture`] naming the OS when no Go
    /// archive is published for it.
    pub fn from_host_identifier(identifier: &str) -> Result<Self> {
        match identifier {
            "linux" => Ok(Self::Linux),
            "macos" | "darwin" => Ok(Self::Darwin),
            "freebsd" => Ok(Self::FreeBsd),
            other => Err(GovmError::UnsupportedArchitecture {
                arch: other.to_string(),
            }),
        }
    }

    #[must_use = "returns the tag without side effects"]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::FreeBsd => "freebsd",
        }
    }
}

/// OS and architecture pair of the running host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    /// Detects the current platform from the compile-time target.
    ///
    /// # Errors
    ///
    /// Returns [`GovmError::UnsupportedArchitecture`] when the host has no Go
    /// distribution.
    pub fn detect() -> Result<Self> {
        Ok(Self {
            os: Os::from_host_identifier(std::env::consts::OS)?,
            arch: Arch::from_host_identifier(std::env::consts::ARCH)?,
        })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.as_str(), self.arch.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_to_same_tag() {
        assert_eq!(Arch::from_host_identifier("x86_64").unwrap(), Arch::Amd64);
        assert_eq!(Arch::from_host_identifier("amd64").unwrap(), Arch::Amd64);
        assert_eq!(Arch::from_host_identifier("aarch64").unwrap(), Arch::Arm64);
        assert_eq!(Arch::from_host_identifier("arm64").unwrap(), Arch::Arm64);
        assert_eq!(Arch::from_host_identifier("armv7l").unwrap(), Arch::Armv6l);
        assert_eq!(Arch::from_host_identifier("i686").unwrap(), Arch::I386);
    }

    #[test]
    fn tags_match_archive_names() {
        assert_eq!(Arch::I386.as_str(), "386");
        assert_eq!(Arch::Armv6l.to_string(), "armv6l");
        assert_eq!(Arch::Ppc64le.as_str(), "ppc64le");
        assert_eq!(Arch::S390x.as_str(), "s390x");
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(Arch::from_host_identifier("x86_64\n").unwrap(), Arch::Amd64);
    }

    #[test]
    fn unknown_arch_is_unsupported() {
        let err = Arch::from_host_identifier("riscv64").unwrap_err();
        assert!(matches!(
            err,
            GovmError::UnsupportedArchitecture { ref arch } if arch == "riscv64"
        ));
    }

    #[test]
    fn macos_maps_to_darwin() {
        assert_eq!(Os::from_host_identifier("macos").unwrap(), Os::Darwin);
        assert!(Os::from_host_identifier("windows").is_err());
    }

    #[test]
    fn platform_display_joins_os_and_arch() {
        let platform = Platform {
            os: Os::Linux,
            arch: Arch::Amd64,
        };
        assert_eq!(platform.to_string(), "linux-amd64");
    }
}
