//! Build toolchain identity.
//!
//! Toolchain versions come from configuration as loose strings (`1.6`,
//! `1.10`, `go1.7.1`, `1.8rc1`). Without a `go`/`v` prefix they become
//! builder image tags, and they are parsed into a [`semver::Version`] for ordering, so `1.10` sorts
//! after `1.6`.

use crate::error::ConfigError;
use semver::{Prerelease, Version};

/// Minimum toolchain version able to target MIPS platforms.
pub const MIPS_MIN_VERSION: Version = Version::new(1, 6, 0);

/// Toolchain version used when none is configured.
pub const DEFAULT_TOOLCHAIN_VERSION: &str = "1.7.1";

/// Toolchain identity supplied by configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    tag: String,
    version: Version,
    native_interop: bool,
}

impl Toolchain {
    /// Create a toolchain identity, validating that the version is comparable.
    pub fn new(raw: impl Into<String>, native_interop: bool) -> Result<Self, ConfigError> {
        let raw = raw.into();
        let version = parse_toolchain_version(&raw)?;
        Ok(Self {
            tag: strip_version_prefix(&raw).to_string(),
            version,
            native_interop,
        })
    }

    /// Version as configured minus any `go`/`v` prefix, used in builder
    /// image tags.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Whether native interop (CGO) builds are requested.
    pub fn native_interop(&self) -> bool {
        self.native_interop
    }

    /// Whether this toolchain can build MIPS targets.
    pub fn supports_mips(&self) -> bool {
        self.version >= MIPS_MIN_VERSION
    }
}

fn strip_version_prefix(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("go")
        .or_else(|| trimmed.strip_prefix('v'))
        .unwrap_or(trimmed)
}

/// Parse a toolchain version leniently into a semantic version.
///
/// Missing minor/patch components default to zero. A non-numeric suffix on
/// the last component (`1.8rc1`) becomes the pre-release tag.
pub fn parse_toolchain_version(raw: &str) -> Result<Version, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidToolchainVersion {
        version: raw.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = strip_version_prefix(raw);

    if trimmed.is_empty() {
        return Err(invalid("version is empty"));
    }

    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.len() > 3 {
        return Err(invalid("expected at most major.minor.patch"));
    }

    let mut numbers = [0u64; 3];
    let mut pre = Prerelease::EMPTY;

    for (index, part) in parts.iter().enumerate() {
        let digits_end = part
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(part.len());
        let (digits, suffix) = part.split_at(digits_end);

        if digits.is_empty() {
            return Err(invalid("components must start with a number"));
        }
        numbers[index] = digits
            .parse()
            .map_err(|_| invalid("numeric component out of range"))?;

        if !suffix.is_empty() {
            if index + 1 != parts.len() {
                return Err(invalid("only the last component may carry a suffix"));
            }
            let suffix = suffix.trim_start_matches('-');
            pre = Prerelease::new(suffix).map_err(|e| invalid(&e.to_string()))?;
        }
    }

    let mut version = Version::new(numbers[0], numbers[1], numbers[2]);
    version.pre = pre;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pads_missing_components() {
        assert_eq!(parse_toolchain_version("1.6").unwrap(), Version::new(1, 6, 0));
        assert_eq!(parse_toolchain_version("1").unwrap(), Version::new(1, 0, 0));
        assert_eq!(parse_toolchain_version("1.7.1").unwrap(), Version::new(1, 7, 1));
    }

    #[test]
    fn test_parse_strips_prefixes() {
        assert_eq!(parse_toolchain_version("go1.9").unwrap(), Version::new(1, 9, 0));
        assert_eq!(parse_toolchain_version("v1.9.2").unwrap(), Version::new(1, 9, 2));
    }

    #[test]
    fn test_parse_release_candidate_sorts_before_release() {
        let rc = parse_toolchain_version("1.8rc1").unwrap();
        assert_eq!(rc.pre.as_str(), "rc1");
        assert!(rc < Version::new(1, 8, 0));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_toolchain_version("").is_err());
        assert!(parse_toolchain_version("latest").is_err());
        assert!(parse_toolchain_version("1.x.2").is_err());
        assert!(parse_toolchain_version("1.2.3.4").is_err());
    }

    #[test]
    fn test_mips_support_uses_semantic_ordering() {
        let supports = |v: &str| Toolchain::new(v, false).unwrap().supports_mips();
        assert!(!supports("1.5"));
        assert!(supports("1.6"));
        // "1.10" < "1.6" lexically
        assert!(supports("1.10"));
    }

    #[test]
    fn test_tag_keeps_raw_text() {
        let toolchain = Toolchain::new("1.10", true).unwrap();
        assert_eq!(toolchain.tag(), "1.10");
        assert!(toolchain.native_interop());
    }

    #[test]
    fn test_tag_drops_version_prefix() {
        assert_eq!(Toolchain::new("go1.9", false).unwrap().tag(), "1.9");
        assert_eq!(Toolchain::new("v1.9.2", false).unwrap().tag(), "1.9.2");
        assert_eq!(Toolchain::new(" 1.8rc1 ", false).unwrap().tag(), "1.8rc1");
    }
}
