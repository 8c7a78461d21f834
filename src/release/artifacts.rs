//! Release tarball discovery.
//!
//! Artifacts are recognized by base name only: `<name>-<version>.*.tar.gz`.

use super::ReleaseIdentity;
use crate::error::UploadError;
use glob::Pattern;
use std::path::Path;

/// Matches artifact file names for one release.
#[derive(Debug, Clone)]
pub struct ArtifactMatcher {
    pattern: Pattern,
}

impl ArtifactMatcher {
    /// Build the matcher for a release identity.
    ///
    /// Name and version are escaped, so only the middle segment is a
    /// wildcard.
    pub fn new(identity: &ReleaseIdentity) -> Result<Self, UploadError> {
        let pattern_str = format!(
            "{}-{}.*.tar.gz",
            Pattern::escape(&identity.name),
            Pattern::escape(&identity.version)
        );
        let pattern = Pattern::new(&pattern_str).map_err(|source| UploadError::Pattern {
            pattern: pattern_str.clone(),
            source,
        })?;
        Ok(Self { pattern })
    }

    /// Whether a file name is an artifact of this release.
    pub fn matches(&self, file_name: &str) -> bool {
        self.pattern.matches(file_name)
    }

    /// Match on the base name of a path.
    pub fn matches_path(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| self.matches(name))
    }

    /// The underlying glob, for messages.
    pub fn as_str(&self) -> &str {
        self.pattern.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(name: &str, version: &str) -> ArtifactMatcher {
        ArtifactMatcher::new(&ReleaseIdentity {
            name: name.to_string(),
            version: version.to_string(),
            owner: "prometheus".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_matches_release_tarball() {
        let m = matcher("promu", "0.5.0");
        assert!(m.matches("promu-0.5.0.linux-amd64.tar.gz"));
        assert!(m.matches("promu-0.5.0.darwin-386.tar.gz"));
    }

    #[test]
    fn test_rejects_other_versions_and_projects() {
        let m = matcher("promu", "0.5.0");
        assert!(!m.matches("promu-0.4.0.linux-amd64.tar.gz"));
        assert!(!m.matches("other-0.5.0.tar.gz"));
        assert!(!m.matches("promu-0.5.0.linux-amd64.zip"));
        assert!(!m.matches("sha256sums.txt"));
    }

    #[test]
    fn test_name_and_version_are_literal() {
        // '.' and '[' in identity must not act as wildcards
        let m = matcher("my[app]", "1.0.0");
        assert!(m.matches("my[app]-1.0.0.linux-arm.tar.gz"));
        assert!(!m.matches("mya-1.0.0.linux-arm.tar.gz"));
    }

    #[test]
    fn test_matches_path_uses_base_name() {
        let m = matcher("promu", "0.5.0");
        assert!(m.matches_path(Path::new(
            "/tmp/.tarballs/promu-0.5.0.linux-amd64.tar.gz"
        )));
        assert!(!m.matches_path(Path::new(
            "/tmp/promu-0.5.0.linux-amd64.tar.gz/README"
        )));
    }
}
