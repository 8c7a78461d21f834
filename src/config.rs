//! Layered configuration.
//!
//! Built-in defaults, then `.crossbuild.toml`, then command line flags and
//! their environment variables. Each command resolves the keys it needs into
//! a settings struct and fails with [`ConfigError::MissingKey`] before doing
//! any work if a required key is absent.

use crate::crossbuild::{DEFAULT_BUILDER_IMAGE, DEFAULT_TOOLCHAIN_VERSION, PlatformSets, Toolchain};
use crate::error::ConfigError;
use crate::release::{RetryPolicy, UploaderKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".crossbuild.toml";

/// Contents of the config file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// `[repository]`
    pub repository: RepositorySection,
    /// `[toolchain]`
    pub toolchain: ToolchainSection,
    /// `[crossbuild]`
    pub crossbuild: CrossbuildSection,
    /// `[release]`
    pub release: ReleaseSection,
}

/// `[repository]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepositorySection {
    /// Import path of the project inside the builder
    pub path: Option<String>,
}

/// `[toolchain]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainSection {
    /// Toolchain version, also the builder image tag prefix
    pub version: Option<String>,
    /// Build with native interop (CGO)
    pub native_interop: Option<bool>,
}

/// `[crossbuild]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrossbuildSection {
    /// Requested platforms
    pub platforms: Option<Vec<String>>,
    /// Builder image repository
    pub builder_image: Option<String>,
    /// Replacement reference platform sets
    pub platform_sets: Option<PlatformSetsSection>,
}

/// `[crossbuild.platform_sets]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlatformSetsSection {
    /// Main set
    pub main: Vec<String>,
    /// ARM set
    pub arm: Vec<String>,
    /// PowerPC set
    pub powerpc: Vec<String>,
    /// MIPS set
    pub mips: Vec<String>,
}

/// `[release]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseSection {
    /// Project name
    pub name: Option<String>,
    /// Release version
    pub version: Option<String>,
    /// Repository owner
    pub owner: Option<String>,
    /// Additional upload attempts
    pub retries: Option<u32>,
    /// Seconds between upload attempts
    pub retry_delay_secs: Option<u64>,
    /// `github-release` or `api`
    pub uploader: Option<String>,
}

impl FileConfig {
    /// Load the config file.
    ///
    /// With an explicit path the file must exist. Otherwise
    /// `.crossbuild.toml` in `dir` is used when present.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let candidate = dir.join(DEFAULT_CONFIG_FILE);
                if !candidate.is_file() {
                    log::debug!("No {} in {}", DEFAULT_CONFIG_FILE, dir.display());
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadFailed {
            path: path.clone(),
            source,
        })?;
        Self::parse(&contents, &path)
    }

    /// Parse config text; `path` is only used in errors.
    pub fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Command line values for `crossbuild`; `None` defers to the file.
#[derive(Debug, Clone, Default)]
pub struct CrossbuildOverrides {
    /// `--platforms`
    pub platforms: Option<Vec<String>>,
    /// `--go`
    pub toolchain_version: Option<String>,
    /// `--cgo`
    pub native_interop: bool,
    /// `--repository-path`
    pub repository_path: Option<String>,
    /// `--builder-image`
    pub builder_image: Option<String>,
}

/// Resolved settings for `crossbuild`.
#[derive(Debug, Clone)]
pub struct CrossbuildSettings {
    /// Project import path inside the builder
    pub repository_path: String,
    /// Toolchain identity
    pub toolchain: Toolchain,
    /// Requested platforms
    pub platforms: Vec<String>,
    /// Builder image repository
    pub builder_image: String,
    /// Reference platform sets
    pub platform_sets: PlatformSets,
}

impl CrossbuildSettings {
    /// Merge file config and overrides.
    pub fn resolve(file: &FileConfig, overrides: CrossbuildOverrides) -> Result<Self, ConfigError> {
        let repository_path = overrides
            .repository_path
            .or_else(|| file.repository.path.clone())
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingKey {
                key: "repository.path".to_string(),
            })?;

        let version = overrides
            .toolchain_version
            .or_else(|| file.toolchain.version.clone())
            .unwrap_or_else(|| DEFAULT_TOOLCHAIN_VERSION.to_string());
        let native_interop =
            overrides.native_interop || file.toolchain.native_interop.unwrap_or(false);
        let toolchain = Toolchain::new(version, native_interop)?;

        let platform_sets = match &file.crossbuild.platform_sets {
            Some(sets) => PlatformSets::new(
                sets.main.clone(),
                sets.arm.clone(),
                sets.powerpc.clone(),
                sets.mips.clone(),
            )?,
            None => PlatformSets::default(),
        };

        let platforms = overrides
            .platforms
            .or_else(|| file.crossbuild.platforms.clone())
            .unwrap_or_else(|| platform_sets.all_platforms());

        let builder_image = overrides
            .builder_image
            .or_else(|| file.crossbuild.builder_image.clone())
            .unwrap_or_else(|| DEFAULT_BUILDER_IMAGE.to_string());

        Ok(Self {
            repository_path,
            toolchain,
            platforms,
            builder_image,
            platform_sets,
        })
    }
}

/// Command line values for `release`; `None` defers to the file.
#[derive(Debug, Clone, Default)]
pub struct ReleaseOverrides {
    /// `--name`
    pub name: Option<String>,
    /// `--version`
    pub version: Option<String>,
    /// `--owner`
    pub owner: Option<String>,
    /// `--retry`
    pub retries: Option<u32>,
    /// `--uploader`
    pub uploader: Option<String>,
}

/// Resolved settings for `release`.
///
/// Identity fields stay optional here; the release command fills gaps
/// from the `VERSION` file and the git remote.
#[derive(Debug, Clone)]
pub struct ReleaseSettings {
    /// Project name
    pub name: Option<String>,
    /// Release version
    pub version: Option<String>,
    /// Repository owner
    pub owner: Option<String>,
    /// Upload retry policy
    pub retry: RetryPolicy,
    /// Upload backend
    pub uploader: UploaderKind,
}

impl ReleaseSettings {
    /// Merge file config and overrides.
    pub fn resolve(file: &FileConfig, overrides: ReleaseOverrides) -> Result<Self, ConfigError> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let mut retry = RetryPolicy::default();
        if let Some(retries) = overrides.retries.or(file.release.retries) {
            retry.retries = retries;
        }
        if let Some(secs) = file.release.retry_delay_secs {
            retry.delay = Duration::from_secs(secs);
        }
        retry.validate().map_err(|reason| ConfigError::InvalidValue {
            key: "release.retries".to_string(),
            reason,
        })?;

        let uploader = match overrides.uploader.or_else(|| file.release.uploader.clone()) {
            Some(name) => name.parse()?,
            None => UploaderKind::default(),
        };

        Ok(Self {
            name: non_empty(overrides.name.or_else(|| file.release.name.clone())),
            version: non_empty(overrides.version.or_else(|| file.release.version.clone())),
            owner: non_empty(overrides.owner.or_else(|| file.release.owner.clone())),
            retry,
            uploader,
        })
    }
}

/// Split a platform list given as one string on whitespace or commas.
pub fn parse_platform_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Path of the `VERSION` file in a project directory.
pub fn version_file(dir: &Path) -> PathBuf {
    dir.join("VERSION")
}
