//! Error types for kodegen_crossbuild operations.
//!
//! This module defines all error types with actionable error messages and recovery suggestions.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for kodegen_crossbuild operations
pub type Result<T> = std::result::Result<T, CrossbuildError>;

/// Main error type for all kodegen_crossbuild operations
#[derive(Error, Debug)]
pub enum CrossbuildError {
    /// Configuration errors (reported before any dispatch or upload begins)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Builder container errors
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Release upload errors
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors with context attached at the command boundary
    #[error("{0:#}")]
    Anyhow(#[from] anyhow::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required configuration key has no value
    #[error("Missing required configuration: {key}")]
    MissingKey {
        /// Dotted configuration key (e.g. `repository.path`)
        key: String,
    },

    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    ReadFailed {
        /// Path to the config file
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for our schema
    #[error("Failed to parse config file {path}: {source}")]
    ParseFailed {
        /// Path to the config file
        path: PathBuf,
        /// Parser error
        #[source]
        source: toml::de::Error,
    },

    /// Toolchain version cannot be compared semantically
    #[error("Invalid toolchain version '{version}': {reason}")]
    InvalidToolchainVersion {
        /// Version string as configured
        version: String,
        /// Reason for the error
        reason: String,
    },

    /// A platform appears in more than one reference set
    #[error("Platform '{platform}' appears in both the {first} and {second} platform sets")]
    OverlappingPlatformSets {
        /// Duplicated platform identifier
        platform: String,
        /// First set containing the platform
        first: String,
        /// Second set containing the platform
        second: String,
    },

    /// A configured value is out of range
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue {
        /// Configuration key
        key: String,
        /// What is wrong with it
        reason: String,
    },

    /// Unknown uploader name
    #[error("Unknown uploader '{name}' (expected 'github-release' or 'api')")]
    UnknownUploader {
        /// Name given in config or on the command line
        name: String,
    },

    /// An external tool required by the command is not on PATH
    #[error("Required tool '{tool}' was not found in PATH")]
    ToolNotFound {
        /// Binary name
        tool: String,
    },

    /// No GitHub token available for API uploads
    #[error("GitHub token not provided. Set GH_TOKEN or GITHUB_TOKEN")]
    MissingToken,
}

/// Builder container errors
#[derive(Error, Debug)]
pub enum BuildError {
    /// A platform group's builder container failed
    #[error("The {group} builder docker image exited unexpectedly ({image}): {}", .source.detail())]
    GroupFailed {
        /// Human-readable group name (`base`, `main`, `ARM`, ...)
        group: String,
        /// Builder image reference used for the group
        image: String,
        /// Error reported by the runner
        #[source]
        source: Box<CrossbuildError>,
    },

    /// Builder container could not be started at all
    #[error("Failed to start builder container ({image}): {source}")]
    SpawnFailed {
        /// Builder image reference
        image: String,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

/// Release upload errors
#[derive(Error, Debug)]
pub enum UploadError {
    /// A single upload attempt failed (retried by the caller)
    #[error("Upload of '{file}' rejected: {reason}")]
    Rejected {
        /// Artifact file name
        file: String,
        /// Reason reported by the upload tool or API
        reason: String,
    },

    /// All attempts for one artifact failed
    #[error("Upload of '{file}' failed after {attempts} attempts: {}", .last_error.detail())]
    RetriesExhausted {
        /// Artifact file name
        file: String,
        /// Total number of attempts made
        attempts: u32,
        /// Error from the final attempt
        #[source]
        last_error: Box<CrossbuildError>,
    },

    /// The tarball directory walk failed
    #[error("Failed to walk {path}: {source}")]
    Walk {
        /// Root of the walk
        path: PathBuf,
        /// Underlying walkdir error
        #[source]
        source: walkdir::Error,
    },

    /// Invalid artifact pattern built from the release identity
    #[error("Invalid artifact pattern '{pattern}': {source}")]
    Pattern {
        /// Pattern text
        pattern: String,
        /// Glob error
        #[source]
        source: glob::PatternError,
    },

    /// The release for the tag does not exist on the host
    #[error("No release found for tag '{tag}' in {owner}/{repo}")]
    ReleaseNotFound {
        /// Repository owner
        owner: String,
        /// Repository name
        repo: String,
        /// Release tag
        tag: String,
    },

    /// HTTP transport error talking to the release host
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

impl CrossbuildError {
    /// Message without the category prefix, for embedding in an outer error.
    pub fn detail(&self) -> String {
        match self {
            CrossbuildError::Config(e) => e.to_string(),
            CrossbuildError::Build(e) => e.to_string(),
            CrossbuildError::Upload(UploadError::Rejected { reason, .. }) => reason.clone(),
            CrossbuildError::Upload(e) => e.to_string(),
            CrossbuildError::Cli(e) => e.to_string(),
            CrossbuildError::Io(e) => e.to_string(),
            CrossbuildError::Anyhow(e) => format!("{:#}", e),
        }
    }

    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            CrossbuildError::Config(ConfigError::MissingKey { key }) => vec![
                format!("Set '{}' in .crossbuild.toml", key),
                "Or pass the matching command line flag".to_string(),
            ],
            CrossbuildError::Config(ConfigError::ToolNotFound { tool }) => vec![
                format!("Install '{}' and make sure it is on your PATH", tool),
            ],
            CrossbuildError::Config(ConfigError::MissingToken) => vec![
                "Export GH_TOKEN or GITHUB_TOKEN with 'repo' scope".to_string(),
                "Or use --uploader github-release".to_string(),
            ],
            CrossbuildError::Build(BuildError::GroupFailed { source, .. })
                if matches!(**source, CrossbuildError::Build(BuildError::SpawnFailed { .. })) =>
            {
                vec!["Check that the Docker daemon is running: docker info".to_string()]
            }
            CrossbuildError::Build(BuildError::GroupFailed { image, .. }) => vec![
                format!("Check that the image exists: docker pull {}", image),
                "Re-run with RUST_LOG=debug to see the exact docker invocation".to_string(),
            ],
            CrossbuildError::Upload(UploadError::RetriesExhausted { .. }) => vec![
                "Increase the retry budget with --retry".to_string(),
                "Check that the release tag exists on GitHub".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_upload_message_has_single_prefix() {
        let err: CrossbuildError = UploadError::RetriesExhausted {
            file: "promu-0.5.0.linux-amd64.tar.gz".to_string(),
            attempts: 3,
            last_error: Box::new(
                UploadError::Rejected {
                    file: "promu-0.5.0.linux-amd64.tar.gz".to_string(),
                    reason: "upload returned 502 Bad Gateway: bad gateway".to_string(),
                }
                .into(),
            ),
        }
        .into();

        assert_eq!(
            err.to_string(),
            "Upload error: Upload of 'promu-0.5.0.linux-amd64.tar.gz' failed after 3 attempts: \
             upload returned 502 Bad Gateway: bad gateway"
        );
    }

    #[test]
    fn test_group_failure_embeds_runner_detail() {
        let err: CrossbuildError = BuildError::GroupFailed {
            group: "ARM".to_string(),
            image: "quay.io/prometheus/golang-builder:1.7.1-arm".to_string(),
            source: Box::new(
                CliError::ExecutionFailed {
                    command: "docker run".to_string(),
                    reason: "exit code 2".to_string(),
                }
                .into(),
            ),
        }
        .into();

        let message = err.to_string();
        assert!(message.starts_with("Build error: The ARM builder docker image exited"));
        assert!(!message.contains("CLI error"));
        assert!(message.ends_with("Command execution failed: docker run - exit code 2"));
    }

    #[test]
    fn test_context_chain_is_rendered() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CrossbuildError = anyhow::Error::new(io)
            .context("Failed to determine the working directory")
            .into();
        assert_eq!(
            err.to_string(),
            "Failed to determine the working directory: gone"
        );
    }
}
