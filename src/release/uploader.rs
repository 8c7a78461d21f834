//! Upload backends for release artifacts.

use crate::error::{ConfigError, Result, UploadError};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// One artifact upload request.
#[derive(Debug, Clone, Copy)]
pub struct ReleaseAsset<'a> {
    /// Repository owner
    pub owner: &'a str,
    /// Repository name (the release name)
    pub repo: &'a str,
    /// Release tag (`v<version>`)
    pub tag: &'a str,
    /// Asset name, the artifact's base name
    pub file_name: &'a str,
    /// Full path of the artifact
    pub path: &'a Path,
}

/// Uploads a single artifact to the release host.
///
/// One call is one attempt; retrying is the caller's job.
pub trait ArtifactUploader {
    /// Upload `asset`.
    fn upload(&self, asset: &ReleaseAsset<'_>) -> impl Future<Output = Result<()>> + Send;
}

/// Which upload backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploaderKind {
    /// The `github-release` command line tool
    #[default]
    GithubReleaseTool,
    /// The GitHub REST API
    GithubApi,
}

impl std::str::FromStr for UploaderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "github-release" => Ok(UploaderKind::GithubReleaseTool),
            "api" | "github-api" => Ok(UploaderKind::GithubApi),
            _ => Err(ConfigError::UnknownUploader {
                name: s.to_string(),
            }),
        }
    }
}

/// Name of the `github-release` binary.
pub const GITHUB_RELEASE_TOOL: &str = "github-release";

/// Uploads through the `github-release` CLI.
#[derive(Debug, Clone)]
pub struct GithubReleaseTool {
    binary: PathBuf,
}

impl GithubReleaseTool {
    /// Locate `github-release` on PATH.
    pub fn locate() -> std::result::Result<Self, ConfigError> {
        let binary = which::which(GITHUB_RELEASE_TOOL).map_err(|_| ConfigError::ToolNotFound {
            tool: GITHUB_RELEASE_TOOL.to_string(),
        })?;
        Ok(Self { binary })
    }

    /// Use a specific binary.
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Arguments for one upload.
    pub fn upload_args(asset: &ReleaseAsset<'_>) -> Vec<String> {
        vec![
            "upload".to_string(),
            "--user".to_string(),
            asset.owner.to_string(),
            "--repo".to_string(),
            asset.repo.to_string(),
            "--tag".to_string(),
            asset.tag.to_string(),
            "--name".to_string(),
            asset.file_name.to_string(),
            "--file".to_string(),
            asset.path.display().to_string(),
        ]
    }
}

impl ArtifactUploader for GithubReleaseTool {
    async fn upload(&self, asset: &ReleaseAsset<'_>) -> Result<()> {
        let args = Self::upload_args(asset);
        log::debug!("{} {}", self.binary.display(), args.join(" "));

        let status = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| UploadError::Rejected {
                file: asset.file_name.to_string(),
                reason: format!("failed to run {}: {}", self.binary.display(), e),
            })?;

        if !status.success() {
            return Err(UploadError::Rejected {
                file: asset.file_name.to_string(),
                reason: format!(
                    "{} exited with code {}",
                    GITHUB_RELEASE_TOOL,
                    status.code().unwrap_or(-1)
                ),
            }
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_args() {
        let asset = ReleaseAsset {
            owner: "prometheus",
            repo: "promu",
            tag: "v0.5.0",
            file_name: "promu-0.5.0.linux-amd64.tar.gz",
            path: Path::new(".tarballs/promu-0.5.0.linux-amd64.tar.gz"),
        };
        assert_eq!(
            GithubReleaseTool::upload_args(&asset),
            [
                "upload",
                "--user",
                "prometheus",
                "--repo",
                "promu",
                "--tag",
                "v0.5.0",
                "--name",
                "promu-0.5.0.linux-amd64.tar.gz",
                "--file",
                ".tarballs/promu-0.5.0.linux-amd64.tar.gz",
            ]
        );
    }

    #[test]
    fn test_uploader_kind_from_str() {
        assert_eq!(
            "github-release".parse::<UploaderKind>().unwrap(),
            UploaderKind::GithubReleaseTool
        );
        assert_eq!("API".parse::<UploaderKind>().unwrap(), UploaderKind::GithubApi);
        assert!("s3".parse::<UploaderKind>().is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_rejected() {
        let tool = GithubReleaseTool::with_binary("false");
        let asset = ReleaseAsset {
            owner: "o",
            repo: "r",
            tag: "v1",
            file_name: "r-1.linux-amd64.tar.gz",
            path: Path::new("r-1.linux-amd64.tar.gz"),
        };
        let err = tool.upload(&asset).await.unwrap_err();
        assert!(err.to_string().contains("r-1.linux-amd64.tar.gz"));
    }
}
