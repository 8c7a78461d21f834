//! Release tarball uploads.
//!
//! Walks a directory, picks out this release's tarballs and uploads each
//! one with bounded retry. The first artifact that cannot be uploaded stops
//! the run.

mod artifacts;
mod github;
mod retry;
mod uploader;

pub use artifacts::ArtifactMatcher;
pub use github::{GITHUB_API_URL, GithubApiUploader};
pub use retry::{
    DEFAULT_RETRIES, DEFAULT_RETRY_DELAY, MAX_RETRIES, RetryExhausted, RetryPolicy,
    retry_with_fixed_delay,
};
pub use uploader::{
    ArtifactUploader, GITHUB_RELEASE_TOOL, GithubReleaseTool, ReleaseAsset, UploaderKind,
};

use crate::cli::RuntimeConfig;
use crate::error::{Result, UploadError};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Project release identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseIdentity {
    /// Project (and repository) name
    pub name: String,
    /// Release version without the `v` prefix
    pub version: String,
    /// Repository owner
    pub owner: String,
}

impl ReleaseIdentity {
    /// Release tag, `v<version>`.
    pub fn tag(&self) -> String {
        format!("v{}", self.version)
    }
}

/// Outcome of a successful release run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseSummary {
    /// Uploaded artifact paths, in upload order
    pub uploaded: Vec<PathBuf>,
    /// Files seen that did not match the artifact pattern
    pub skipped: usize,
}

/// Uploads one release's tarballs.
pub struct Releaser<'a, U> {
    identity: &'a ReleaseIdentity,
    matcher: ArtifactMatcher,
    policy: RetryPolicy,
    uploader: &'a U,
    config: &'a RuntimeConfig,
}

impl<'a, U: ArtifactUploader> Releaser<'a, U> {
    /// Create a releaser.
    pub fn new(
        identity: &'a ReleaseIdentity,
        policy: RetryPolicy,
        uploader: &'a U,
        config: &'a RuntimeConfig,
    ) -> Result<Self> {
        Ok(Self {
            identity,
            matcher: ArtifactMatcher::new(identity)?,
            policy,
            uploader,
            config,
        })
    }

    /// Upload every matching tarball under `root`.
    ///
    /// Files are visited in lexical order. Walk errors and exhausted
    /// uploads abort the run.
    pub async fn release_directory(&self, root: &Path) -> Result<ReleaseSummary> {
        log::debug!(
            "Looking for '{}' under {}",
            self.matcher.as_str(),
            root.display()
        );

        let mut summary = ReleaseSummary::default();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|source| UploadError::Walk {
                path: root.to_path_buf(),
                source,
            })?;

            // Symlinks are not followed into directories, but a link to a
            // file is an artifact like any other
            let is_file = entry.file_type().is_file()
                || (entry.path_is_symlink() && entry.path().is_file());
            if !is_file {
                continue;
            }

            let path = entry.path();
            if !self.matcher.matches_path(path) {
                log::debug!("Skipping {}", path.display());
                summary.skipped += 1;
                continue;
            }

            self.release_artifact(path).await?;
            summary.uploaded.push(path.to_path_buf());
        }

        Ok(summary)
    }

    /// Upload one artifact with retry.
    pub async fn release_artifact(&self, path: &Path) -> Result<()> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let tag = self.identity.tag();

        let asset = ReleaseAsset {
            owner: &self.identity.owner,
            repo: &self.identity.name,
            tag: &tag,
            file_name: &file_name,
            path,
        };
        let asset = &asset;
        let uploader = self.uploader;

        let result = retry_with_fixed_delay(
            |attempt| async move {
                log::debug!("Uploading {} (attempt {})", asset.file_name, attempt);
                uploader.upload(asset).await
            },
            &self.policy,
            &format!("Upload of {}", file_name),
            self.config,
        )
        .await;

        match result {
            Ok(()) => {
                self.config.success_println(&format!("uploaded {}", file_name));
                Ok(())
            }
            Err(exhausted) => {
                self.config.error_println(&format!(
                    "Upload failed after {} attempts",
                    exhausted.attempts
                ));
                Err(UploadError::RetriesExhausted {
                    file: file_name,
                    attempts: exhausted.attempts,
                    last_error: Box::new(exhausted.last_error),
                }
                .into())
            }
        }
    }
}
