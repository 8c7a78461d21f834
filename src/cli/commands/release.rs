//! `release` command.

use super::helpers::resolve_identity;
use crate::cli::{ReleaseArgs, RuntimeConfig};
use crate::config::{FileConfig, ReleaseSettings};
use crate::error::Result;
use crate::release::{
    ArtifactUploader, GithubApiUploader, GithubReleaseTool, ReleaseIdentity, ReleaseSummary,
    Releaser, RetryPolicy, UploaderKind,
};
use std::path::Path;

/// Upload every release tarball found under the tarballs location.
pub(super) async fn execute_release(
    args: &ReleaseArgs,
    file: &FileConfig,
    cwd: &Path,
    config: &RuntimeConfig,
) -> Result<i32> {
    let settings = ReleaseSettings::resolve(file, args.into())?;
    let identity = resolve_identity(
        settings.name.clone(),
        settings.version.clone(),
        settings.owner.clone(),
        cwd,
    )
    .await?;

    config.section(&format!(
        "release {}/{} {}",
        identity.owner,
        identity.name,
        identity.tag()
    ));

    // Backend availability is checked before the walk starts
    let summary = match settings.uploader {
        UploaderKind::GithubReleaseTool => {
            let uploader = GithubReleaseTool::locate()?;
            upload_all(&identity, settings.retry, &uploader, &args.location, config).await?
        }
        UploaderKind::GithubApi => {
            let uploader = GithubApiUploader::from_env()?;
            upload_all(&identity, settings.retry, &uploader, &args.location, config).await?
        }
    };

    if summary.uploaded.is_empty() {
        config.warning_println(&format!(
            "No tarballs matching {}-{}.*.tar.gz under {}",
            identity.name,
            identity.version,
            args.location.display()
        ));
    } else {
        config.success_println(&format!(
            "Uploaded {} tarball(s) to {}",
            summary.uploaded.len(),
            identity.tag()
        ));
    }
    config.verbose_println(&format!("{} other file(s) skipped", summary.skipped));

    Ok(0)
}

async fn upload_all<U: ArtifactUploader>(
    identity: &ReleaseIdentity,
    policy: RetryPolicy,
    uploader: &U,
    location: &Path,
    config: &RuntimeConfig,
) -> Result<ReleaseSummary> {
    Releaser::new(identity, policy, uploader, config)?
        .release_directory(location)
        .await
}
