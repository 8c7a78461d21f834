//! Shared helper functions for command execution.

use crate::config::version_file;
use crate::error::{CliError, ConfigError, Result};
use crate::release::ReleaseIdentity;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Directory commands resolve config, `VERSION` and the build mount from.
pub(super) fn working_directory() -> Result<PathBuf> {
    Ok(std::env::current_dir().context("Failed to determine the working directory")?)
}

/// Parse GitHub owner/repo from git remote URL
///
/// Supports Git URL formats:
/// - SSH SCP-like: git@github.com:owner/repo.git
/// - HTTPS: https://github.com/owner/repo.git
pub(super) fn parse_github_url(url: &str) -> Result<(String, String)> {
    let url = url.trim();

    // SSH SCP-like format: git@github.com:owner/repo.git
    if url.contains('@') && url.contains(':') && !url.contains("://") {
        let parts: Vec<&str> = url.split(':').collect();
        if parts.len() == 2 {
            let path = parts[1].trim_end_matches('/').trim_end_matches(".git");
            let path_parts: Vec<&str> = path.split('/').collect();
            if path_parts.len() == 2 && path_parts.iter().all(|p| !p.is_empty()) {
                return Ok((path_parts[0].to_string(), path_parts[1].to_string()));
            }
        }
    }

    // HTTPS/SSH protocol URLs
    if let Some(path_start) = url.find("github.com/") {
        let path = &url[path_start + "github.com/".len()..];
        let path = path.trim_end_matches('/').trim_end_matches(".git");
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() >= 2 && !parts[0].is_empty() && !parts[1].is_empty() {
            return Ok((parts[0].to_string(), parts[1].to_string()));
        }
    }

    Err(CliError::InvalidArguments {
        reason: format!("Could not parse GitHub owner/repo from URL: '{}'", url),
    }
    .into())
}

/// Trimmed contents of the `VERSION` file in `dir`, if any.
pub(super) fn read_version_file(dir: &Path) -> Option<String> {
    let path = version_file(dir);
    match std::fs::read_to_string(&path) {
        Ok(contents) => Some(contents.trim().to_string()).filter(|v| !v.is_empty()),
        Err(e) => {
            log::debug!("No version from {}: {}", path.display(), e);
            None
        }
    }
}

/// URL of the `origin` remote of the repository in `dir`, if any.
pub(super) async fn git_remote_url(dir: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["config", "--get", "remote.origin.url"])
        .current_dir(dir)
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        log::debug!("git has no remote.origin.url in {}", dir.display());
        return None;
    }

    let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Some(url).filter(|u| !u.is_empty())
}

/// Complete a partial release identity.
///
/// The version falls back to the `VERSION` file; name and owner fall back
/// to the GitHub `origin` remote. The remote is only consulted when needed.
pub(super) async fn resolve_identity(
    name: Option<String>,
    version: Option<String>,
    owner: Option<String>,
    dir: &Path,
) -> Result<ReleaseIdentity> {
    let version = version.or_else(|| read_version_file(dir));

    let (name, owner) = match (name, owner) {
        (Some(name), Some(owner)) => (Some(name), Some(owner)),
        (name, owner) => {
            let remote = match git_remote_url(dir).await {
                Some(url) => match parse_github_url(&url) {
                    Ok(parsed) => Some(parsed),
                    Err(e) => {
                        log::debug!("{}", e);
                        None
                    }
                },
                None => None,
            };
            match remote {
                Some((remote_owner, remote_repo)) => (
                    name.or(Some(remote_repo)),
                    owner.or(Some(remote_owner)),
                ),
                None => (name, owner),
            }
        }
    };

    let missing = |key: &str| ConfigError::MissingKey {
        key: key.to_string(),
    };

    Ok(ReleaseIdentity {
        name: name.ok_or_else(|| missing("release.name"))?,
        version: version.ok_or_else(|| missing("release.version"))?,
        owner: owner.ok_or_else(|| missing("release.owner"))?,
    })
}
