//! GitHub REST API upload backend.
//!
//! Looks the release up by tag, then streams the artifact to the release's
//! upload URL. The release itself must already exist.
//!
//! A POST can store the asset even when its response is lost. The next
//! attempt then gets `422 already_exists`; the stale asset is deleted and
//! the upload repeated, so attempts stay idempotent.

use super::uploader::{ArtifactUploader, ReleaseAsset};
use crate::error::{ConfigError, Result, UploadError};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, USER_AGENT};
use reqwest::{Body, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use tokio_util::io::ReaderStream;

/// Default GitHub API endpoint.
pub const GITHUB_API_URL: &str = "https://api.github.com";

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const TARBALL_CONTENT_TYPE: &str = "application/gzip";

/// Subset of the release payload we need
#[derive(Debug, Deserialize)]
struct Release {
    id: u64,
    upload_url: String,
}

/// Subset of a release asset payload
#[derive(Debug, Deserialize)]
struct Asset {
    id: u64,
    name: String,
}

/// GitHub error payload
#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    code: String,
}

enum PostOutcome {
    Created,
    AlreadyExists(String),
}

/// Uploads artifacts through the GitHub API.
#[derive(Debug, Clone)]
pub struct GithubApiUploader {
    client: reqwest::Client,
    token: String,
    api_url: String,
}

impl GithubApiUploader {
    /// Create an uploader using `GH_TOKEN` or `GITHUB_TOKEN`.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        let token = std::env::var("GH_TOKEN")
            .or_else(|_| std::env::var("GITHUB_TOKEN"))
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;
        Ok(Self::new(token, GITHUB_API_URL))
    }

    /// Create an uploader with an explicit token and API endpoint.
    pub fn new(token: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), token, api_url)
    }

    fn with_client(
        client: reqwest::Client,
        token: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            token: token.into(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, GITHUB_ACCEPT)
            .header(USER_AGENT, env!("CARGO_PKG_NAME"))
    }

    fn rejected(asset: &ReleaseAsset<'_>, reason: String) -> UploadError {
        UploadError::Rejected {
            file: asset.file_name.to_string(),
            reason,
        }
    }

    async fn find_release(&self, asset: &ReleaseAsset<'_>) -> Result<Release> {
        let url = format!(
            "{}/repos/{}/{}/releases/tags/{}",
            self.api_url, asset.owner, asset.repo, asset.tag
        );

        let response = self
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(UploadError::from)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(UploadError::ReleaseNotFound {
                owner: asset.owner.to_string(),
                repo: asset.repo.to_string(),
                tag: asset.tag.to_string(),
            }
            .into());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::rejected(
                asset,
                format!("release lookup returned {}: {}", status, error_message(&body)),
            )
            .into());
        }

        Ok(response.json().await.map_err(UploadError::from)?)
    }

    async fn post_asset(&self, upload_url: &str, asset: &ReleaseAsset<'_>) -> Result<PostOutcome> {
        let file = tokio::fs::File::open(asset.path).await?;
        let size = file.metadata().await?.len();

        log::debug!("POST {} ({} bytes)", upload_url, size);

        let response = self
            .request(Method::POST, upload_url)
            .query(&[("name", asset.file_name)])
            .header(CONTENT_TYPE, TARBALL_CONTENT_TYPE)
            .header(CONTENT_LENGTH, size)
            .body(Body::wrap_stream(ReaderStream::new(file)))
            .send()
            .await
            .map_err(UploadError::from)?;

        let status = response.status();
        if status.is_success() {
            log::debug!("Uploaded {} ({} bytes)", asset.file_name, size);
            return Ok(PostOutcome::Created);
        }

        let body = response.text().await.unwrap_or_default();
        if is_already_exists(status, &body) {
            return Ok(PostOutcome::AlreadyExists(error_message(&body)));
        }
        Err(Self::rejected(
            asset,
            format!("upload returned {}: {}", status, error_message(&body)),
        )
        .into())
    }

    async fn delete_existing_asset(&self, release_id: u64, asset: &ReleaseAsset<'_>) -> Result<()> {
        let url = format!(
            "{}/repos/{}/{}/releases/{}/assets",
            self.api_url, asset.owner, asset.repo, release_id
        );
        let response = self
            .request(Method::GET, &url)
            .query(&[("per_page", "100")])
            .send()
            .await
            .map_err(UploadError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::rejected(
                asset,
                format!("asset listing returned {}: {}", status, error_message(&body)),
            )
            .into());
        }

        let assets: Vec<Asset> = response.json().await.map_err(UploadError::from)?;
        let existing = assets
            .into_iter()
            .find(|a| a.name == asset.file_name)
            .ok_or_else(|| {
                Self::rejected(
                    asset,
                    "asset reported as existing but missing from the release".to_string(),
                )
            })?;

        let url = format!(
            "{}/repos/{}/{}/releases/assets/{}",
            self.api_url, asset.owner, asset.repo, existing.id
        );
        let response = self
            .request(Method::DELETE, &url)
            .send()
            .await
            .map_err(UploadError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::rejected(
                asset,
                format!("asset delete returned {}: {}", status, error_message(&body)),
            )
            .into());
        }

        log::debug!("Deleted stale asset {} ({})", existing.name, existing.id);
        Ok(())
    }
}

impl ArtifactUploader for GithubApiUploader {
    async fn upload(&self, asset: &ReleaseAsset<'_>) -> Result<()> {
        let release = self.find_release(asset).await?;
        let upload_url = expand_upload_url(&release.upload_url).to_string();

        if let PostOutcome::AlreadyExists(_) = self.post_asset(&upload_url, asset).await? {
            log::info!(
                "{} already attached to {}, replacing it",
                asset.file_name,
                asset.tag
            );
            self.delete_existing_asset(release.id, asset).await?;

            if let PostOutcome::AlreadyExists(message) =
                self.post_asset(&upload_url, asset).await?
            {
                return Err(Self::rejected(asset, format!("upload returned 422: {}", message)).into());
            }
        }

        Ok(())
    }
}

/// Human-readable message from an error response body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiError>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

/// Whether an upload failed because an asset with that name is attached.
fn is_already_exists(status: StatusCode, body: &str) -> bool {
    status == StatusCode::UNPROCESSABLE_ENTITY
        && serde_json::from_str::<ApiError>(body)
            .is_ok_and(|e| e.errors.iter().any(|d| d.code == "already_exists"))
}

/// Strip the RFC 6570 template suffix from a release `upload_url`.
fn expand_upload_url(template: &str) -> &str {
    template
        .split_once('{')
        .map(|(base, _)| base)
        .unwrap_or(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::RuntimeConfig;
    use crate::error::CrossbuildError;
    use crate::release::{ReleaseIdentity, Releaser, RetryPolicy};
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const TARBALL: &str = "promu-0.5.0.linux-amd64.tar.gz";
    const ALREADY_EXISTS: &str = r#"{"message":"Validation Failed","errors":[{"resource":"ReleaseAsset","code":"already_exists","field":"name"}]}"#;

    #[derive(Debug, Clone)]
    struct Recorded {
        method: String,
        target: String,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    }

    impl Recorded {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        }
    }

    /// Minimal HTTP/1.1 server answering each request from `handler`.
    struct FakeGithub {
        base: String,
        requests: Arc<Mutex<Vec<Recorded>>>,
    }

    impl FakeGithub {
        async fn start<F>(handler: F) -> Self
        where
            F: Fn(&Recorded, &str) -> (u16, String) + Send + Sync + 'static,
        {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base = format!("http://{}", listener.local_addr().unwrap());
            let requests = Arc::new(Mutex::new(Vec::new()));

            let recorded = Arc::clone(&requests);
            let server_base = base.clone();
            tokio::spawn(async move {
                while let Ok((mut stream, _)) = listener.accept().await {
                    let request = read_request(&mut stream).await;
                    let (status, body) = handler(&request, &server_base);
                    recorded.lock().unwrap().push(request);

                    let response = format!(
                        "HTTP/1.1 {} Fake\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                }
            });

            Self { base, requests }
        }

        fn uploader(&self) -> GithubApiUploader {
            let client = reqwest::Client::builder().no_proxy().build().unwrap();
            GithubApiUploader::with_client(client, "secret", self.base.clone())
        }

        fn requests(&self) -> Vec<Recorded> {
            self.requests.lock().unwrap().clone()
        }

        fn count(&self, method: &str) -> usize {
            self.requests().iter().filter(|r| r.method == method).count()
        }
    }

    async fn read_request(stream: &mut TcpStream) -> Recorded {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];

        let header_end = loop {
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break buf.len();
            }
            buf.extend_from_slice(&chunk[..n]);
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let mut lines = head.lines();
        let mut start = lines.next().unwrap_or_default().split_whitespace();
        let method = start.next().unwrap_or_default().to_string();
        let target = start.next().unwrap_or_default().to_string();
        let headers: Vec<(String, String)> = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .collect();

        let length = headers
            .iter()
            .find(|(k, _)| k == "content-length")
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .unwrap_or(0);

        let mut body = buf[header_end..].to_vec();
        while body.len() < length {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }

        Recorded {
            method,
            target,
            headers,
            body,
        }
    }

    fn release_json(base: &str) -> String {
        format!(
            r#"{{"id":7,"upload_url":"{}/uploads/repos/prometheus/promu/releases/7/assets{{?name,label}}"}}"#,
            base
        )
    }

    fn asset(path: &Path) -> ReleaseAsset<'_> {
        ReleaseAsset {
            owner: "prometheus",
            repo: "promu",
            tag: "v0.5.0",
            file_name: TARBALL,
            path,
        }
    }

    fn tarball(dir: &Path) -> std::path::PathBuf {
        let path = dir.join(TARBALL);
        std::fs::write(&path, b"gzipped tarball bytes").unwrap();
        path
    }

    #[tokio::test]
    async fn test_upload_looks_up_tag_and_streams_file() {
        let server = FakeGithub::start(|req, base| match req.method.as_str() {
            "GET" => (200, release_json(base)),
            _ => (201, r#"{"id":99}"#.to_string()),
        })
        .await;
        let dir = tempfile::tempdir().unwrap();
        let path = tarball(dir.path());

        server.uploader().upload(&asset(&path)).await.unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].target, "/repos/prometheus/promu/releases/tags/v0.5.0");
        assert_eq!(requests[0].header("authorization"), Some("Bearer secret"));

        let post = &requests[1];
        assert_eq!(post.method, "POST");
        assert_eq!(
            post.target,
            format!("/uploads/repos/prometheus/promu/releases/7/assets?name={}", TARBALL)
        );
        assert_eq!(post.header("content-type"), Some("application/gzip"));
        assert_eq!(post.header("content-length"), Some("21"));
        assert_eq!(post.body, b"gzipped tarball bytes");
    }

    #[tokio::test]
    async fn test_missing_release_is_reported() {
        let server = FakeGithub::start(|_, _| (404, r#"{"message":"Not Found"}"#.to_string())).await;
        let dir = tempfile::tempdir().unwrap();
        let path = tarball(dir.path());

        let err = server.uploader().upload(&asset(&path)).await.unwrap_err();
        assert!(matches!(
            err,
            CrossbuildError::Upload(UploadError::ReleaseNotFound { ref tag, .. }) if tag == "v0.5.0"
        ));
        assert_eq!(server.count("POST"), 0);
    }

    #[tokio::test]
    async fn test_failed_post_is_rejected() {
        let server = FakeGithub::start(|req, base| match req.method.as_str() {
            "GET" => (200, release_json(base)),
            _ => (500, r#"{"message":"Server Error"}"#.to_string()),
        })
        .await;
        let dir = tempfile::tempdir().unwrap();
        let path = tarball(dir.path());

        let err = server.uploader().upload(&asset(&path)).await.unwrap_err();
        match err {
            CrossbuildError::Upload(UploadError::Rejected { file, reason }) => {
                assert_eq!(file, TARBALL);
                assert!(reason.contains("500"), "{}", reason);
                assert!(reason.contains("Server Error"), "{}", reason);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_retry_after_lost_response_replaces_stored_asset() {
        let posts = Arc::new(AtomicUsize::new(0));
        let deleted = Arc::new(AtomicUsize::new(0));
        let (post_count, delete_count) = (Arc::clone(&posts), Arc::clone(&deleted));

        let server = FakeGithub::start(move |req, base| {
            match (req.method.as_str(), req.target.as_str()) {
                ("GET", "/repos/prometheus/promu/releases/tags/v0.5.0") => (200, release_json(base)),
                ("GET", t) if t.starts_with("/repos/prometheus/promu/releases/7/assets") => (
                    200,
                    format!(r#"[{{"id":3,"name":"other.tar.gz"}},{{"id":99,"name":"{}"}}]"#, TARBALL),
                ),
                ("DELETE", "/repos/prometheus/promu/releases/assets/99") => {
                    delete_count.fetch_add(1, Ordering::SeqCst);
                    (204, String::new())
                }
                ("POST", _) => {
                    // First POST stores the asset but the gateway fails
                    let n = post_count.fetch_add(1, Ordering::SeqCst);
                    if n == 0 {
                        (502, "bad gateway".to_string())
                    } else if delete_count.load(Ordering::SeqCst) == 0 {
                        (422, ALREADY_EXISTS.to_string())
                    } else {
                        (201, r#"{"id":100}"#.to_string())
                    }
                }
                _ => (404, r#"{"message":"Not Found"}"#.to_string()),
            }
        })
        .await;

        let dir = tempfile::tempdir().unwrap();
        tarball(dir.path());

        let identity = ReleaseIdentity {
            name: "promu".to_string(),
            version: "0.5.0".to_string(),
            owner: "prometheus".to_string(),
        };
        let policy = RetryPolicy {
            retries: 2,
            delay: Duration::from_millis(10),
        };
        let uploader = server.uploader();
        let config = RuntimeConfig::new(false, true);
        let releaser = Releaser::new(&identity, policy, &uploader, &config).unwrap();

        let summary = releaser.release_directory(dir.path()).await.unwrap();

        assert_eq!(summary.uploaded.len(), 1);
        assert_eq!(posts.load(Ordering::SeqCst), 3);
        assert_eq!(deleted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_already_exists_without_listed_asset_is_rejected() {
        let server = FakeGithub::start(|req, base| match req.method.as_str() {
            "GET" if req.target.contains("/tags/") => (200, release_json(base)),
            "GET" => (200, "[]".to_string()),
            _ => (422, ALREADY_EXISTS.to_string()),
        })
        .await;
        let dir = tempfile::tempdir().unwrap();
        let path = tarball(dir.path());

        let err = server.uploader().upload(&asset(&path)).await.unwrap_err();
        assert!(matches!(
            err,
            CrossbuildError::Upload(UploadError::Rejected { .. })
        ));
        assert_eq!(server.count("DELETE"), 0);
    }

    #[test]
    fn test_already_exists_detection() {
        assert!(is_already_exists(StatusCode::UNPROCESSABLE_ENTITY, ALREADY_EXISTS));
        assert!(!is_already_exists(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"message":"Validation Failed","errors":[{"code":"invalid"}]}"#
        ));
        assert!(!is_already_exists(StatusCode::BAD_GATEWAY, ALREADY_EXISTS));
    }

    #[test]
    fn test_expand_upload_url_strips_template() {
        assert_eq!(
            expand_upload_url(
                "https://uploads.github.com/repos/prometheus/promu/releases/1/assets{?name,label}"
            ),
            "https://uploads.github.com/repos/prometheus/promu/releases/1/assets"
        );
    }

    #[test]
    fn test_expand_upload_url_without_template() {
        assert_eq!(
            expand_upload_url("https://uploads.example.com/assets"),
            "https://uploads.example.com/assets"
        );
    }

    #[test]
    fn test_error_message_prefers_api_message() {
        assert_eq!(error_message(ALREADY_EXISTS), "Validation Failed");
        assert_eq!(error_message("bad gateway\n"), "bad gateway");
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let uploader = GithubApiUploader::new("token", "https://github.example.com/api/v3/");
        assert_eq!(uploader.api_url, "https://github.example.com/api/v3");
    }
}
