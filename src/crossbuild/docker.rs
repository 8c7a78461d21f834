//! Docker-backed builder runner.
//!
//! Runs each platform group inside its builder image with the working
//! directory mounted at `/app`. Build output is streamed straight to the
//! terminal; only the exit status is interpreted.

use super::dispatch::{BuildRequest, BuildRunner};
use crate::error::{BuildError, CliError, ConfigError, Result};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use uuid::Uuid;
use wait_timeout::ChildExt;

/// Mount point of the working directory inside builder containers.
pub const CONTAINER_MOUNT_POINT: &str = "/app";

/// Environment variable that enables native interop inside the builder.
pub const NATIVE_INTEROP_ENV: &str = "CGO_ENABLED";

/// Timeout for `docker rm -f` during guard cleanup
const CLEANUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs builder images through the docker CLI.
#[derive(Debug, Clone)]
pub struct DockerBuildRunner {
    docker: PathBuf,
    mount_dir: PathBuf,
    tty: bool,
}

impl DockerBuildRunner {
    /// Locate `docker` on PATH; `mount_dir` is mounted at `/app`.
    pub fn locate(mount_dir: PathBuf) -> Result<Self> {
        let docker = which::which("docker").map_err(|_| ConfigError::ToolNotFound {
            tool: "docker".to_string(),
        })?;
        Ok(Self::new(docker, mount_dir))
    }

    /// Runner with an explicit docker binary and mount directory.
    pub fn new(docker: impl Into<PathBuf>, mount_dir: PathBuf) -> Self {
        Self {
            docker: docker.into(),
            mount_dir,
            tty: std::io::stdout().is_terminal(),
        }
    }

    /// Arguments passed to `docker` for one request.
    pub fn docker_args(&self, request: &BuildRequest<'_>, container_name: &str) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--rm".to_string(),
            "--name".to_string(),
            container_name.to_string(),
        ];

        if self.tty {
            args.push("-t".to_string());
        }

        args.push("-v".to_string());
        args.push(format!(
            "{}:{}",
            self.mount_dir.display(),
            CONTAINER_MOUNT_POINT
        ));

        if request.native_interop {
            args.push("-e".to_string());
            args.push(format!("{}=1", NATIVE_INTEROP_ENV));
        }

        args.push(request.image.to_string());
        args.push("-i".to_string());
        args.push(request.repository_path.to_string());
        args.push("-p".to_string());
        args.push(request.platforms.join(" "));

        args
    }
}

impl BuildRunner for DockerBuildRunner {
    async fn run_build(&self, request: &BuildRequest<'_>) -> Result<()> {
        let container_name = format!("crossbuild-{}", Uuid::new_v4());

        // Removes the container however this function exits
        let _guard = ContainerGuard {
            docker: self.docker.clone(),
            name: container_name.clone(),
        };

        let args = self.docker_args(request, &container_name);
        log::debug!("{} {}", self.docker.display(), args.join(" "));

        let status = Command::new(&self.docker)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| BuildError::SpawnFailed {
                image: request.image.to_string(),
                source,
            })?;

        if !status.success() {
            return Err(CliError::ExecutionFailed {
                command: format!("{} run {}", self.docker.display(), request.image),
                reason: match status.code() {
                    Some(code) => format!("exit code {}", code),
                    None => "terminated by signal".to_string(),
                },
            }
            .into());
        }

        Ok(())
    }
}

/// RAII guard for builder container cleanup.
///
/// `--rm` removes the container on a normal exit. The guard covers the
/// abnormal ones (error, panic, cancelled future). Removing an already
/// removed container is harmless.
struct ContainerGuard {
    docker: PathBuf,
    name: String,
}

impl Drop for ContainerGuard {
    fn drop(&mut self) {
        let mut child = match std::process::Command::new(&self.docker)
            .args(["rm", "-f", &self.name])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(_) => return,
        };

        match child.wait_timeout(CLEANUP_TIMEOUT) {
            Ok(Some(status)) => {
                if !status.success() {
                    log::debug!(
                        "docker rm -f {} exited with {}",
                        self.name,
                        status.code().unwrap_or(-1)
                    );
                }
            }
            Ok(None) => {
                // Docker daemon unresponsive
                let _ = child.kill();
                let _ = child.wait();
                log::warn!(
                    "Timed out cleaning up container '{}' after {} seconds",
                    self.name,
                    CLEANUP_TIMEOUT.as_secs()
                );
            }
            Err(_) => {
                let _ = child.kill();
                let _ = child.wait();
            }
        }
    }
}
