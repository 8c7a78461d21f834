//! Builder image selection and sequential build dispatch.

use super::platform::{Classification, GroupKind};
use super::toolchain::Toolchain;
use crate::cli::RuntimeConfig;
use crate::error::{BuildError, Result};
use std::future::Future;

/// Image repository hosting the builder images.
pub const DEFAULT_BUILDER_IMAGE: &str = "quay.io/prometheus/golang-builder";

/// Name of the single merged group used without native interop.
pub const BASE_GROUP_NAME: &str = "base";

/// A set of platforms built together by one builder image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformGroup {
    /// Human-readable group name
    pub name: String,
    /// Full builder image reference (`repo:version-variant`)
    pub image: String,
    /// Platforms to build, in request order
    pub platforms: Vec<String>,
}

impl PlatformGroup {
    /// Platforms as the space-joined list passed to the builder.
    pub fn platforms_param(&self) -> String {
        self.platforms.join(" ")
    }
}

/// Everything a runner needs for one builder invocation.
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    /// Group name, for output
    pub group: &'a str,
    /// Builder image reference
    pub image: &'a str,
    /// Import path of the project inside the builder
    pub repository_path: &'a str,
    /// Platforms to build
    pub platforms: &'a [String],
    /// Enable native interop (CGO) inside the builder
    pub native_interop: bool,
}

/// Runs one builder invocation to completion.
///
/// Implementations block (await) until the builder exits and report only
/// success or failure.
pub trait BuildRunner {
    /// Run the builder for `request`.
    fn run_build(&self, request: &BuildRequest<'_>) -> impl Future<Output = Result<()>> + Send;
}

/// Builder image reference for a variant.
pub fn image_reference(repository: &str, toolchain: &Toolchain, variant: &str) -> String {
    format!("{}:{}-{}", repository, toolchain.tag(), variant)
}

/// Plan the builder groups for a classification.
///
/// Without native interop every group is merged into a single `base` group.
/// With native interop one group per [`GroupKind`] is planned, in dispatch
/// order. Empty groups are kept in the plan and skipped by [`dispatch`].
pub fn plan_groups(
    classification: &Classification,
    toolchain: &Toolchain,
    image_repository: &str,
) -> Vec<PlatformGroup> {
    if !toolchain.native_interop() {
        return vec![PlatformGroup {
            name: BASE_GROUP_NAME.to_string(),
            image: image_reference(image_repository, toolchain, BASE_GROUP_NAME),
            platforms: classification.merged(),
        }];
    }

    GroupKind::ALL
        .into_iter()
        .map(|kind| PlatformGroup {
            name: kind.name().to_string(),
            image: image_reference(image_repository, toolchain, kind.image_variant()),
            platforms: classification.members(kind).to_vec(),
        })
        .collect()
}

/// Dispatch planned groups one after another.
///
/// Stops at the first failing group; the error names the group. Returns the
/// number of builder invocations made.
pub async fn dispatch<R: BuildRunner>(
    groups: &[PlatformGroup],
    repository_path: &str,
    native_interop: bool,
    runner: &R,
    config: &RuntimeConfig,
) -> Result<usize> {
    let mut dispatched = 0;

    for group in groups {
        if group.platforms.is_empty() {
            log::debug!("Skipping empty {} group", group.name);
            continue;
        }

        config.println(&format!("> running the {} builder docker image", group.name));
        config.verbose_println(&format!(
            "{} platforms: {}",
            group.image,
            group.platforms_param()
        ));

        let request = BuildRequest {
            group: &group.name,
            image: &group.image,
            repository_path,
            platforms: &group.platforms,
            native_interop,
        };

        runner.run_build(&request).await.map_err(|e| BuildError::GroupFailed {
            group: group.name.clone(),
            image: group.image.clone(),
            source: Box::new(e),
        })?;

        dispatched += 1;
    }

    Ok(dispatched)
}
