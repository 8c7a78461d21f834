//! `crossbuild` command.

use crate::cli::{CrossbuildArgs, RuntimeConfig};
use crate::config::{CrossbuildSettings, FileConfig};
use crate::crossbuild::{DockerBuildRunner, classify, dispatch, plan_groups};
use crate::error::Result;
use std::path::Path;

/// Classify the requested platforms and run the builder images.
pub(super) async fn execute_crossbuild(
    args: &CrossbuildArgs,
    file: &FileConfig,
    cwd: &Path,
    config: &RuntimeConfig,
) -> Result<i32> {
    let settings = CrossbuildSettings::resolve(file, args.into())?;
    let runner = DockerBuildRunner::locate(cwd.to_path_buf())?;

    config.section("crossbuild");
    config.verbose_println(&format!(
        "toolchain {}, native interop {}",
        settings.toolchain.tag(),
        if settings.toolchain.native_interop() { "on" } else { "off" }
    ));

    let classification = classify(
        &settings.platforms,
        &settings.platform_sets,
        &settings.toolchain,
    );

    for warning in classification.warnings() {
        log::warn!("{}", warning);
        config.warning_println(&warning.to_string());
    }

    if classification.is_empty() {
        config.println("Nothing to build");
        return Ok(0);
    }

    let groups = plan_groups(&classification, &settings.toolchain, &settings.builder_image);
    let dispatched = dispatch(
        &groups,
        &settings.repository_path,
        settings.toolchain.native_interop(),
        &runner,
        config,
    )
    .await?;

    config.success_println(&format!(
        "Built {} platform(s) in {} builder run(s)",
        classification.merged().len(),
        dispatched
    ));
    Ok(0)
}
