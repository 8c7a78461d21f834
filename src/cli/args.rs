//! Command line argument parsing and validation.

use crate::config::{CrossbuildOverrides, ReleaseOverrides, parse_platform_list};
use crate::release::MAX_RETRIES;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Cross-build a project in builder containers and upload its release tarballs
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_crossbuild",
    version,
    about = "Cross-build in builder containers and upload release tarballs",
    long_about = "Cross-build a project for many platforms using builder docker images, \
then upload the resulting tarballs to a GitHub release.

Usage:
  kodegen_crossbuild crossbuild --platforms \"linux/amd64 linux/arm\"
  kodegen_crossbuild crossbuild --cgo --go 1.8
  kodegen_crossbuild release .tarballs --retry 5"
)]
pub struct Args {
    /// Config file (defaults to ./.crossbuild.toml when present)
    #[arg(long, global = true, env = "CROSSBUILD_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Show detailed progress
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the requested platforms in builder docker images
    Crossbuild(CrossbuildArgs),
    /// Upload release tarballs to GitHub
    Release(ReleaseArgs),
}

impl Command {
    /// Command name for messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Crossbuild(_) => "crossbuild",
            Command::Release(_) => "release",
        }
    }
}

/// Arguments for `crossbuild`
#[derive(clap::Args, Debug, Default)]
pub struct CrossbuildArgs {
    /// Platforms to build, separated by spaces or commas
    #[arg(short, long, value_name = "LIST")]
    pub platforms: Option<String>,

    /// Toolchain version, used as the builder image tag
    #[arg(long = "go", value_name = "VERSION")]
    pub toolchain_version: Option<String>,

    /// Build with native interop (one builder image per architecture group)
    #[arg(long = "cgo")]
    pub native_interop: bool,

    /// Import path of the project inside the builder
    #[arg(long, value_name = "PATH")]
    pub repository_path: Option<String>,

    /// Builder image repository
    #[arg(long, value_name = "IMAGE")]
    pub builder_image: Option<String>,
}

impl From<&CrossbuildArgs> for CrossbuildOverrides {
    fn from(args: &CrossbuildArgs) -> Self {
        Self {
            platforms: args.platforms.as_deref().map(parse_platform_list),
            toolchain_version: args.toolchain_version.clone(),
            native_interop: args.native_interop,
            repository_path: args.repository_path.clone(),
            builder_image: args.builder_image.clone(),
        }
    }
}

/// Arguments for `release`
#[derive(clap::Args, Debug, Default)]
pub struct ReleaseArgs {
    /// Directory searched recursively for release tarballs
    #[arg(value_name = "TARBALLS_LOCATION", default_value = ".")]
    pub location: PathBuf,

    /// Additional upload attempts per tarball
    #[arg(short, long = "retry", value_name = "N")]
    pub retries: Option<u32>,

    /// Upload backend: github-release or api
    #[arg(long, value_name = "BACKEND")]
    pub uploader: Option<String>,

    /// Project name (defaults to the GitHub remote's repository)
    #[arg(long)]
    pub name: Option<String>,

    /// Release version (defaults to the VERSION file)
    #[arg(long = "version", value_name = "VERSION")]
    pub release_version: Option<String>,

    /// Repository owner (defaults to the GitHub remote's owner)
    #[arg(long)]
    pub owner: Option<String>,
}

impl From<&ReleaseArgs> for ReleaseOverrides {
    fn from(args: &ReleaseArgs) -> Self {
        Self {
            name: args.name.clone(),
            version: args.release_version.clone(),
            owner: args.owner.clone(),
            retries: args.retries,
            uploader: args.uploader.clone(),
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::Crossbuild(args) => {
                if let Some(version) = &args.toolchain_version
                    && version.trim().is_empty()
                {
                    return Err("--go must not be empty".to_string());
                }
            }
            Command::Release(args) => {
                if let Some(retries) = args.retries
                    && retries > MAX_RETRIES
                {
                    return Err(format!(
                        "--retry {} exceeds the maximum of {}",
                        retries, MAX_RETRIES
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Create runtime configuration
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            output: super::OutputManager::new(verbose, quiet),
        }
    }

    /// Print message
    pub fn println(&self, message: &str) {
        let _ = self.output.println(message);
    }

    /// Print message only in verbose mode
    pub fn verbose_println(&self, message: &str) {
        let _ = self.output.verbose(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message (always shown)
    pub fn warning_println(&self, message: &str) {
        self.output.warn(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        let _ = self.output.section(title);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.output.is_quiet()
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new(false, false)
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self::new(args.verbose, args.quiet)
    }
}
