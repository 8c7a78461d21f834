//! # kodegen_crossbuild
//!
//! Cross-build a project for many platforms in builder docker images, then
//! upload the resulting release tarballs to GitHub.
//!
//! ## Features
//!
//! - **Platform classification**: requested `os/arch` pairs are partitioned
//!   into main, ARM, PowerPC and MIPS groups; unknown platforms and MIPS on
//!   toolchains older than 1.6 become warnings
//! - **Build dispatch**: one `base` builder run, or one run per group when
//!   native interop is enabled, stopping at the first failure
//! - **Release upload**: tarballs named `<name>-<version>.*.tar.gz` are
//!   uploaded one at a time with a bounded fixed-delay retry
//!
//! ## Usage
//!
//! ```bash
//! kodegen_crossbuild crossbuild --platforms "linux/amd64 linux/arm"
//! kodegen_crossbuild crossbuild --cgo --go 1.8
//! kodegen_crossbuild release .tarballs --retry 5
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cli;
pub mod config;
pub mod crossbuild;
pub mod error;
pub mod release;

pub use cli::Args;
pub use config::{CrossbuildSettings, FileConfig, ReleaseSettings};
pub use crossbuild::{
    BuildRunner, Classification, DockerBuildRunner, GroupKind, PlatformGroup, PlatformSets,
    Toolchain, classify, dispatch, plan_groups,
};
pub use error::{CrossbuildError, Result};
pub use release::{
    ArtifactMatcher, ArtifactUploader, ReleaseIdentity, Releaser, RetryPolicy,
    retry_with_fixed_delay,
};
