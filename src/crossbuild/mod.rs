//! Cross-build dispatch to builder images.
//!
//! # Module Structure
//!
//! - `toolchain` - Toolchain identity and lenient version parsing
//! - `platform` - Reference platform sets and classification
//! - `dispatch` - Builder image selection and sequential dispatch
//! - `docker` - Docker CLI runner with container cleanup guard

mod dispatch;
mod docker;
mod platform;
mod toolchain;

pub use dispatch::{
    BASE_GROUP_NAME, BuildRequest, BuildRunner, DEFAULT_BUILDER_IMAGE, PlatformGroup, dispatch,
    image_reference, plan_groups,
};
pub use docker::{CONTAINER_MOUNT_POINT, DockerBuildRunner, NATIVE_INTEROP_ENV};
pub use platform::{
    Classification, ClassificationWarning, DEFAULT_ARM_PLATFORMS, DEFAULT_MAIN_PLATFORMS,
    DEFAULT_MIPS_PLATFORMS, DEFAULT_POWERPC_PLATFORMS, GroupKind, PlatformSets, classify,
};
pub use toolchain::{DEFAULT_TOOLCHAIN_VERSION, MIPS_MIN_VERSION, Toolchain, parse_toolchain_version};
