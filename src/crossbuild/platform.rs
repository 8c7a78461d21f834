//! Platform classification into toolchain-compatible groups.
//!
//! Requested `os/arch` identifiers are partitioned against four disjoint
//! reference sets. Each set maps to one family of builder images.

use super::toolchain::{MIPS_MIN_VERSION, Toolchain};
use crate::error::ConfigError;
use std::fmt;

/// Platforms handled by the main builder image.
pub const DEFAULT_MAIN_PLATFORMS: &[&str] = &[
    "linux/amd64",
    "linux/386",
    "darwin/amd64",
    "darwin/386",
    "windows/amd64",
    "windows/386",
    "freebsd/amd64",
    "freebsd/386",
    "openbsd/amd64",
    "openbsd/386",
    "netbsd/amd64",
    "netbsd/386",
    "dragonfly/amd64",
];

/// Platforms handled by the ARM builder image.
pub const DEFAULT_ARM_PLATFORMS: &[&str] = &[
    "linux/arm",
    "linux/arm64",
    "freebsd/arm",
    "openbsd/arm",
    "netbsd/arm",
];

/// Platforms handled by the PowerPC builder image.
pub const DEFAULT_POWERPC_PLATFORMS: &[&str] = &["linux/ppc64", "linux/ppc64le"];

/// Platforms handled by the MIPS builder image.
pub const DEFAULT_MIPS_PLATFORMS: &[&str] = &["linux/mips64", "linux/mips64le"];

/// Toolchain-compatible platform group, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// Generic amd64/386 targets
    Main,
    /// ARM targets
    Arm,
    /// PowerPC targets
    PowerPc,
    /// MIPS targets (toolchain 1.6+)
    Mips,
}

impl GroupKind {
    /// All groups in the fixed dispatch order.
    pub const ALL: [GroupKind; 4] = [
        GroupKind::Main,
        GroupKind::Arm,
        GroupKind::PowerPc,
        GroupKind::Mips,
    ];

    /// Human-readable group name used in output and errors.
    pub fn name(self) -> &'static str {
        match self {
            GroupKind::Main => "main",
            GroupKind::Arm => "ARM",
            GroupKind::PowerPc => "PowerPC",
            GroupKind::Mips => "MIPS",
        }
    }

    /// Builder image tag suffix for this group.
    pub fn image_variant(self) -> &'static str {
        match self {
            GroupKind::Main => "main",
            GroupKind::Arm => "arm",
            GroupKind::PowerPc => "powerpc",
            GroupKind::Mips => "mips",
        }
    }

    fn index(self) -> usize {
        match self {
            GroupKind::Main => 0,
            GroupKind::Arm => 1,
            GroupKind::PowerPc => 2,
            GroupKind::Mips => 3,
        }
    }
}

/// The four disjoint reference platform sets.
///
/// Immutable once built; the classifier only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSets {
    sets: [Vec<String>; 4],
}

impl Default for PlatformSets {
    fn default() -> Self {
        fn owned(platforms: &[&str]) -> Vec<String> {
            platforms.iter().map(|p| p.to_string()).collect()
        }

        Self {
            sets: [
                owned(DEFAULT_MAIN_PLATFORMS),
                owned(DEFAULT_ARM_PLATFORMS),
                owned(DEFAULT_POWERPC_PLATFORMS),
                owned(DEFAULT_MIPS_PLATFORMS),
            ],
        }
    }
}

impl PlatformSets {
    /// Build custom reference sets.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OverlappingPlatformSets`] if any platform is
    /// listed in more than one set.
    pub fn new(
        main: Vec<String>,
        arm: Vec<String>,
        powerpc: Vec<String>,
        mips: Vec<String>,
    ) -> Result<Self, ConfigError> {
        let sets = [main, arm, powerpc, mips];

        for (i, first) in GroupKind::ALL.iter().enumerate() {
            for second in &GroupKind::ALL[i + 1..] {
                if let Some(platform) = sets[first.index()]
                    .iter()
                    .find(|p| sets[second.index()].contains(*p))
                {
                    return Err(ConfigError::OverlappingPlatformSets {
                        platform: platform.clone(),
                        first: first.name().to_string(),
                        second: second.name().to_string(),
                    });
                }
            }
        }

        Ok(Self { sets })
    }

    /// Members of one reference set.
    pub fn set(&self, kind: GroupKind) -> &[String] {
        &self.sets[kind.index()]
    }

    /// Which set a platform belongs to, testing sets in dispatch order.
    pub fn kind_of(&self, platform: &str) -> Option<GroupKind> {
        GroupKind::ALL
            .into_iter()
            .find(|kind| self.set(*kind).iter().any(|p| p == platform))
    }

    /// Every known platform, set by set.
    pub fn all_platforms(&self) -> Vec<String> {
        self.sets.iter().flatten().cloned().collect()
    }
}

/// Non-fatal findings from classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationWarning {
    /// Platforms matching none of the reference sets
    UnknownPlatforms(Vec<String>),
    /// MIPS platform dropped because the toolchain is too old
    MipsUnsupported {
        /// Dropped platform
        platform: String,
        /// Configured toolchain version
        toolchain: String,
    },
}

impl fmt::Display for ClassificationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassificationWarning::UnknownPlatforms(platforms) => {
                write!(f, "unknown/unhandled platforms: {}", platforms.join(", "))
            }
            ClassificationWarning::MipsUnsupported {
                platform,
                toolchain,
            } => write!(
                f,
                "MIPS architectures are only available with toolchain {}+ (skipping {} for {})",
                MIPS_MIN_VERSION, platform, toolchain
            ),
        }
    }
}

/// Result of partitioning a platform request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    groups: [Vec<String>; 4],
    unknown: Vec<String>,
    unsupported_mips: Vec<String>,
    toolchain: String,
}

impl Classification {
    /// Platforms assigned to a group, in request order.
    pub fn members(&self, kind: GroupKind) -> &[String] {
        &self.groups[kind.index()]
    }

    /// Platforms that matched no reference set.
    pub fn unknown(&self) -> &[String] {
        &self.unknown
    }

    /// MIPS platforms excluded by the toolchain version.
    pub fn unsupported_mips(&self) -> &[String] {
        &self.unsupported_mips
    }

    /// All dispatchable platforms, merged in group order.
    pub fn merged(&self) -> Vec<String> {
        self.groups.iter().flatten().cloned().collect()
    }

    /// True when nothing would be dispatched.
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(Vec::is_empty)
    }

    /// Warnings to surface to the user. Never fatal.
    pub fn warnings(&self) -> Vec<ClassificationWarning> {
        let mut warnings: Vec<_> = self
            .unsupported_mips
            .iter()
            .map(|platform| ClassificationWarning::MipsUnsupported {
                platform: platform.clone(),
                toolchain: self.toolchain.clone(),
            })
            .collect();

        if !self.unknown.is_empty() {
            warnings.push(ClassificationWarning::UnknownPlatforms(self.unknown.clone()));
        }

        warnings
    }
}

/// Partition requested platforms into groups.
///
/// Every requested platform ends up in exactly one group, in the unknown
/// bucket, or (MIPS on an old toolchain) in the unsupported list. Duplicates
/// are kept.
pub fn classify<S: AsRef<str>>(
    requested: &[S],
    sets: &PlatformSets,
    toolchain: &Toolchain,
) -> Classification {
    let mut classification = Classification {
        toolchain: toolchain.tag().to_string(),
        ..Default::default()
    };

    for platform in requested {
        let platform = platform.as_ref();
        match sets.kind_of(platform) {
            Some(GroupKind::Mips) if !toolchain.supports_mips() => {
                classification.unsupported_mips.push(platform.to_string());
            }
            Some(kind) => classification.groups[kind.index()].push(platform.to_string()),
            None => classification.unknown.push(platform.to_string()),
        }
    }

    classification
}
