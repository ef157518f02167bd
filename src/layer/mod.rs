//! Builder image layers
//!
//! Each artifact class (directories, environment, lifecycle, buildpacks,
//! order, stack) becomes its own tar layer. Lifecycles older than 0.4.0 read
//! a different `order.toml` shape and expect a `latest` alias next to each
//! buildpack version, so layer content depends on a [`CompatMode`].

pub mod compose;

pub use compose::{encode_order, encode_stack, LayerComposer};

use semver::Version;

pub const WORKSPACE_DIR: &str = "/workspace";
pub const LAYERS_DIR: &str = "/layers";
pub const BUILDPACKS_DIR: &str = "/buildpacks";
pub const PLATFORM_DIR: &str = "/platform";
pub const PLATFORM_ENV_DIR: &str = "/platform/env";
pub const LIFECYCLE_DIR: &str = "/lifecycle";

/// First lifecycle version reading the current layout
pub const COMPAT_PIVOT: Version = Version::new(0, 4, 0);

/// Layout expected by the lifecycle embedded in the builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompatMode {
    /// Lifecycle older than 0.4.0: `groups` order document, `latest` symlinks
    Legacy,

    /// Lifecycle 0.4.0 or newer, or no lifecycle version known
    Current,
}

impl CompatMode {
    pub fn for_lifecycle(version: Option<&Version>) -> Self {
        match version {
            Some(version) if *version < COMPAT_PIVOT => Self::Legacy,
            _ => Self::Current,
        }
    }

    pub fn writes_latest_symlink(self) -> bool {
        self == Self::Legacy
    }
}
