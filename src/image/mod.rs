//! Image abstraction
//!
//! The builder never talks to a registry or daemon directly. It reads labels
//! and environment from an [`Image`], appends layer tars to it and commits it
//! once at the end of a save.

pub mod dir;
pub mod memory;

pub use dir::{DirImage, ImageManifest};
pub use memory::MemoryImage;

use std::path::Path;

use crate::error::BuilderResult;

/// Label holding the stack id of a build image
pub const STACK_LABEL: &str = "io.buildpacks.stack.id";

/// Env var holding the numeric build user id
pub const ENV_UID: &str = "CNB_USER_ID";

/// Env var holding the numeric build group id
pub const ENV_GID: &str = "CNB_GROUP_ID";

/// A mutable container image
pub trait Image {
    fn name(&self) -> &str;

    fn rename(&mut self, name: &str);

    /// Label value, `None` when unset
    fn label(&self, key: &str) -> Option<String>;

    fn set_label(&mut self, key: &str, value: &str) -> BuilderResult<()>;

    /// Environment variable from the image config, `None` when unset
    fn env(&self, key: &str) -> Option<String>;

    /// Append the tar at `path` as the next layer. The file may be removed
    /// once this returns.
    fn add_layer(&mut self, path: &Path) -> BuilderResult<()>;

    fn set_working_dir(&mut self, dir: &str) -> BuilderResult<()>;

    /// Commit all pending changes
    fn save(&mut self) -> BuilderResult<()>;
}
