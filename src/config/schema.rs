//! Configuration schema for `builder.toml`

use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::order::Order;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Human-readable builder description
    pub description: String,

    /// Buildpacks to embed
    pub buildpacks: Vec<BuildpackConfig>,

    /// Detection order; the image's existing order is kept when empty
    pub order: Order,

    /// Stack the builder targets
    pub stack: StackConfig,

    /// Lifecycle to embed
    pub lifecycle: LifecycleConfig,

    /// Variables written under `/platform/env`
    pub env: BTreeMap<String, String>,
}

/// A buildpack source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildpackConfig {
    /// Path to a `.tar`, `.tgz` or directory
    pub uri: String,
}

/// Stack settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StackConfig {
    pub id: String,

    pub build_image: String,

    pub run_image: String,

    pub run_image_mirrors: Vec<String>,
}

/// Lifecycle settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Expected lifecycle version; checked against the lifecycle descriptor
    pub version: Option<Version>,

    /// Path to the lifecycle archive
    pub uri: Option<String>,
}
