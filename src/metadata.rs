//! Builder metadata
//!
//! The durable record of a builder, stored as JSON in the
//! `io.buildpacks.builder.metadata` image label.

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::buildpack::BuildpackInfo;
use crate::error::BuilderResult;
use crate::lifecycle::{LifecycleApi, LifecycleDescriptor};
use crate::order::V1Order;

/// Label holding the JSON-encoded [`Metadata`]
pub const METADATA_LABEL: &str = "io.buildpacks.builder.metadata";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub buildpacks: Vec<BuildpackMetadata>,

    /// Legacy view of the order, regenerated before every save
    #[serde(default)]
    pub groups: V1Order,

    #[serde(default)]
    pub stack: StackMetadata,

    #[serde(default)]
    pub lifecycle: LifecycleMetadata,
}

/// A buildpack known to the builder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildpackMetadata {
    #[serde(flatten)]
    pub info: BuildpackInfo,

    /// Only version of its id on the builder
    #[serde(default)]
    pub latest: bool,
}

impl BuildpackMetadata {
    pub fn new(info: BuildpackInfo) -> Self {
        Self {
            info,
            latest: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackMetadata {
    #[serde(rename = "runImage", default)]
    pub run_image: RunImageMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunImageMetadata {
    #[serde(default)]
    pub image: String,

    #[serde(default)]
    pub mirrors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleMetadata {
    #[serde(default)]
    pub version: Option<Version>,

    #[serde(default)]
    pub api: LifecycleApi,
}

impl Metadata {
    /// Decode the metadata label value
    pub fn parse(label: &str) -> BuilderResult<Self> {
        Ok(serde_json::from_str(label)?)
    }

    /// Encode as a label value
    pub fn to_label(&self) -> BuilderResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Record a buildpack as known to the builder, once per id@version
    pub fn add_buildpack(&mut self, info: &BuildpackInfo) {
        if self.buildpacks.iter().any(|bp| &bp.info == info) {
            return;
        }
        self.buildpacks.push(BuildpackMetadata::new(info.clone()));
    }

    /// Flag each buildpack that is the only known version of its id
    pub fn mark_latest(&mut self) {
        let ids: Vec<String> = self.buildpacks.iter().map(|bp| bp.info.id.clone()).collect();
        for bp in &mut self.buildpacks {
            bp.latest = ids.iter().filter(|id| **id == bp.info.id).count() == 1;
        }
    }

    pub fn is_latest(&self, info: &BuildpackInfo) -> bool {
        self.buildpacks
            .iter()
            .any(|bp| &bp.info == info && bp.latest)
    }

    pub fn set_lifecycle(&mut self, descriptor: &LifecycleDescriptor) {
        self.lifecycle = LifecycleMetadata {
            version: Some(descriptor.info.version.clone()),
            api: descriptor.api.clone(),
        };
    }

    pub fn lifecycle_version(&self) -> Option<&Version> {
        self.lifecycle.version.as_ref()
    }
}
