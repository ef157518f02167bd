//! Buildpack artifacts
//!
//! A buildpack is either a leaf (declares the stacks it supports) or a
//! composite (declares a nested order of other buildpacks). Its files come
//! from a [`Blob`] whose root carries a `buildpack.toml` descriptor.

use std::fmt;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::archive::read_tar_entry;
use crate::blob::Blob;
use crate::error::{BuilderError, BuilderResult};
use crate::order::Order;

/// Name of the descriptor entry inside a buildpack blob
pub const BUILDPACK_DESCRIPTOR: &str = "buildpack.toml";

/// Identity of a buildpack
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildpackInfo {
    pub id: String,

    #[serde(default)]
    pub version: String,
}

impl BuildpackInfo {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for BuildpackInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

/// A stack a leaf buildpack can run on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    pub id: String,
}

/// Parsed `buildpack.toml`
#[derive(Debug, Clone, Deserialize)]
pub struct BuildpackDescriptor {
    pub buildpack: BuildpackInfo,

    #[serde(default)]
    pub stacks: Vec<Stack>,

    #[serde(default)]
    pub order: Order,
}

impl BuildpackDescriptor {
    pub fn parse(content: &str) -> BuilderResult<Self> {
        toml::from_str(content).map_err(|e| BuilderError::descriptor(BUILDPACK_DESCRIPTOR, e))
    }
}

/// A buildpack to embed in the builder image
pub struct Buildpack {
    pub info: BuildpackInfo,
    pub stacks: Vec<Stack>,
    pub order: Order,
    blob: Box<dyn Blob>,
}

impl Buildpack {
    pub fn new(
        info: BuildpackInfo,
        stacks: Vec<Stack>,
        order: Order,
        blob: impl Blob + 'static,
    ) -> Self {
        Self {
            info,
            stacks,
            order,
            blob: Box::new(blob),
        }
    }

    /// Build a buildpack from a blob, reading identity, stacks and order
    /// from its `buildpack.toml`
    pub fn from_blob(blob: impl Blob + 'static) -> BuilderResult<Self> {
        let content = read_tar_entry(blob.open()?, BUILDPACK_DESCRIPTOR)?.ok_or_else(|| {
            BuilderError::descriptor(BUILDPACK_DESCRIPTOR, "could not find entry path")
        })?;
        let content = String::from_utf8(content)
            .map_err(|e| BuilderError::descriptor(BUILDPACK_DESCRIPTOR, e))?;
        let descriptor = BuildpackDescriptor::parse(&content)?;

        Ok(Self::new(
            descriptor.buildpack,
            descriptor.stacks,
            descriptor.order,
            blob,
        ))
    }

    /// Directory-safe form of the id
    pub fn escaped_id(&self) -> String {
        escape_id(&self.info.id)
    }

    pub fn supports_stack(&self, stack_id: &str) -> bool {
        self.stacks.iter().any(|s| s.id == stack_id)
    }

    pub fn open(&self) -> BuilderResult<Box<dyn Read + '_>> {
        self.blob.open()
    }
}

impl fmt::Debug for Buildpack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buildpack")
            .field("info", &self.info)
            .field("stacks", &self.stacks)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

/// Replace path separators so the id can name a single directory
pub fn escape_id(id: &str) -> String {
    id.replace('/', "_")
}
