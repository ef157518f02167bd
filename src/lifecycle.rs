//! Lifecycle artifacts
//!
//! A lifecycle blob is a tar archive holding the build-time executables
//! under a single top-level directory. Releases from 0.4.0 on also carry a
//! `lifecycle.toml` descriptor; older releases get a fixed default one.

use std::collections::HashSet;
use std::fmt;
use std::io::Read;

use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::archive::{entry_name, read_tar_entry, top_level_rebase};
use crate::blob::Blob;
use crate::error::{BuilderError, BuilderResult};

/// Name of the descriptor entry inside a lifecycle blob
pub const LIFECYCLE_DESCRIPTOR: &str = "lifecycle.toml";

/// Version assumed for lifecycles without a descriptor
pub const DEFAULT_LIFECYCLE_VERSION: Version = Version::new(0, 3, 0);

/// Platform and buildpack API assumed for lifecycles without a descriptor
pub const DEFAULT_API: &str = "0.1";

/// Executables every lifecycle must ship
pub const LIFECYCLE_BINARIES: [&str; 7] = [
    "detector", "restorer", "analyzer", "builder", "exporter", "cacher", "launcher",
];

/// Parsed `lifecycle.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleDescriptor {
    #[serde(rename = "lifecycle")]
    pub info: LifecycleInfo,

    #[serde(default)]
    pub api: LifecycleApi,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleInfo {
    pub version: Version,
}

/// API versions implemented by a lifecycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleApi {
    #[serde(default)]
    pub platform: String,

    #[serde(default)]
    pub buildpack: String,
}

impl LifecycleDescriptor {
    pub fn parse(content: &str) -> BuilderResult<Self> {
        toml::from_str(content).map_err(|e| BuilderError::descriptor(LIFECYCLE_DESCRIPTOR, e))
    }
}

impl Default for LifecycleDescriptor {
    fn default() -> Self {
        Self {
            info: LifecycleInfo {
                version: DEFAULT_LIFECYCLE_VERSION,
            },
            api: LifecycleApi {
                platform: DEFAULT_API.to_string(),
                buildpack: DEFAULT_API.to_string(),
            },
        }
    }
}

/// A validated lifecycle ready to be embedded in a builder
pub struct Lifecycle {
    descriptor: LifecycleDescriptor,
    blob: Box<dyn Blob>,
}

impl Lifecycle {
    /// Read the descriptor from `blob` (or assume the default one) and check
    /// that every required executable is present.
    pub fn new(blob: impl Blob + 'static) -> BuilderResult<Self> {
        let descriptor = match read_tar_entry(blob.open()?, LIFECYCLE_DESCRIPTOR)? {
            Some(content) => {
                let content = String::from_utf8(content)
                    .map_err(|e| BuilderError::descriptor(LIFECYCLE_DESCRIPTOR, e))?;
                LifecycleDescriptor::parse(&content)?
            }
            None => {
                debug!(
                    "No {} in lifecycle, assuming version {}",
                    LIFECYCLE_DESCRIPTOR, DEFAULT_LIFECYCLE_VERSION
                );
                LifecycleDescriptor::default()
            }
        };

        let lifecycle = Self {
            descriptor,
            blob: Box::new(blob),
        };
        lifecycle.validate_binaries()?;

        Ok(lifecycle)
    }

    pub fn descriptor(&self) -> &LifecycleDescriptor {
        &self.descriptor
    }

    pub fn version(&self) -> &Version {
        &self.descriptor.info.version
    }

    /// Check the lifecycle against an expected version, if one is given
    pub fn validate(&self, expected_version: Option<&Version>) -> BuilderResult<()> {
        match expected_version {
            Some(expected) if expected != self.version() => {
                Err(BuilderError::LifecycleVersionMismatch {
                    actual: self.version().to_string(),
                    expected: expected.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    pub fn open(&self) -> BuilderResult<Box<dyn Read + '_>> {
        self.blob.open()
    }

    fn validate_binaries(&self) -> BuilderResult<()> {
        let mut archive = tar::Archive::new(self.open()?);
        let entries = archive
            .entries()
            .map_err(|e| BuilderError::io("reading lifecycle entries", e))?;

        let mut found = HashSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| BuilderError::io("failed to get next tar entry", e))?;
            if let Some(binary) = top_level_rebase(&entry_name(&entry)) {
                found.insert(binary);
            }
        }

        for binary in LIFECYCLE_BINARIES {
            if !found.contains(binary) {
                return Err(BuilderError::MissingLifecycleBinary(binary.to_string()));
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifecycle")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}
