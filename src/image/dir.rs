//! Directory-backed image store
//!
//! Layout:
//!
//! ```text
//! <root>/image.json            manifest: name, labels, env, working dir, layers
//! <root>/blobs/sha256/<hex>    layer tars, content addressed
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{BuilderError, BuilderResult};
use crate::image::Image;

const MANIFEST_FILE: &str = "image.json";
const BLOBS_DIR: &str = "blobs/sha256";

/// Persisted image configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageManifest {
    pub name: String,

    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub working_dir: String,

    /// Layer digests, bottom first
    #[serde(default)]
    pub layers: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

/// Image stored as a manifest plus layer blobs under a directory
#[derive(Debug, Clone)]
pub struct DirImage {
    root: PathBuf,
    manifest: ImageManifest,
}

impl DirImage {
    /// Start a new, unsaved image rooted at `root`
    pub fn new(root: impl Into<PathBuf>, manifest: ImageManifest) -> Self {
        Self {
            root: root.into(),
            manifest,
        }
    }

    /// Open an image previously saved under `root`
    pub fn open(root: impl Into<PathBuf>) -> BuilderResult<Self> {
        let root = root.into();
        let path = root.join(MANIFEST_FILE);
        let content = fs::read_to_string(&path).map_err(|e| {
            BuilderError::image(
                root.display().to_string(),
                format!("reading {}: {}", path.display(), e),
            )
        })?;
        let manifest: ImageManifest = serde_json::from_str(&content).map_err(|e| {
            BuilderError::image(
                root.display().to_string(),
                format!("decoding {}: {}", path.display(), e),
            )
        })?;

        debug!("Opened image {} from {}", manifest.name, root.display());
        Ok(Self { root, manifest })
    }

    pub fn manifest(&self) -> &ImageManifest {
        &self.manifest
    }

    /// Path of the blob for a `sha256:<hex>` digest
    pub fn blob_path(&self, digest: &str) -> PathBuf {
        let hex = digest.strip_prefix("sha256:").unwrap_or(digest);
        self.root.join(BLOBS_DIR).join(hex)
    }
}

impl Image for DirImage {
    fn name(&self) -> &str {
        &self.manifest.name
    }

    fn rename(&mut self, name: &str) {
        self.manifest.name = name.to_string();
    }

    fn label(&self, key: &str) -> Option<String> {
        self.manifest.labels.get(key).cloned()
    }

    fn set_label(&mut self, key: &str, value: &str) -> BuilderResult<()> {
        self.manifest
            .labels
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn env(&self, key: &str) -> Option<String> {
        self.manifest.env.get(key).cloned()
    }

    fn add_layer(&mut self, path: &Path) -> BuilderResult<()> {
        let data = fs::read(path)
            .map_err(|e| BuilderError::io(format!("reading layer {}", path.display()), e))?;
        let digest = format!("sha256:{}", hex::encode(Sha256::digest(&data)));

        let blob = self.blob_path(&digest);
        if !blob.exists() {
            let dir = self.root.join(BLOBS_DIR);
            fs::create_dir_all(&dir)
                .map_err(|e| BuilderError::io(format!("creating {}", dir.display()), e))?;
            fs::write(&blob, &data)
                .map_err(|e| BuilderError::io(format!("writing blob {}", blob.display()), e))?;
        }

        debug!("Added layer {} ({} bytes)", digest, data.len());
        self.manifest.layers.push(digest);
        Ok(())
    }

    fn set_working_dir(&mut self, dir: &str) -> BuilderResult<()> {
        self.manifest.working_dir = dir.to_string();
        Ok(())
    }

    fn save(&mut self) -> BuilderResult<()> {
        fs::create_dir_all(&self.root)
            .map_err(|e| BuilderError::io(format!("creating {}", self.root.display()), e))?;

        self.manifest.created = Some(Utc::now());
        let content = serde_json::to_string_pretty(&self.manifest)?;

        let path = self.root.join(MANIFEST_FILE);
        let staged = self.root.join(format!("{}.tmp", MANIFEST_FILE));
        fs::write(&staged, content)
            .map_err(|e| BuilderError::io(format!("writing {}", staged.display()), e))?;
        fs::rename(&staged, &path)
            .map_err(|e| BuilderError::io(format!("writing {}", path.display()), e))?;

        Ok(())
    }
}
