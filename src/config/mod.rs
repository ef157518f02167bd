//! Builder configuration loading

pub mod schema;

pub use schema::{BuilderConfig, BuildpackConfig, LifecycleConfig, StackConfig};

use crate::error::{BuilderError, BuilderResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default config file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "builder.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a config manager reading `builder.toml` in the working directory
    pub fn new() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Load the configuration. Relative buildpack and lifecycle uris are
    /// resolved against the directory holding the config file.
    pub fn load(&self) -> BuilderResult<BuilderConfig> {
        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            BuilderError::ConfigInvalid {
                path: self.config_path.clone(),
                reason: e.to_string(),
            }
        })?;

        let mut config: BuilderConfig =
            toml::from_str(&content).map_err(|e| BuilderError::ConfigInvalid {
                path: self.config_path.clone(),
                reason: e.to_string(),
            })?;

        let base = self.base_dir();
        for bp in &mut config.buildpacks {
            bp.uri = resolve_uri(&base, &bp.uri);
        }
        if let Some(uri) = config.lifecycle.uri.as_mut() {
            *uri = resolve_uri(&base, uri);
        }

        debug!("Loaded config from {}", self.config_path.display());
        Ok(config)
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    fn base_dir(&self) -> PathBuf {
        match self.config_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn resolve_uri(base: &Path, uri: &str) -> String {
    let path = Path::new(uri);
    if path.is_absolute() {
        uri.to_string()
    } else {
        base.join(path).to_string_lossy().into_owned()
    }
}
