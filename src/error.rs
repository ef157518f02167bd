//! Error types for cnb-builder
//!
//! All modules use `BuilderResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for builder operations
pub type BuilderResult<T> = Result<T, BuilderError>;

/// All errors that can occur while assembling a builder image
#[derive(Error, Debug)]
pub enum BuilderError {
    // Base image configuration errors
    #[error("image '{image}' missing label '{label}'")]
    MissingLabel { image: String, label: String },

    #[error("builder '{image}' missing label '{label}' -- try recreating builder")]
    MissingMetadataLabel { image: String, label: String },

    #[error("image '{image}' missing required env var '{var}'")]
    MissingEnv { image: String, var: String },

    #[error("failed to parse '{var}', value '{value}' should be an integer")]
    InvalidEnv { var: String, value: String },

    #[error("stack '{configured}' from config does not match stack '{image}' of the base image")]
    StackMismatch { configured: String, image: String },

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // Order and buildpack graph errors
    #[error("no versions of buildpack '{id}' were found on the builder")]
    BuildpackNotFound { id: String },

    #[error("unable to resolve version: multiple versions of '{id}' - must specify an explicit version")]
    AmbiguousBuildpackVersion { id: String },

    #[error("buildpack '{id}' with version '{version}' was not found on the builder")]
    BuildpackVersionNotFound { id: String, version: String },

    #[error("buildpack '{buildpack}' must have either stacks or an order defined")]
    MissingStacksOrOrder { buildpack: String },

    #[error("buildpack '{buildpack}' cannot have both stacks and an order defined")]
    BothStacksAndOrder { buildpack: String },

    #[error("buildpack '{buildpack}' does not support stack '{stack}'")]
    UnsupportedStack { buildpack: String, stack: String },

    #[error("buildpack '{buildpack}' not found on the builder")]
    NestedBuildpackNotFound { buildpack: String },

    // Lifecycle errors
    #[error("did not find '{0}' in tar")]
    MissingLifecycleBinary(String),

    #[error("lifecycle has version '{actual}' which does not match provided version '{expected}'")]
    LifecycleVersionMismatch { actual: String, expected: String },

    // Image abstraction errors
    #[error("image '{image}': {reason}")]
    Image { image: String, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("failed to decode {context}: {reason}")]
    Descriptor { context: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl BuilderError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a decode error for a structured document
    pub fn descriptor(context: impl Into<String>, reason: impl ToString) -> Self {
        Self::Descriptor {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an error raised by an image implementation
    pub fn image(image: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Image {
            image: image.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error comes from a buildpack graph that cannot be satisfied
    pub fn is_graph_error(&self) -> bool {
        matches!(
            self,
            Self::BuildpackNotFound { .. }
                | Self::AmbiguousBuildpackVersion { .. }
                | Self::BuildpackVersionNotFound { .. }
                | Self::MissingStacksOrOrder { .. }
                | Self::BothStacksAndOrder { .. }
                | Self::UnsupportedStack { .. }
                | Self::NestedBuildpackNotFound { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingMetadataLabel { .. } => {
                Some("Recreate the builder with: cnb-builder create")
            }
            Self::MissingEnv { .. } | Self::InvalidEnv { .. } => {
                Some("The base image must set CNB_USER_ID and CNB_GROUP_ID")
            }
            Self::AmbiguousBuildpackVersion { .. } => {
                Some("Pin the version in the [[order.group]] entry")
            }
            Self::StackMismatch { .. } => {
                Some("Use a base image labeled with the configured stack id")
            }
            _ if self.is_graph_error() => {
                Some("Check that every buildpack in the order is added and supports the stack")
            }
            _ => None,
        }
    }
}
