//! cnb-builder - Cloud Native Buildpacks builder image assembly
//!
//! Turns a lifecycle, a set of buildpacks, a detection order and stack
//! metadata into the layers and labels of a builder image.

pub mod archive;
pub mod blob;
pub mod builder;
pub mod buildpack;
pub mod cli;
pub mod config;
pub mod error;
pub mod image;
pub mod layer;
pub mod lifecycle;
pub mod metadata;
pub mod order;
pub mod ui;

pub use builder::Builder;
pub use error::{BuilderError, BuilderResult};
