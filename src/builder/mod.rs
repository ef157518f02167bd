//! Builder aggregate
//!
//! A [`Builder`] wraps a base image, collects the lifecycle, buildpacks,
//! order, stack info and platform env to embed, and commits everything in one
//! [`Builder::save`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use semver::Version;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::buildpack::Buildpack;
use crate::config::StackConfig;
use crate::error::{BuilderError, BuilderResult};
use crate::image::{Image, ENV_GID, ENV_UID, STACK_LABEL};
use crate::layer::{CompatMode, LayerComposer, LAYERS_DIR};
use crate::lifecycle::Lifecycle;
use crate::metadata::{
    BuildpackMetadata, Metadata, RunImageMetadata, StackMetadata, METADATA_LABEL,
};
use crate::order::{resolve_order, validate_buildpacks, Order};

/// A builder image under construction
pub struct Builder<I: Image> {
    image: I,
    lifecycle: Option<Lifecycle>,
    additional_buildpacks: Vec<Buildpack>,
    metadata: Metadata,
    env: BTreeMap<String, String>,
    uid: u64,
    gid: u64,
    stack_id: String,
    replace_order: bool,
    order: Order,
}

impl<I: Image> fmt::Debug for Builder<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("image", &self.image.name())
            .field("stack_id", &self.stack_id)
            .field("uid", &self.uid)
            .field("gid", &self.gid)
            .field("replace_order", &self.replace_order)
            .finish_non_exhaustive()
    }
}

impl<I: Image> Builder<I> {
    /// Open an existing builder image
    pub fn load(image: I) -> BuilderResult<Self> {
        let (uid, gid) = user_and_group_ids(&image)?;
        let stack_id = stack_id(&image)?;

        let label = image
            .label(METADATA_LABEL)
            .filter(|label| !label.is_empty())
            .ok_or_else(|| BuilderError::MissingMetadataLabel {
                image: image.name().to_string(),
                label: METADATA_LABEL.to_string(),
            })?;
        let metadata = parse_metadata(&image, &label)?;

        debug!("Loaded builder {} on stack {}", image.name(), stack_id);
        Ok(Self::from_parts(image, metadata, uid, gid, stack_id))
    }

    /// Start a new builder named `name` on top of a base image
    pub fn create(mut image: I, name: &str) -> BuilderResult<Self> {
        let (uid, gid) = user_and_group_ids(&image)?;
        let stack_id = stack_id(&image)?;

        let label = image
            .label(METADATA_LABEL)
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| "{}".to_string());
        let metadata = parse_metadata(&image, &label)?;

        image.rename(name);

        debug!("Creating builder {} on stack {}", name, stack_id);
        Ok(Self::from_parts(image, metadata, uid, gid, stack_id))
    }

    fn from_parts(image: I, metadata: Metadata, uid: u64, gid: u64, stack_id: String) -> Self {
        let order = metadata.groups.to_order();
        Self {
            image,
            lifecycle: None,
            additional_buildpacks: Vec::new(),
            metadata,
            env: BTreeMap::new(),
            uid,
            gid,
            stack_id,
            replace_order: false,
            order,
        }
    }

    pub fn description(&self) -> &str {
        &self.metadata.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.metadata.description = description.into();
    }

    /// Version of the lifecycle recorded in the metadata, if any
    pub fn lifecycle_version(&self) -> Option<&Version> {
        self.metadata.lifecycle_version()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Every buildpack known to the builder, embedded now or earlier
    pub fn buildpacks(&self) -> &[BuildpackMetadata] {
        &self.metadata.buildpacks
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    /// Replace the detection order; an order layer is written on save
    pub fn set_order(&mut self, order: Order) {
        self.order = order;
        self.replace_order = true;
    }

    pub fn name(&self) -> &str {
        self.image.name()
    }

    pub fn stack_info(&self) -> &StackMetadata {
        &self.metadata.stack
    }

    pub fn set_stack_info(&mut self, stack: StackConfig) {
        self.metadata.stack = StackMetadata {
            run_image: RunImageMetadata {
                image: stack.run_image,
                mirrors: stack.run_image_mirrors,
            },
        };
    }

    /// Queue a buildpack to embed and record it as known. A buildpack with
    /// the same id@version replaces the one already queued.
    pub fn add_buildpack(&mut self, bp: Buildpack) {
        self.metadata.add_buildpack(&bp.info);
        match self
            .additional_buildpacks
            .iter_mut()
            .find(|queued| queued.info == bp.info)
        {
            Some(queued) => *queued = bp,
            None => self.additional_buildpacks.push(bp),
        }
    }

    pub fn set_lifecycle(&mut self, lifecycle: Lifecycle) {
        self.lifecycle = Some(lifecycle);
    }

    pub fn set_env(&mut self, env: BTreeMap<String, String>) {
        self.env = env;
    }

    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub fn gid(&self) -> u64 {
        self.gid
    }

    pub fn stack_id(&self) -> &str {
        &self.stack_id
    }

    /// Give back the underlying image
    pub fn into_image(self) -> I {
        self.image
    }

    /// Resolve and validate everything, write all layers and commit the image.
    ///
    /// Nothing is committed if any step fails.
    pub fn save(&mut self) -> BuilderResult<()> {
        self.order = resolve_order(&self.order, &self.metadata.buildpacks)?;
        self.metadata.groups = self.order.to_v1_order();
        self.metadata.mark_latest();

        validate_buildpacks(&self.stack_id, &self.additional_buildpacks)?;

        let scratch = TempDir::with_prefix("create-builder-scratch")
            .map_err(|e| BuilderError::io("creating scratch directory", e))?;
        let composer = LayerComposer::new(scratch.path(), self.uid, self.gid);

        let layer = composer.dirs_layer()?;
        add_layer(&mut self.image, &layer, "default dirs")?;

        let layer = composer.env_layer(&self.env)?;
        add_layer(&mut self.image, &layer, "env")?;

        if let Some(lifecycle) = &self.lifecycle {
            self.metadata.set_lifecycle(lifecycle.descriptor());
            let layer = composer.lifecycle_layer(lifecycle)?;
            add_layer(&mut self.image, &layer, "lifecycle")?;
        }

        let mode = CompatMode::for_lifecycle(self.metadata.lifecycle_version());
        debug!("Writing layers for {:?} lifecycle layout", mode);

        for bp in &self.additional_buildpacks {
            let latest = self.metadata.is_latest(&bp.info);
            let layer = composer.buildpack_layer(bp, mode, latest)?;
            add_layer(&mut self.image, &layer, &format!("buildpack '{}'", bp.info))?;
        }

        if self.replace_order {
            let layer = composer.order_layer(&self.order, mode)?;
            add_layer(&mut self.image, &layer, "order")?;
        }

        let layer = composer.stack_layer(&self.metadata.stack)?;
        add_layer(&mut self.image, &layer, "stack")?;

        let label = self.metadata.to_label()?;
        self.image.set_label(METADATA_LABEL, &label)?;
        self.image.set_working_dir(LAYERS_DIR)?;
        self.image.save()?;

        info!(
            "Saved builder {} ({} buildpacks, {} groups)",
            self.image.name(),
            self.metadata.buildpacks.len(),
            self.order.len()
        );
        Ok(())
    }
}

fn add_layer<I: Image>(image: &mut I, path: &Path, what: &str) -> BuilderResult<()> {
    image.add_layer(path)?;
    debug!("Added {} layer", what);
    Ok(())
}

fn stack_id<I: Image>(image: &I) -> BuilderResult<String> {
    image
        .label(STACK_LABEL)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| BuilderError::MissingLabel {
            image: image.name().to_string(),
            label: STACK_LABEL.to_string(),
        })
}

fn parse_metadata<I: Image>(image: &I, label: &str) -> BuilderResult<Metadata> {
    Metadata::parse(label).map_err(|e| {
        BuilderError::descriptor(format!("metadata for builder '{}'", image.name()), e)
    })
}

fn user_and_group_ids<I: Image>(image: &I) -> BuilderResult<(u64, u64)> {
    let uid = numeric_env(image, ENV_UID)?;
    let gid = numeric_env(image, ENV_GID)?;
    Ok((uid, gid))
}

fn numeric_env<I: Image>(image: &I, var: &str) -> BuilderResult<u64> {
    let value = image
        .env(var)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| BuilderError::MissingEnv {
            image: image.name().to_string(),
            var: var.to_string(),
        })?;

    value.parse().map_err(|_| BuilderError::InvalidEnv {
        var: var.to_string(),
        value,
    })
}
