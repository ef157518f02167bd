//! Create command - assemble a builder from a base image and builder.toml

use crate::blob::FileBlob;
use crate::builder::Builder;
use crate::buildpack::Buildpack;
use crate::cli::args::CreateArgs;
use crate::config::{BuilderConfig, ConfigManager};
use crate::error::{BuilderError, BuilderResult};
use crate::image::DirImage;
use crate::lifecycle::Lifecycle;
use crate::ui::{self, UiContext};
use tracing::debug;

/// Execute the create command
pub fn execute(args: CreateArgs, manager: &ConfigManager) -> BuilderResult<()> {
    let config = manager.load()?;
    let ctx = UiContext::detect();
    ui::intro(&ctx, &format!("Creating builder {}", args.name));

    let image = DirImage::open(&args.image)?;
    let mut builder = Builder::create(image, &args.name)?;

    if !config.stack.id.is_empty() && config.stack.id != builder.stack_id() {
        return Err(BuilderError::StackMismatch {
            configured: config.stack.id.clone(),
            image: builder.stack_id().to_string(),
        });
    }

    builder.set_description(config.description.clone());
    builder.set_stack_info(config.stack.clone());
    builder.set_env(config.env.clone());

    if let Some(lifecycle) = load_lifecycle(&config, manager)? {
        ui::step_ok(&ctx, &format!("Using lifecycle {}", lifecycle.version()));
        builder.set_lifecycle(lifecycle);
    }

    for bp in &config.buildpacks {
        debug!("Reading buildpack from {}", bp.uri);
        let buildpack = Buildpack::from_blob(FileBlob::new(&bp.uri))?;
        ui::step_ok(&ctx, &format!("Added buildpack {}", buildpack.info));
        builder.add_buildpack(buildpack);
    }

    if !config.order.is_empty() {
        builder.set_order(config.order.clone());
    }

    builder.save()?;

    ui::outro_success(&ctx, &format!("Created builder {}", builder.name()));
    Ok(())
}

fn load_lifecycle(
    config: &BuilderConfig,
    manager: &ConfigManager,
) -> BuilderResult<Option<Lifecycle>> {
    let Some(uri) = &config.lifecycle.uri else {
        if config.lifecycle.version.is_some() {
            return Err(BuilderError::ConfigInvalid {
                path: manager.path().to_path_buf(),
                reason: "lifecycle.version requires lifecycle.uri".to_string(),
            });
        }
        return Ok(None);
    };

    debug!("Reading lifecycle from {}", uri);
    let lifecycle = Lifecycle::new(FileBlob::new(uri))?;
    lifecycle.validate(config.lifecycle.version.as_ref())?;
    Ok(Some(lifecycle))
}
