//! Inspect command - show builder metadata

use crate::builder::Builder;
use crate::cli::args::{InspectArgs, OutputFormat};
use crate::error::BuilderResult;
use crate::image::DirImage;
use crate::metadata::Metadata;
use crate::order::Order;
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;

#[derive(Serialize)]
struct BuilderInfo<'a> {
    name: &'a str,
    stack_id: &'a str,
    order: &'a Order,
    #[serde(flatten)]
    metadata: &'a Metadata,
}

/// Execute the inspect command
pub fn execute(args: InspectArgs) -> BuilderResult<()> {
    let builder = Builder::load(DirImage::open(&args.image)?)?;

    match args.format {
        OutputFormat::Table => print_table(&builder),
        OutputFormat::Json => print_json(&builder)?,
    }

    Ok(())
}

fn print_table(builder: &Builder<DirImage>) {
    let ctx = UiContext::detect();
    let metadata = builder.metadata();
    ui::intro(&ctx, &format!("Builder {}", builder.name()));

    if !metadata.description.is_empty() {
        ui::key_value(&ctx, "Description", &metadata.description);
    }
    ui::key_value(&ctx, "Stack", builder.stack_id());

    let run_image = &metadata.stack.run_image;
    if run_image.image.is_empty() {
        ui::key_value(&ctx, "Run Image", "(none)");
    } else {
        ui::key_value(&ctx, "Run Image", &run_image.image);
    }
    for mirror in &run_image.mirrors {
        ui::key_value(&ctx, "Run Image Mirror", mirror);
    }

    match builder.lifecycle_version() {
        Some(version) => {
            ui::key_value(&ctx, "Lifecycle", &version.to_string());
            ui::key_value(&ctx, "Platform API", &metadata.lifecycle.api.platform);
            ui::key_value(&ctx, "Buildpack API", &metadata.lifecycle.api.buildpack);
        }
        None => ui::key_value(&ctx, "Lifecycle", "(none)"),
    }

    ui::section(&ctx, "Buildpacks");
    if builder.buildpacks().is_empty() {
        ui::step_info(&ctx, "No buildpacks");
    } else {
        println!(
            "  {:<40} {:<12} {:<6}",
            style("ID").bold(),
            style("VERSION").bold(),
            style("LATEST").bold()
        );
        for bp in builder.buildpacks() {
            println!(
                "  {:<40} {:<12} {:<6}",
                bp.info.id, bp.info.version, bp.latest
            );
        }
    }

    ui::section(&ctx, "Detection Order");
    if builder.order().is_empty() {
        ui::step_info(&ctx, "No detection order");
        return;
    }
    for (i, entry) in builder.order().entries().iter().enumerate() {
        println!("  Group #{}:", i + 1);
        for bp_ref in &entry.group {
            let optional = if bp_ref.optional { " (optional)" } else { "" };
            println!("    {}{}", bp_ref.info(), optional);
        }
    }
}

fn print_json(builder: &Builder<DirImage>) -> BuilderResult<()> {
    let info = BuilderInfo {
        name: builder.name(),
        stack_id: builder.stack_id(),
        order: builder.order(),
        metadata: builder.metadata(),
    };
    let json = serde_json::to_string_pretty(&info)?;
    println!("{}", json);
    Ok(())
}
