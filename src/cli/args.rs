//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// cnb-builder - assemble Cloud Native Buildpacks builder images
///
/// Embeds a lifecycle, buildpacks, a detection order and stack metadata
/// into a base build image.
#[derive(Parser, Debug)]
#[command(name = "cnb-builder")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Builder configuration file (defaults to ./builder.toml)
    #[arg(short, long, global = true, env = "CNB_BUILDER_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a builder from a base build image
    Create(CreateArgs),

    /// Show the metadata of a builder
    Inspect(InspectArgs),
}

/// Arguments for the create command
#[derive(Parser, Debug)]
pub struct CreateArgs {
    /// Name of the builder image to create
    pub name: String,

    /// Directory of the base build image; the builder is written back to it
    #[arg(short, long)]
    pub image: PathBuf,
}

/// Arguments for the inspect command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Directory of the builder image
    #[arg(short, long)]
    pub image: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Output format for the inspect command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}
