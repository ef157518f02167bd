//! cnb-builder - Cloud Native Buildpacks builder assembly
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use cnb_builder::cli::{Cli, Commands};
use cnb_builder::config::ConfigManager;
use cnb_builder::error::BuilderResult;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

fn run() -> BuilderResult<()> {
    let cli = Cli::parse();

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("cnb_builder=warn"),
        1 => EnvFilter::new("cnb_builder=info"),
        _ => EnvFilter::new("cnb_builder=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let config_manager = match cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };

    match cli.command {
        Commands::Create(args) => cnb_builder::cli::commands::create(args, &config_manager),
        Commands::Inspect(args) => cnb_builder::cli::commands::inspect(args),
    }
}
