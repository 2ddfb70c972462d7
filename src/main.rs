// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagerun contributors

//! stagerun - staged job runner
//!
//! Runs declarative CI pipeline definitions stage by stage.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stagerun::cli::{Cli, Commands};
use stagerun::config::RunnerConfig;
use stagerun::errors::StagerunError;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for the report
    let default_filter = if cli.verbose { "stagerun=debug" } else { "stagerun=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    let cwd = std::env::current_dir().map_err(StagerunError::from)?;
    let config = RunnerConfig::discover(cli.config.as_deref(), &cwd)?;

    // Dispatch to command handlers
    match cli.command {
        Commands::Run {
            pipeline,
            stage,
            dry_run,
            format,
            shell,
            jobs,
        } => {
            let config = config.with_overrides(shell, jobs, pipeline);
            stagerun::cli::run::run(config, stage, dry_run, format, cli.verbose).await
        }
        Commands::Validate { pipeline } => {
            let config = config.with_overrides(None, None, pipeline);
            stagerun::cli::validate::run(config, cli.verbose).await
        }
        Commands::Plan { pipeline } => {
            let config = config.with_overrides(None, None, pipeline);
            stagerun::cli::plan::run(config, cli.verbose).await
        }
    }
}
