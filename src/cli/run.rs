// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagerun contributors

//! Run command - execute the pipeline

use colored::Colorize;
use miette::Result;
use std::sync::Arc;

use super::OutputFormat;
use crate::config::RunnerConfig;
use crate::errors::StagerunError;
use crate::executors::{ScriptRunner, ShellExecutor};
use crate::pipeline::{ExecutionOptions, Pipeline, PipelineExecutor, PipelineValidator};
use crate::report::Reporter;
use crate::utils::{configure_colors, is_interactive, should_use_colors};

/// Run the pipeline
pub async fn run(
    config: RunnerConfig,
    stages: Vec<String>,
    dry_run: bool,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let text = format == OutputFormat::Text;
    let color = text && should_use_colors(config.color);
    configure_colors(color);

    // Load pipeline (parse and validation errors abort here)
    let pipeline = Pipeline::from_file(&config.pipeline)?;

    let validation = PipelineValidator::validate(&pipeline);
    if validation.has_warnings() && verbose {
        eprintln!("{}", "Pipeline warnings:".yellow().bold());
        for warning in &validation.warnings {
            eprintln!("  {} {}", "⚠".yellow(), warning);
        }
        eprintln!();
    }

    let unknown: Vec<String> = stages
        .iter()
        .filter(|name| pipeline.get_stage(name).is_none())
        .map(|name| format!("Stage '{}' requested with --stage is not declared", name))
        .collect();
    if !unknown.is_empty() {
        return Err(StagerunError::Validation { errors: unknown }.into());
    }

    let working_dir = std::env::current_dir().map_err(StagerunError::from)?;

    let runner = ShellExecutor::new(&config.shell, working_dir);
    if !dry_run && !runner.check_available().await? {
        // Jobs will each report an environment error
        tracing::warn!(shell = %config.shell, "shell is not available");
    }

    let options = ExecutionOptions {
        dry_run,
        stages,
        max_parallel: config.max_parallel,
        verbose,
        progress: text,
        spinner: text && !verbose && is_interactive(),
    };

    let executor = PipelineExecutor::new(Arc::new(runner));
    let result = executor.execute(&pipeline, &options).await;

    let reporter = Reporter::new(&pipeline).with_color(color);
    match format {
        OutputFormat::Text => {
            println!();
            print!("{}", reporter.report(&result).summary);
        }
        OutputFormat::Json => {
            let json = reporter
                .json(&result)
                .to_string_pretty()
                .map_err(StagerunError::from)?;
            println!("{}", json);
        }
    }

    match result.failure() {
        None => Ok(()),
        Some(err) => Err(err.into()),
    }
}
