// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagerun contributors

//! Validate command - check pipeline configuration

use colored::Colorize;
use miette::Result;

use crate::config::RunnerConfig;
use crate::errors::StagerunError;
use crate::pipeline::{Pipeline, PipelineValidator};
use crate::utils::{
    configure_colors, print_error, print_section, print_success, print_warning, should_use_colors,
};

/// Run the validate command
pub async fn run(config: RunnerConfig, verbose: bool) -> Result<()> {
    configure_colors(should_use_colors(config.color));

    println!("{}", "Validating pipeline...".bold());
    println!();

    let pipeline = match Pipeline::from_file(&config.pipeline) {
        Ok(p) => p,
        Err(StagerunError::Validation { errors }) => {
            print_section("Errors");
            for error in &errors {
                print_error(error);
            }
            println!();
            return Err(StagerunError::Validation { errors }.into());
        }
        Err(e) => {
            print_error("Failed to parse pipeline");
            println!();
            return Err(e.into());
        }
    };

    print_success(&format!("{} parsed", config.pipeline.display()));
    print_success(&format!(
        "{} stage{}, {} job{}",
        pipeline.stages.len(),
        if pipeline.stages.len() == 1 { "" } else { "s" },
        pipeline.job_count(),
        if pipeline.job_count() == 1 { "" } else { "s" }
    ));

    let validation = PipelineValidator::validate(&pipeline);

    if validation.has_warnings() {
        print_section("Warnings");
        for warning in &validation.warnings {
            print_warning(warning);
        }
    }

    if verbose {
        print_section("Pipeline summary");
        if !pipeline.before_script.is_empty() {
            println!("  before_script: {} command(s)", pipeline.before_script.len());
        }
        if !pipeline.environment.is_empty() {
            let names: Vec<&str> = pipeline.environment.keys().map(String::as_str).collect();
            println!("  variables: {}", names.join(", "));
        }
        for stage in &pipeline.stages {
            let jobs: Vec<&str> = stage.jobs.iter().map(|j| j.name.as_str()).collect();
            println!("    - {} {}", stage.name, format!("[{}]", jobs.join(", ")).dimmed());
        }
    }

    println!();

    if validation.has_warnings() {
        println!("{}", "Pipeline is valid but has warnings.".yellow().bold());
    } else {
        println!("{}", "Pipeline is valid!".green().bold());
    }

    Ok(())
}
