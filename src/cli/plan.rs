// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagerun contributors

//! Plan command - show stages and jobs in execution order

use colored::Colorize;
use miette::Result;

use crate::config::RunnerConfig;
use crate::pipeline::Pipeline;
use crate::utils::{configure_colors, print_header, should_use_colors};

/// Run the plan command
pub async fn run(config: RunnerConfig, verbose: bool) -> Result<()> {
    configure_colors(should_use_colors(config.color));

    let pipeline = Pipeline::from_file(&config.pipeline)?;
    print_header(&format!("Plan for {}", config.pipeline.display()));
    print!("{}", render_plan(&pipeline, verbose));

    Ok(())
}

/// Render the execution plan as text
pub fn render_plan(pipeline: &Pipeline, verbose: bool) -> String {
    let mut out = Vec::new();

    if !pipeline.before_script.is_empty() {
        out.push(format!("{}", "before_script".bold()));
        for command in &pipeline.before_script {
            out.push(format!("    $ {}", command));
        }
    }

    for (i, stage) in pipeline.stages.iter().enumerate() {
        out.push(format!("{}. {}", i + 1, stage.name.bold()));

        if stage.jobs.is_empty() {
            out.push(format!("   {}", "(no jobs)".dimmed()));
        }

        for job in &stage.jobs {
            let mut line = format!("   - {}", job.name);
            if job.allow_failure {
                line.push_str(&format!(" {}", "(allowed to fail)".yellow()));
            }
            if let Some(pattern) = &job.extract_pattern {
                line.push_str(&format!(" {}", format!("metric: /{}/", pattern.as_str()).dimmed()));
            }
            out.push(line);

            if verbose {
                for command in &job.script {
                    out.push(format!("       $ {}", command));
                }
            }
        }
    }

    let mut text = out.join("\n");
    text.push('\n');
    text
}
