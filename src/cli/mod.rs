// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagerun contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for stagerun.

pub mod plan;
pub mod run;
pub mod validate;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Staged job runner
///
/// Runs the jobs of a pipeline definition stage by stage.
#[derive(Parser, Debug)]
#[clap(
    name = "stagerun",
    version,
    about = "Run staged CI pipeline definitions locally",
    long_about = None,
    after_help = "Examples:\n\
        stagerun run                        Run .stagerun.yml\n\
        stagerun run -p ci.yml -s unit-test Run a single stage\n\
        stagerun validate ci.yml            Check a definition without running it\n\
        stagerun plan                       Show stages and jobs in execution order\n\n\
        See 'stagerun <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Runner configuration file (default: ./stagerun.toml if present)
    #[clap(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline
    Run {
        /// Pipeline file
        #[clap(short, long)]
        pipeline: Option<PathBuf>,

        /// Run only specific stages
        #[clap(short, long)]
        stage: Vec<String>,

        /// Dry run (show what would be done)
        #[clap(long)]
        dry_run: bool,

        /// Report format
        #[clap(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Shell used to run job scripts
        #[clap(long, env = "STAGERUN_SHELL")]
        shell: Option<String>,

        /// Maximum concurrent jobs per stage (0 = unbounded)
        #[clap(short, long, env = "STAGERUN_JOBS")]
        jobs: Option<usize>,
    },

    /// Validate pipeline configuration
    Validate {
        /// Pipeline file to validate
        pipeline: Option<PathBuf>,
    },

    /// Show stages and jobs in execution order
    Plan {
        /// Pipeline file
        pipeline: Option<PathBuf>,
    },
}

/// Output format for the run report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
