// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagerun contributors

//! Pipeline executor
//!
//! Runs `before_script` once, then each stage in ascending order. Jobs inside
//! a stage run concurrently and the stage is only finalised once every job
//! has exited. The first failing stage aborts the pipeline; everything after
//! it is recorded as skipped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::executors::ScriptRunner;
use crate::pipeline::{
    Environment, Job, JobResult, JobStatus, Outcome, Pipeline, PipelineResult, Stage, StageResult,
};
use crate::utils::create_spinner;

/// Pipeline execution options
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Only show what would be done
    pub dry_run: bool,
    /// Only run specific stages (empty = all)
    pub stages: Vec<String>,
    /// Maximum concurrent jobs per stage (0 = unbounded)
    pub max_parallel: usize,
    /// Print job output as jobs finish
    pub verbose: bool,
    /// Print progress lines to stdout
    pub progress: bool,
    /// Show a spinner while a stage runs
    pub spinner: bool,
}

/// Pipeline executor
pub struct PipelineExecutor {
    runner: Arc<dyn ScriptRunner>,
}

impl PipelineExecutor {
    /// Create a new pipeline executor backed by `runner`
    pub fn new(runner: Arc<dyn ScriptRunner>) -> Self {
        Self { runner }
    }

    /// Execute a pipeline
    ///
    /// Never fails: setup, environment and job failures are all recorded in
    /// the returned result.
    pub async fn execute(&self, pipeline: &Pipeline, options: &ExecutionOptions) -> PipelineResult {
        let start = Instant::now();

        let mut ordered: Vec<&Stage> = pipeline.stages.iter().collect();
        ordered.sort_by_key(|s| s.order);

        if options.progress {
            self.print_execution_plan(pipeline, &ordered, options);
        }

        if options.dry_run {
            return PipelineResult {
                setup: None,
                stages: ordered.iter().map(|s| StageResult::skipped(&s.name)).collect(),
                outcome: Outcome::Passed,
                duration: start.elapsed(),
            };
        }

        // Global setup
        let setup = if pipeline.before_script.is_empty() {
            None
        } else {
            let result = self
                .run_script(
                    "before_script",
                    "",
                    &pipeline.before_script,
                    &pipeline.environment,
                    false,
                )
                .await;
            if options.progress {
                print_job_line(&result, options.verbose);
            }
            Some(result)
        };

        let mut aborted = setup.as_ref().is_some_and(|s| !s.succeeded());
        if aborted {
            warn!("before_script failed, skipping all stages");
        }

        let mut stages = Vec::with_capacity(ordered.len());

        for stage in ordered {
            let selected = options.stages.is_empty() || options.stages.contains(&stage.name);

            if aborted || !selected {
                debug!(stage = %stage.name, aborted, "skipping stage");
                if options.progress {
                    println!(
                        "  {} {} {}",
                        "○".dimmed(),
                        stage.name.dimmed(),
                        "(skipped)".dimmed()
                    );
                }
                stages.push(StageResult::skipped(&stage.name));
                continue;
            }

            let result = self.execute_stage(stage, pipeline, options).await;

            if result.outcome == Outcome::Failed {
                warn!(stage = %stage.name, "stage failed, aborting pipeline");
                aborted = true;
            }

            stages.push(result);
        }

        let outcome = if aborted { Outcome::Failed } else { Outcome::Passed };
        let duration = start.elapsed();

        info!(%outcome, elapsed_ms = duration.as_millis() as u64, "pipeline finished");

        PipelineResult {
            setup,
            stages,
            outcome,
            duration,
        }
    }

    /// Execute all jobs of one stage and wait for every one of them
    async fn execute_stage(
        &self,
        stage: &Stage,
        pipeline: &Pipeline,
        options: &ExecutionOptions,
    ) -> StageResult {
        let start = Instant::now();
        info!(stage = %stage.name, jobs = stage.jobs.len(), "running stage");

        if options.progress {
            println!("{} {}", "▸".blue(), stage.name.bold());
        }

        let spinner = (options.spinner && !stage.jobs.is_empty()).then(|| {
            create_spinner(&format!(
                "{} ({} job{})",
                stage.name,
                stage.jobs.len(),
                if stage.jobs.len() == 1 { "" } else { "s" }
            ))
        });

        let limit = match options.max_parallel {
            0 => stage.jobs.len().max(1),
            n => n,
        };

        // `buffered` keeps declaration order no matter which job exits first
        let job_results: Vec<JobResult> = stream::iter(&stage.jobs)
            .map(|job| self.execute_job(job, &pipeline.environment))
            .buffered(limit)
            .collect()
            .await;

        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        if options.progress {
            for result in &job_results {
                print_job_line(result, options.verbose);
            }
        }

        StageResult::finished(&stage.name, job_results, start.elapsed())
    }

    /// Execute a single job in its own environment
    async fn execute_job(&self, job: &Job, global_env: &Environment) -> JobResult {
        let env = if job.variables.is_empty() {
            None
        } else {
            // Job variables override global ones
            let mut env = global_env.clone();
            env.extend(job.variables.iter().map(|(k, v)| (k.clone(), v.clone())));
            Some(env)
        };

        self.run_script(
            &job.name,
            &job.stage,
            &job.script,
            env.as_ref().unwrap_or(global_env),
            job.allow_failure,
        )
        .await
    }

    async fn run_script(
        &self,
        name: &str,
        stage: &str,
        script: &[String],
        env: &Environment,
        allow_failure: bool,
    ) -> JobResult {
        let script: Vec<String> = script
            .iter()
            .filter(|line| !line.trim().is_empty())
            .cloned()
            .collect();

        if script.is_empty() {
            debug!(job = name, "no commands, passing trivially");
            return JobResult {
                job_name: name.to_string(),
                stage: stage.to_string(),
                status: JobStatus::Passed,
                output: String::new(),
                allow_failure,
                duration: Duration::ZERO,
            };
        }

        let start = Instant::now();
        let (status, output) = match self.runner.run(name, &script, env).await {
            Ok(out) if out.success() => (JobStatus::Passed, out.output),
            Ok(out) => (
                JobStatus::Failed {
                    exit_code: out.exit_code,
                },
                out.output,
            ),
            Err(e) => {
                warn!(job = name, error = %e, "could not create execution environment");
                (
                    JobStatus::EnvironmentError {
                        message: e.to_string(),
                    },
                    String::new(),
                )
            }
        };

        debug!(job = name, ?status, "job finished");

        JobResult {
            job_name: name.to_string(),
            stage: stage.to_string(),
            status,
            output,
            allow_failure,
            duration: start.elapsed(),
        }
    }

    /// Print the execution plan
    fn print_execution_plan(
        &self,
        pipeline: &Pipeline,
        stages: &[&Stage],
        options: &ExecutionOptions,
    ) {
        println!();
        println!("{}: {}", "Runner".bold(), self.runner.describe());
        println!("{}", "═".repeat(50));
        println!(
            "Execution plan ({} stage{}, {} job{}):",
            stages.len(),
            if stages.len() == 1 { "" } else { "s" },
            pipeline.job_count(),
            if pipeline.job_count() == 1 { "" } else { "s" }
        );
        println!();

        if !pipeline.before_script.is_empty() {
            println!(
                "  0. {} {}",
                "before_script".bold(),
                format!("({} commands)", pipeline.before_script.len()).dimmed()
            );
        }

        for (i, stage) in stages.iter().enumerate() {
            let filtered = !options.stages.is_empty() && !options.stages.contains(&stage.name);
            let jobs: Vec<&str> = stage.jobs.iter().map(|j| j.name.as_str()).collect();

            print!("  {}. {}", i + 1, stage.name.bold());
            if jobs.is_empty() {
                print!(" {}", "(no jobs)".dimmed());
            } else {
                print!(" {}", format!("[{}]", jobs.join(", ")).dimmed());
            }
            if filtered {
                print!(" {}", "(not selected)".yellow());
            }
            println!();
        }

        println!();
    }
}

fn print_job_line(result: &JobResult, verbose: bool) {
    let elapsed = format!("({:.2}s)", result.duration.as_secs_f64()).dimmed();

    match &result.status {
        JobStatus::Passed => {
            println!("  {} {} {}", "✓".green(), result.job_name, elapsed);
        }
        JobStatus::Failed { exit_code } if result.allow_failure => {
            println!(
                "  {} {} exit {} {} {}",
                "!".yellow(),
                result.job_name,
                exit_code,
                "(allowed to fail)".yellow(),
                elapsed
            );
        }
        JobStatus::Failed { exit_code } => {
            println!("  {} {} exit {} {}", "✗".red(), result.job_name.bold(), exit_code, elapsed);
        }
        JobStatus::EnvironmentError { message } => {
            println!("  {} {} {}", "✗".red(), result.job_name.bold(), message.red());
        }
    }

    if verbose && !result.output.is_empty() {
        for line in result.output.lines() {
            println!("      {}", line.dimmed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StagerunError;
    use crate::executors::{ScriptOutput, ShellExecutor};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records scripts in call order; `exit N` as the last command sets the status
    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ScriptRunner for RecordingRunner {
        async fn run(
            &self,
            name: &str,
            script: &[String],
            _env: &Environment,
        ) -> Result<ScriptOutput, StagerunError> {
            self.calls.lock().unwrap().push(name.to_string());

            if script.iter().any(|c| c == "no-env") {
                return Err(StagerunError::Environment {
                    job: name.to_string(),
                    error: "cannot spawn".into(),
                    help: None,
                });
            }

            let exit_code = script
                .last()
                .and_then(|c| c.strip_prefix("exit "))
                .and_then(|code| code.parse().ok())
                .unwrap_or(0);

            Ok(ScriptOutput {
                exit_code,
                output: format!("{name}\n"),
                duration: Duration::ZERO,
            })
        }

        async fn check_available(&self) -> Result<bool, StagerunError> {
            Ok(true)
        }

        fn describe(&self) -> String {
            "recording".into()
        }
    }

    impl RecordingRunner {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn two_stage(lint_script: &[&str]) -> Pipeline {
        Pipeline {
            stages: vec![
                Stage::new("lint", 0).with_job(Job::new("flake8", "lint", lint_script)),
                Stage::new("test", 1).with_job(Job::new("pytest", "test", &["exit 0"])),
            ],
            ..Default::default()
        }
    }

    async fn run(pipeline: &Pipeline) -> (PipelineResult, Vec<String>) {
        let runner = Arc::new(RecordingRunner::default());
        let executor = PipelineExecutor::new(runner.clone());
        let result = executor.execute(pipeline, &ExecutionOptions::default()).await;
        (result, runner.calls())
    }

    #[tokio::test]
    async fn test_all_stages_pass() {
        let (result, calls) = run(&two_stage(&["exit 0"])).await;

        assert!(result.passed());
        assert_eq!(result.exit_code(), 0);
        assert_eq!(result.stage("lint").unwrap().outcome, Outcome::Passed);
        assert_eq!(result.stage("test").unwrap().outcome, Outcome::Passed);
        assert_eq!(calls, vec!["flake8", "pytest"]);
    }

    #[tokio::test]
    async fn test_failed_stage_skips_the_rest() {
        let (result, calls) = run(&two_stage(&["exit 1"])).await;

        assert_eq!(result.outcome, Outcome::Failed);
        assert_ne!(result.exit_code(), 0);
        assert_eq!(result.stage("lint").unwrap().outcome, Outcome::Failed);

        let test = result.stage("test").unwrap();
        assert_eq!(test.outcome, Outcome::Skipped);
        assert!(test.job_results.is_empty());
        assert_eq!(calls, vec!["flake8"]);
    }

    #[tokio::test]
    async fn test_setup_failure_runs_no_jobs() {
        let mut pipeline = two_stage(&["exit 0"]);
        pipeline.before_script = vec!["exit 2".into()];

        let (result, calls) = run(&pipeline).await;

        assert!(result.setup_failed());
        assert_eq!(result.outcome, Outcome::Failed);
        assert!(result.stages.iter().all(|s| s.outcome == Outcome::Skipped));
        assert!(result.stages.iter().all(|s| s.job_results.is_empty()));
        assert_eq!(calls, vec!["before_script"]);
        assert!(matches!(
            result.failure(),
            Some(StagerunError::Setup { exit_code: 2 })
        ));
    }

    #[tokio::test]
    async fn test_stages_run_in_ascending_order() {
        let names = ["a", "b", "c", "d", "e"];
        // A few fixed permutations of declaration order vs. `order` values
        let permutations: [[usize; 5]; 4] =
            [[0, 1, 2, 3, 4], [4, 3, 2, 1, 0], [2, 0, 4, 1, 3], [1, 4, 0, 3, 2]];

        for perm in permutations {
            let stages = perm
                .iter()
                .map(|&order| {
                    let name = names[order];
                    Stage::new(name, order * 10)
                        .with_job(Job::new(format!("job-{name}"), name, &["true"]))
                })
                .collect();
            let pipeline = Pipeline {
                stages,
                ..Default::default()
            };

            let (result, calls) = run(&pipeline).await;

            let executed: Vec<_> = result.stages.iter().map(|s| s.stage_name.as_str()).collect();
            assert_eq!(executed, names);
            assert_eq!(calls, vec!["job-a", "job-b", "job-c", "job-d", "job-e"]);
        }
    }

    #[tokio::test]
    async fn test_empty_pipeline_passes_after_setup() {
        let pipeline = Pipeline {
            before_script: vec!["echo ready".into()],
            ..Default::default()
        };

        let (result, calls) = run(&pipeline).await;

        assert!(result.passed());
        assert!(result.stages.is_empty());
        assert_eq!(calls, vec!["before_script"]);
    }

    #[tokio::test]
    async fn test_empty_stage_passes() {
        let pipeline = Pipeline {
            stages: vec![Stage::new("empty", 0)],
            ..Default::default()
        };

        let (result, calls) = run(&pipeline).await;

        assert_eq!(result.stage("empty").unwrap().outcome, Outcome::Passed);
        assert!(calls.is_empty());
    }

    #[tokio::test]
    async fn test_noop_job_passes_without_running() {
        let pipeline = Pipeline {
            stages: vec![Stage::new("test", 0).with_job(Job::new("noop", "test", &[]))],
            ..Default::default()
        };

        let (result, calls) = run(&pipeline).await;

        assert!(result.job("noop").unwrap().succeeded());
        assert!(calls.is_empty());
    }

    #[tokio::test]
    async fn test_environment_error_fails_stage() {
        let (result, _) = run(&two_stage(&["no-env"])).await;

        let flake8 = result.job("flake8").unwrap();
        assert!(matches!(flake8.status, JobStatus::EnvironmentError { .. }));
        assert_eq!(result.stage("lint").unwrap().outcome, Outcome::Failed);
        assert_eq!(result.stage("test").unwrap().outcome, Outcome::Skipped);
    }

    #[tokio::test]
    async fn test_allowed_failure_does_not_abort() {
        let pipeline = Pipeline {
            stages: vec![
                Stage::new("lint", 0)
                    .with_job(Job::new("flake8", "lint", &["exit 1"]).allowing_failure()),
                Stage::new("test", 1).with_job(Job::new("pytest", "test", &["exit 0"])),
            ],
            ..Default::default()
        };

        let (result, calls) = run(&pipeline).await;

        assert!(result.passed());
        assert!(!result.job("flake8").unwrap().succeeded());
        assert_eq!(calls, vec!["flake8", "pytest"]);
    }

    #[tokio::test]
    async fn test_stage_filter_skips_unselected() {
        let runner = Arc::new(RecordingRunner::default());
        let executor = PipelineExecutor::new(runner.clone());
        let options = ExecutionOptions {
            stages: vec!["test".into()],
            ..Default::default()
        };

        let result = executor.execute(&two_stage(&["exit 1"]), &options).await;

        assert!(result.passed());
        assert_eq!(result.stage("lint").unwrap().outcome, Outcome::Skipped);
        assert_eq!(runner.calls(), vec!["pytest"]);
    }

    #[tokio::test]
    async fn test_dry_run_executes_nothing() {
        let runner = Arc::new(RecordingRunner::default());
        let executor = PipelineExecutor::new(runner.clone());
        let options = ExecutionOptions {
            dry_run: true,
            ..Default::default()
        };

        let mut pipeline = two_stage(&["exit 0"]);
        pipeline.before_script = vec!["echo setup".into()];
        let result = executor.execute(&pipeline, &options).await;

        assert!(result.passed());
        assert!(result.setup.is_none());
        assert!(result.stages.iter().all(|s| s.outcome == Outcome::Skipped));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_stage_waits_for_slow_job() {
        let pipeline = Pipeline {
            stages: vec![
                Stage::new("test", 0)
                    .with_job(Job::new("slow", "test", &["sleep 0.5", "echo done"]))
                    .with_job(Job::new("fast", "test", &["exit 1"])),
                Stage::new("bench", 1).with_job(Job::new("bench", "bench", &["echo never"])),
            ],
            ..Default::default()
        };

        let executor = PipelineExecutor::new(Arc::new(ShellExecutor::new("sh", ".")));
        let result = executor.execute(&pipeline, &ExecutionOptions::default()).await;

        let stage = result.stage("test").unwrap();
        assert_eq!(stage.outcome, Outcome::Failed);
        assert_eq!(stage.job_results.len(), 2);
        assert!(stage.duration >= Duration::from_millis(500));

        let slow = result.job("slow").unwrap();
        assert!(slow.succeeded());
        assert!(slow.output.contains("done"));
        assert_eq!(result.job("fast").unwrap().exit_code(), Some(1));

        assert_eq!(result.stage("bench").unwrap().outcome, Outcome::Skipped);
        assert!(result.job("bench").is_none());
    }

    #[tokio::test]
    async fn test_jobs_in_stage_run_concurrently() {
        let pipeline = Pipeline {
            stages: vec![Stage::new("test", 0)
                .with_job(Job::new("one", "test", &["sleep 0.4"]))
                .with_job(Job::new("two", "test", &["sleep 0.4"]))
                .with_job(Job::new("three", "test", &["sleep 0.4"]))],
            ..Default::default()
        };

        let executor = PipelineExecutor::new(Arc::new(ShellExecutor::new("sh", ".")));
        let result = executor.execute(&pipeline, &ExecutionOptions::default()).await;

        assert!(result.passed());
        assert!(result.stage("test").unwrap().duration < Duration::from_millis(1100));
        let order: Vec<_> = result.stages[0]
            .job_results
            .iter()
            .map(|j| j.job_name.as_str())
            .collect();
        assert_eq!(order, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_max_parallel_limits_concurrency() {
        let pipeline = Pipeline {
            stages: vec![Stage::new("test", 0)
                .with_job(Job::new("one", "test", &["sleep 0.3"]))
                .with_job(Job::new("two", "test", &["sleep 0.3"]))
                .with_job(Job::new("three", "test", &["sleep 0.3"]))],
            ..Default::default()
        };
        let options = ExecutionOptions {
            max_parallel: 1,
            ..Default::default()
        };

        let executor = PipelineExecutor::new(Arc::new(ShellExecutor::new("sh", ".")));
        let result = executor.execute(&pipeline, &options).await;

        assert!(result.passed());
        assert!(result.stage("test").unwrap().duration >= Duration::from_millis(900));
        let order: Vec<_> = result.stages[0]
            .job_results
            .iter()
            .map(|j| j.job_name.as_str())
            .collect();
        assert_eq!(order, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_setup_without_shell_is_environment_error() {
        let pipeline = Pipeline {
            before_script: vec!["echo setup".into()],
            stages: vec![Stage::new("lint", 0).with_job(Job::new("flake8", "lint", &["true"]))],
            ..Default::default()
        };

        let runner = ShellExecutor::new("stagerun-no-such-shell", ".");
        let executor = PipelineExecutor::new(Arc::new(runner));
        let result = executor.execute(&pipeline, &ExecutionOptions::default()).await;

        assert!(result.setup_failed());
        assert!(result.job("flake8").is_none());
        assert!(matches!(
            result.failure(),
            Some(StagerunError::Environment { ref job, .. }) if job == "before_script"
        ));
    }

    #[tokio::test]
    async fn test_job_variables_override_global() {
        let mut job = Job::new("show", "test", &["echo \"$MODE-$LEVEL\""]);
        job.variables.insert("LEVEL".into(), "job".into());

        let mut pipeline = Pipeline {
            stages: vec![Stage::new("test", 0).with_job(job)],
            ..Default::default()
        };
        pipeline.environment.insert("MODE".into(), "ci".into());
        pipeline.environment.insert("LEVEL".into(), "global".into());

        let executor = PipelineExecutor::new(Arc::new(ShellExecutor::new("sh", ".")));
        let result = executor.execute(&pipeline, &ExecutionOptions::default()).await;

        assert_eq!(result.job("show").unwrap().output.trim(), "ci-job");
    }
}
