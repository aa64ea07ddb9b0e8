// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! Pipeline runner
//!
//! Drives the stages one after another. A stage starts only after the
//! previous one has returned, and the runner (not the stages) applies the
//! retry policy.

use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;
use tracing::Instrument;

use crate::errors::{OrderflowError, RecoverySuggestion};
use crate::pipeline::{PipelineConfig, RetryPolicy};
use crate::stages::{
    digest, Aggregator, ArtifactLayout, Extractor, Finalizer, Stage, StageKind, StageOutput,
};
use crate::variables::VariableResolver;

/// Pipeline execution options
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Only run specific stages (empty means all)
    pub stages: Vec<StageKind>,
    /// Only show what would be done
    pub dry_run: bool,
    /// Verbose output
    pub verbose: bool,
}

/// Outcome of one stage
#[derive(Debug)]
pub struct StageRecord {
    pub kind: StageKind,
    /// Attempts made, including the successful one
    pub attempts: u32,
    pub duration: Duration,
    pub output: StageOutput,
    /// BLAKE3 digest of the written artifact
    pub digest: String,
}

/// The stage that stopped the run
#[derive(Debug)]
pub struct StageFailure {
    pub kind: StageKind,
    pub attempts: u32,
    pub error: OrderflowError,
}

/// Result of executing a pipeline
#[derive(Debug)]
pub struct RunReport {
    /// Completed stages, in order
    pub completed: Vec<StageRecord>,
    /// Set when a stage failed after all retries
    pub failure: Option<StageFailure>,
    /// Total execution time
    pub duration: Duration,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn record(&self, kind: StageKind) -> Option<&StageRecord> {
        self.completed.iter().find(|r| r.kind == kind)
    }
}

/// Pipeline runner
pub struct PipelineRunner {
    stages: Vec<Box<dyn Stage>>,
    layout: ArtifactLayout,
    retry: RetryPolicy,
}

impl PipelineRunner {
    /// Runner with no stages
    pub fn new(layout: ArtifactLayout, retry: RetryPolicy) -> Self {
        Self {
            stages: Vec::new(),
            layout,
            retry,
        }
    }

    /// Runner for the standard extract → aggregate → finalize pipeline
    pub fn from_config(config: &PipelineConfig, resolver: Arc<dyn VariableResolver>) -> Self {
        Self::new(ArtifactLayout::new(&config.output_dir), config.retry)
            .with_stage(Box::new(Extractor::from_config(config)))
            .with_stage(Box::new(Aggregator::from_config(config)))
            .with_stage(Box::new(Finalizer::from_config(config, resolver)))
    }

    /// Append a stage
    pub fn with_stage(mut self, stage: Box<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Execute the selected stages in order
    pub async fn execute(&self, options: &ExecutionOptions) -> RunReport {
        let start = Instant::now();

        let selected: Vec<&dyn Stage> = self
            .stages
            .iter()
            .map(|s| &**s)
            .filter(|s| options.stages.is_empty() || options.stages.contains(&s.kind()))
            .collect();

        self.print_execution_plan(&selected);

        let mut report = RunReport {
            completed: Vec::new(),
            failure: None,
            duration: Duration::ZERO,
        };

        if options.dry_run {
            report.duration = start.elapsed();
            return report;
        }

        for stage in selected {
            let kind = stage.kind();
            let span = tracing::info_span!("stage", name = kind.name());

            match self.run_with_retry(stage).instrument(span).await {
                Ok(record) => {
                    println!(
                        "  {} {} ({:.2}s) {}",
                        "✓".green(),
                        kind.name().bold(),
                        record.duration.as_secs_f64(),
                        record.output.summary.dimmed()
                    );
                    if options.verbose {
                        println!("      {} {}", record.output.path.display(), record.digest.dimmed());
                    }
                    report.completed.push(record);
                }
                Err(failure) => {
                    println!("  {} {} failed", "✗".red(), kind.name().bold());
                    report.failure = Some(failure);
                    break;
                }
            }
        }

        report.duration = start.elapsed();

        println!();
        if report.success() {
            println!(
                "{}",
                format!(
                    "Pipeline completed successfully in {:.2}s",
                    report.duration.as_secs_f64()
                )
                .green()
            );
        } else {
            println!(
                "{}",
                format!("Pipeline failed after {:.2}s", report.duration.as_secs_f64()).red()
            );
        }

        report
    }

    /// Run one stage, re-invoking it per the retry policy
    async fn run_with_retry(&self, stage: &dyn Stage) -> Result<StageRecord, StageFailure> {
        let kind = stage.kind();
        let max_attempts = self.retry.retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let started = Instant::now();

            let result = match stage.execute(&self.layout).await {
                Ok(output) => digest(&output.path).map(|digest| (output, digest)),
                Err(e) => Err(e),
            };

            match result {
                Ok((output, digest)) => {
                    return Ok(StageRecord {
                        kind,
                        attempts: attempt,
                        duration: started.elapsed(),
                        output,
                        digest,
                    });
                }
                Err(error)
                    if attempt < max_attempts && RecoverySuggestion::is_retryable(&error) =>
                {
                    tracing::warn!(
                        stage = kind.name(),
                        attempt,
                        error = %error,
                        "stage failed, retrying in {}s",
                        self.retry.delay_secs
                    );
                    tokio::time::sleep(self.retry.delay()).await;
                }
                Err(error) => {
                    tracing::error!(stage = kind.name(), attempt, error = %error, "stage failed");
                    return Err(StageFailure {
                        kind,
                        attempts: attempt,
                        error,
                    });
                }
            }
        }
    }

    /// Print the execution plan
    fn print_execution_plan(&self, stages: &[&dyn Stage]) {
        println!();
        println!("{}: {}", "Output".bold(), self.layout.dir().display());
        println!("{}", "═".repeat(50));
        println!(
            "Execution plan ({} stage{}):",
            stages.len(),
            if stages.len() == 1 { "" } else { "s" }
        );
        println!();

        for (i, stage) in stages.iter().enumerate() {
            let kind = stage.kind();
            print!("  {}. {} → {}", i + 1, kind.name().bold(), kind.output_file());
            if let Some(upstream) = kind.upstream() {
                print!(" {}", format!("[reads: {}]", upstream.output_file()).dimmed());
            }
            println!();
        }

        println!();
    }
}
