// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! Run command - execute the pipeline

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::{build_resolver, load_config, Overrides};
use crate::errors::RecoverySuggestion;
use crate::pipeline::{ExecutionOptions, PipelineRunner, PipelineValidator};
use crate::stages::StageKind;

/// Run the pipeline
pub async fn run(
    config_path: PathBuf,
    stages: Vec<StageKind>,
    dry_run: bool,
    overrides: Overrides,
    verbose: bool,
) -> Result<()> {
    let config = load_config(&config_path, &overrides)?;

    // Validate pipeline
    let validation = PipelineValidator::validate(&config);

    if !validation.is_valid() {
        eprintln!("{}", "Pipeline validation failed:".red().bold());
        for error in &validation.errors {
            eprintln!("  {} {}", "✗".red(), error);
        }
        return Err(miette::miette!("Pipeline configuration is invalid"));
    }

    if validation.has_warnings() && verbose {
        eprintln!("{}", "Pipeline warnings:".yellow().bold());
        for warning in &validation.warnings {
            eprintln!("  {} {}", "⚠".yellow(), warning);
        }
        eprintln!();
    }

    let resolver = build_resolver(&config, &overrides.vars)?;
    let runner = PipelineRunner::from_config(&config, resolver);

    let options = ExecutionOptions {
        stages,
        dry_run,
        verbose,
    };

    let report = runner.execute(&options).await;

    if let Some(failure) = report.failure {
        eprintln!();
        eprintln!(
            "{}",
            format!(
                "Stage '{}' failed after {} attempt{} ({}):",
                failure.kind,
                failure.attempts,
                if failure.attempts == 1 { "" } else { "s" },
                failure.error.kind()
            )
            .red()
            .bold()
        );

        if let Some(suggestion) = RecoverySuggestion::for_error(&failure.error) {
            eprintln!();
            eprint!("{}", suggestion.to_string().dimmed());
        }

        return Err(failure.error.into());
    }

    // Print outputs
    if !report.completed.is_empty() {
        println!();
        println!("{}:", "Outputs".bold());
        for record in &report.completed {
            println!("  - {}", record.output.path.display());
        }
    }

    Ok(())
}
