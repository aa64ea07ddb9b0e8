// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! Validate command - check pipeline configuration

use colored::Colorize;
use miette::Result;
use std::path::PathBuf;

use super::{build_resolver, load_config, Overrides};
use crate::pipeline::{PipelineConfig, PipelineValidator};
use crate::utils::{print_error, print_section, print_success, print_warning};

/// Run the validate command
pub async fn run(config_path: PathBuf, verbose: bool) -> Result<()> {
    println!("{}", "Validating pipeline...".bold());
    println!();

    // Validation needs a real file; a missing one is not silently defaulted here
    if !config_path.exists() {
        return Err(miette::miette!(
            "Pipeline file not found: {}\n\n\
             Run 'orderflow init' to create one.",
            config_path.display()
        ));
    }

    let config = match load_config(&config_path, &Overrides::default()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("  {} Failed to parse pipeline", "✗".red());
            eprintln!();
            return Err(miette::miette!("Parse error: {}", e));
        }
    };

    print_success("Pipeline file is valid YAML");

    let mut validation = PipelineValidator::validate(&config);
    let resolver = build_resolver(&config, &[])?;
    validation.merge(PipelineValidator::validate_environment(&config, &*resolver));

    if !validation.errors.is_empty() {
        print_section("Errors");
        for error in &validation.errors {
            print_error(error);
        }
    }

    if !validation.warnings.is_empty() {
        print_section("Warnings");
        for warning in &validation.warnings {
            print_warning(warning);
        }
    }

    if verbose {
        print_summary(&config);
    }

    println!();

    if !validation.is_valid() {
        Err(miette::miette!("Pipeline validation failed"))
    } else if validation.has_warnings() {
        println!("{}", "Pipeline is valid but has warnings.".yellow().bold());
        Ok(())
    } else {
        println!("{}", "Pipeline is valid!".green().bold());
        Ok(())
    }
}

fn print_summary(config: &PipelineConfig) {
    print_section("Pipeline summary");
    println!("  Name: {}", config.name);
    println!("  Source: {}", config.source.display());
    println!("  Output: {}", config.output_dir.display());
    println!("  Target city: {}", config.target_city);
    println!("  Identity variable: {}", config.identity_variable);
    println!(
        "  Retry: {} x {}s",
        config.retry.retries, config.retry.delay_secs
    );
}
