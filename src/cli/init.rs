// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! Init command - write a default pipeline file

use colored::Colorize;
use miette::Result;
use std::path::Path;

use crate::pipeline::{PipelineConfig, DEFAULT_PIPELINE_FILE};
use crate::utils::print_success;

/// Run the init command
pub async fn run(force: bool, verbose: bool) -> Result<()> {
    let pipeline_path = Path::new(DEFAULT_PIPELINE_FILE);

    println!("{}", "Initializing orderflow project...".bold());
    println!();

    if pipeline_path.exists() && !force {
        return Err(miette::miette!(
            "{} already exists. Use --force to overwrite.",
            DEFAULT_PIPELINE_FILE
        ));
    }

    let config = PipelineConfig::default();
    let content = render_template(&config)?;

    std::fs::write(pipeline_path, &content).map_err(|e| {
        miette::miette!("Failed to write {}: {}", DEFAULT_PIPELINE_FILE, e)
    })?;

    print_success(&format!("Created {}", DEFAULT_PIPELINE_FILE));

    if !config.output_dir.exists() {
        std::fs::create_dir_all(&config.output_dir).map_err(|e| {
            miette::miette!(
                "Failed to create directory '{}': {}",
                config.output_dir.display(),
                e
            )
        })?;
        print_success(&format!("Created {}/", config.output_dir.display()));
    }

    println!();
    println!("{}", "Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!(
        "  1. Place the database at {}",
        config.source.display().to_string().cyan()
    );
    println!(
        "  2. Export {}",
        format!("ORDERFLOW_VAR_{}=<value>", config.identity_variable.to_uppercase()).cyan()
    );
    println!("  3. Run {} to execute the pipeline", "orderflow run".cyan());
    println!();

    if verbose {
        println!("{}", "Generated pipeline:".dimmed());
        println!("{}", "─".repeat(50).dimmed());
        println!("{}", content.dimmed());
    }

    Ok(())
}

fn render_template(config: &PipelineConfig) -> Result<String> {
    let body = config.to_yaml()?;
    Ok(format!(
        "# orderflow pipeline configuration\n\
         # Every key is optional; the values below are the defaults.\n\
         \n{}",
        body
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let content = render_template(&PipelineConfig::default()).unwrap();
        assert!(content.starts_with("# orderflow"));
        assert_eq!(
            PipelineConfig::from_yaml(&content).unwrap(),
            PipelineConfig::default()
        );
    }
}
