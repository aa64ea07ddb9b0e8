// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for orderflow.

pub mod decode;
pub mod init;
pub mod run;
pub mod validate;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::OrderflowResult;
use crate::pipeline::{PipelineConfig, DEFAULT_PIPELINE_FILE};
use crate::stages::StageKind;
use crate::variables::{ChainResolver, EnvResolver, MapResolver, VariableResolver};

/// Order summary pipeline
///
/// Extract orders, aggregate shipped quantities, emit an encoded summary.
#[derive(Parser, Debug)]
#[clap(
    name = "orderflow",
    version,
    about = "Extract orders, aggregate shipped quantities and emit an encoded summary",
    long_about = None,
    after_help = "Examples:\n\
        orderflow init                      Write a default .orderflow.yaml\n\
        orderflow run                       Run extract → aggregate → finalize\n\
        orderflow run -s aggregate          Re-run only the aggregate stage\n\
        orderflow decode                    Print the decoded final artifact\n\n\
        See 'orderflow <command> --help' for more information on a specific command."
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
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default pipeline file
    Init {
        /// Overwrite an existing pipeline file
        #[clap(short, long)]
        force: bool,
    },

    /// Run the pipeline
    Run {
        /// Pipeline file
        #[clap(short, long, default_value = DEFAULT_PIPELINE_FILE)]
        config: PathBuf,

        /// Run only specific stages (extract, aggregate, finalize)
        #[clap(short, long)]
        stage: Vec<StageKind>,

        /// Dry run (show what would be done)
        #[clap(long)]
        dry_run: bool,

        #[clap(flatten)]
        overrides: Overrides,
    },

    /// Validate the pipeline file
    Validate {
        /// Pipeline file to validate
        #[clap(default_value = DEFAULT_PIPELINE_FILE)]
        config: PathBuf,
    },

    /// Decode a final artifact
    Decode {
        /// Encoded file (defaults to the configured final_output.txt)
        file: Option<PathBuf>,

        /// Pipeline file
        #[clap(short, long, default_value = DEFAULT_PIPELINE_FILE)]
        config: PathBuf,
    },
}

/// Settings that override the pipeline file
#[derive(clap::Args, Debug, Clone, Default)]
pub struct Overrides {
    /// SQLite source database
    #[clap(long, env = "ORDERFLOW_SOURCE", value_name = "FILE")]
    pub source: Option<PathBuf>,

    /// Directory receiving the artifacts
    #[clap(long, env = "ORDERFLOW_OUTPUT_DIR", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Set a variable, taking precedence over the environment (repeatable)
    #[clap(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,
}

fn parse_var(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{}'", arg)),
    }
}

/// Load the pipeline file (defaults when it is absent) and apply overrides
///
/// Relative paths resolve against the current directory.
pub fn load_config(path: &Path, overrides: &Overrides) -> OrderflowResult<PipelineConfig> {
    let mut config = if path.exists() {
        PipelineConfig::from_file(path)?
    } else {
        tracing::debug!(path = %path.display(), "no pipeline file, using defaults");
        PipelineConfig::default()
    };

    if let Some(ref source) = overrides.source {
        config.source = source.clone();
    }
    if let Some(ref dir) = overrides.output_dir {
        config.output_dir = dir.clone();
    }

    let cwd = std::env::current_dir()?;
    Ok(config.resolve_paths(&cwd))
}

/// `--var` values first, then environment variables, then the variables file
pub fn build_resolver(
    config: &PipelineConfig,
    vars: &[(String, String)],
) -> OrderflowResult<Arc<dyn VariableResolver>> {
    let mut chain = ChainResolver::new();

    if !vars.is_empty() {
        let overrides = vars
            .iter()
            .fold(MapResolver::new(), |map, (name, value)| map.with(name, value));
        chain = chain.push(overrides);
    }
    chain = chain.push(EnvResolver::new());

    if let Some(ref file) = config.variables_file {
        if file.is_file() {
            let vars = MapResolver::from_json_file(file)?;
            tracing::debug!(count = vars.len(), file = %file.display(), "loaded variables");
            chain = chain.push(vars);
        }
    }

    Ok(Arc::new(chain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_stages() {
        let cli = Cli::parse_from(["orderflow", "run", "-s", "aggregate", "-s", "finalize"]);
        match cli.command {
            Commands::Run { stage, .. } => {
                assert_eq!(stage, vec![StageKind::Aggregate, StageKind::Finalize]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_vars() {
        let cli = Cli::parse_from([
            "orderflow",
            "run",
            "--var",
            "my_email=ops@example.com",
            "--var",
            "note=a=b",
        ]);
        match cli.command {
            Commands::Run { overrides, .. } => assert_eq!(
                overrides.vars,
                vec![
                    ("my_email".to_string(), "ops@example.com".to_string()),
                    ("note".to_string(), "a=b".to_string()),
                ]
            ),
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(Cli::try_parse_from(["orderflow", "run", "--var", "my_email"]).is_err());
        assert!(Cli::try_parse_from(["orderflow", "run", "--var", "=x"]).is_err());
    }

    #[test]
    fn test_cli_vars_take_precedence() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let file = temp_dir.path().join("vars.json");
        std::fs::write(&file, r#"{"region": "south", "team": "ops"}"#).unwrap();
        let config = PipelineConfig {
            variables_file: Some(file),
            ..Default::default()
        };

        let resolver =
            build_resolver(&config, &[("region".to_string(), "north".to_string())]).unwrap();
        assert_eq!(resolver.get("region").as_deref(), Some("north"));
        assert_eq!(resolver.get("team").as_deref(), Some("ops"));
        assert_eq!(resolver.get("absent"), None);
    }

    #[test]
    fn test_unknown_stage_rejected() {
        assert!(Cli::try_parse_from(["orderflow", "run", "-s", "load"]).is_err());
    }
}
