// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! orderflow - order summary pipeline
//!
//! Extract orders, aggregate shipped quantities, emit an encoded summary.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orderflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "orderflow=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Init { force } => orderflow::cli::init::run(force, cli.verbose).await,
        Commands::Run {
            config,
            stage,
            dry_run,
            overrides,
        } => orderflow::cli::run::run(config, stage, dry_run, overrides, cli.verbose).await,
        Commands::Validate { config } => orderflow::cli::validate::run(config, cli.verbose).await,
        Commands::Decode { file, config } => {
            orderflow::cli::decode::run(file, config, cli.verbose).await
        }
    }
}
