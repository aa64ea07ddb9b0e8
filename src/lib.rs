// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! # orderflow - Order Summary Pipeline
//!
//! A three-stage batch job over a Northwind-style SQLite database:
//!
//! - **extract** - snapshot the `Order` relation into `orders.csv`
//! - **aggregate** - join `OrderDetail` against the snapshot, keep orders
//!   shipping to the target city and write the summed quantity to `count.txt`
//! - **finalize** - base64-encode `identity + count` into `final_output.txt`
//!
//! Stages hand off through files only, write atomically, and never retry on
//! their own.
//!
//! ## Quick Start
//!
//! ```bash
//! # Write a default pipeline file
//! orderflow init
//!
//! # Run all stages
//! ORDERFLOW_VAR_MY_EMAIL=ops@example.com orderflow run
//!
//! # Check the result
//! orderflow decode
//! ```

pub mod cli;
pub mod errors;
pub mod pipeline;
pub mod source;
pub mod stages;
pub mod utils;
pub mod variables;

// Re-export commonly used types
pub use errors::{OrderflowError, OrderflowResult};
pub use pipeline::{PipelineConfig, PipelineRunner};
pub use stages::{Aggregator, ArtifactLayout, Extractor, Finalizer, StageKind};
pub use variables::VariableResolver;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
