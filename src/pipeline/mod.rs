// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! Pipeline configuration and runner
//!
//! This module defines the pipeline file schema, its validation, and the
//! sequential runner that drives the stages.

mod definition;
mod executor;
mod validation;

pub use definition::*;
pub use executor::{ExecutionOptions, PipelineRunner, RunReport, StageFailure, StageRecord};
pub use validation::{PipelineValidator, ValidationResult};
