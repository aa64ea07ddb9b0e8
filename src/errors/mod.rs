// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! Error types for the order pipeline
//!
//! Every stage failure maps onto one variant here. Stages never retry on
//! their own; errors propagate to the runner, which decides whether to
//! re-invoke the stage.

mod recovery;

pub use recovery::RecoverySuggestion;

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for orderflow operations
pub type OrderflowResult<T> = Result<T, OrderflowError>;

/// Main error type for orderflow
#[derive(Error, Debug, Diagnostic)]
pub enum OrderflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Stage Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Relational source '{path}' is unavailable: {reason}")]
    #[diagnostic(
        code(orderflow::source_unavailable),
        help("Check that the database file exists, is readable and contains the expected tables")
    )]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("Input artifact missing: {path}")]
    #[diagnostic(code(orderflow::input_missing))]
    InputMissing {
        path: PathBuf,
        #[help]
        help: Option<String>,
    },

    #[error("Failed to write artifact '{path}': {error}")]
    #[diagnostic(
        code(orderflow::write_error),
        help("Check permissions and free space for the output directory")
    )]
    WriteError { path: PathBuf, error: String },

    #[error("Configuration value '{name}' could not be resolved")]
    #[diagnostic(
        code(orderflow::config_missing),
        help("Set ORDERFLOW_VAR_{env_suffix} or add '{name}' to the variables file")
    )]
    ConfigMissing { name: String, env_suffix: String },

    #[error("Malformed input in '{path}': {reason}")]
    #[diagnostic(code(orderflow::malformed_input))]
    MalformedInput { path: PathBuf, reason: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Pipeline file not found: {path}")]
    #[diagnostic(
        code(orderflow::pipeline_not_found),
        help("Create one with 'orderflow init'")
    )]
    PipelineNotFound { path: PathBuf },

    #[error("Invalid pipeline configuration: {reason}")]
    #[diagnostic(code(orderflow::invalid_config))]
    InvalidConfig {
        reason: String,
        #[help]
        help: Option<String>,
    },

    #[error("Unknown stage '{name}'")]
    #[diagnostic(
        code(orderflow::unknown_stage),
        help("Available stages: extract, aggregate, finalize")
    )]
    UnknownStage { name: String },

    // ─────────────────────────────────────────────────────────────────────────
    // IO/System Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("IO error: {message}")]
    #[diagnostic(code(orderflow::io_error))]
    Io { message: String },

    #[error("YAML parsing error: {message}")]
    #[diagnostic(code(orderflow::yaml_error))]
    Yaml { message: String },

    #[error("JSON parsing error: {message}")]
    #[diagnostic(code(orderflow::json_error))]
    Json { message: String },
}

impl From<std::io::Error> for OrderflowError {
    fn from(e: std::io::Error) -> Self {
        Self::Io { message: e.to_string() }
    }
}

impl From<serde_yaml::Error> for OrderflowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml { message: e.to_string() }
    }
}

impl From<serde_json::Error> for OrderflowError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json { message: e.to_string() }
    }
}

impl OrderflowError {
    /// Source could not be opened or queried
    pub fn source_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Upstream artifact is absent or empty, naming the stage that produces it
    pub fn input_missing(path: impl Into<PathBuf>, producer: &str) -> Self {
        Self::InputMissing {
            path: path.into(),
            help: Some(format!(
                "This file is produced by the '{}' stage. Run it first.",
                producer
            )),
        }
    }

    pub fn write_error(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::WriteError {
            path: path.into(),
            error: error.to_string(),
        }
    }

    /// Variable lookup failed
    pub fn config_missing(name: &str) -> Self {
        Self::ConfigMissing {
            name: name.to_string(),
            env_suffix: name.to_uppercase(),
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::MalformedInput {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Short machine-friendly name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "SourceUnavailable",
            Self::InputMissing { .. } => "InputMissing",
            Self::WriteError { .. } => "WriteError",
            Self::ConfigMissing { .. } => "ConfigMissing",
            Self::MalformedInput { .. } => "MalformedInput",
            Self::PipelineNotFound { .. } => "PipelineNotFound",
            Self::InvalidConfig { .. } => "InvalidConfig",
            Self::UnknownStage { .. } => "UnknownStage",
            Self::Io { .. } => "Io",
            Self::Yaml { .. } => "Yaml",
            Self::Json { .. } => "Json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_missing_names_producer() {
        let err = OrderflowError::input_missing("outputs/orders.csv", "extract");
        match err {
            OrderflowError::InputMissing { help, .. } => {
                assert!(help.unwrap().contains("'extract'"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_config_missing_env_hint() {
        let err = OrderflowError::config_missing("my_email");
        assert_eq!(err.kind(), "ConfigMissing");
        assert_eq!(
            err.to_string(),
            "Configuration value 'my_email' could not be resolved"
        );
    }
}
