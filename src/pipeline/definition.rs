// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! Pipeline definition structures
//!
//! Defines the schema for .orderflow.yaml files. Every key has a default,
//! so an empty file describes the stock Northwind job.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{OrderflowError, OrderflowResult};

/// Default pipeline file name
pub const DEFAULT_PIPELINE_FILE: &str = ".orderflow.yaml";

/// Pipeline definition from .orderflow.yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// SQLite database holding the Order and OrderDetail tables
    pub source: PathBuf,

    /// Directory receiving every artifact
    pub output_dir: PathBuf,

    /// Shipping city the aggregate is filtered on (exact match)
    pub target_city: String,

    /// Variable name resolved into the identity string
    pub identity_variable: String,

    /// Optional JSON object of variables
    pub variables_file: Option<PathBuf>,

    /// Relation names
    pub tables: TableNames,

    /// Column names used by the join
    pub columns: ColumnNames,

    /// Retry policy applied by the runner around each stage
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "orders-summary".to_string(),
            source: PathBuf::from("data/Northwind_small.sqlite"),
            output_dir: PathBuf::from("outputs"),
            target_city: "Rio de Janeiro".to_string(),
            identity_variable: "my_email".to_string(),
            variables_file: None,
            tables: TableNames::default(),
            columns: ColumnNames::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Load pipeline from a YAML file
    pub fn from_file(path: &Path) -> OrderflowResult<Self> {
        if !path.exists() {
            return Err(OrderflowError::PipelineNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| OrderflowError::InvalidConfig {
            reason: format!("failed to read {}: {}", path.display(), e),
            help: None,
        })?;

        Self::from_yaml(&content)
    }

    /// Parse pipeline from YAML string
    pub fn from_yaml(yaml: &str) -> OrderflowResult<Self> {
        // serde_yaml rejects an empty document for a struct
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(Into::into)
    }

    /// Serialize pipeline to YAML
    pub fn to_yaml(&self) -> OrderflowResult<String> {
        serde_yaml::to_string(self).map_err(Into::into)
    }

    /// Resolve relative paths against a base directory
    pub fn resolve_paths(mut self, base_dir: &Path) -> Self {
        if self.source.is_relative() {
            self.source = base_dir.join(&self.source);
        }
        if self.output_dir.is_relative() {
            self.output_dir = base_dir.join(&self.output_dir);
        }
        if let Some(file) = self.variables_file.take() {
            self.variables_file = Some(if file.is_relative() {
                base_dir.join(file)
            } else {
                file
            });
        }
        self
    }
}

/// Relation names in the source database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub order: String,
    pub order_detail: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            order: "Order".to_string(),
            order_detail: "OrderDetail".to_string(),
        }
    }
}

/// Columns the aggregate reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    /// Order identifier in the snapshot
    pub order_id: String,
    /// Shipping city in the snapshot
    pub ship_city: String,
    /// Order reference on detail rows
    pub detail_order_id: String,
    /// Quantity on detail rows
    pub quantity: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            order_id: "Id".to_string(),
            ship_city: "ShipCity".to_string(),
            detail_order_id: "OrderId".to_string(),
            quantity: "Quantity".to_string(),
        }
    }
}

/// How often the runner re-invokes a failed stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure
    pub retries: u32,
    /// Delay between attempts
    pub delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 1,
            delay_secs: 300,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            retries: 0,
            delay_secs: 0,
        }
    }

    pub fn delay(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.delay_secs)
    }
}
