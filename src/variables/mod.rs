// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! Variable store
//!
//! The finalize stage resolves its identity string by name through a
//! [`VariableResolver`]. Resolvers are injected, so tests can hand in an
//! in-memory map while the CLI chains environment and file lookups.

use std::collections::HashMap;
use std::path::Path;

use crate::errors::{OrderflowError, OrderflowResult};

/// Environment prefix for variables
pub const ENV_PREFIX: &str = "ORDERFLOW_VAR_";

/// Named-value lookup
pub trait VariableResolver: Send + Sync {
    /// Look up a variable, `None` if it is not defined here
    fn get(&self, name: &str) -> Option<String>;

    /// Look up a variable or fail with `ConfigMissing`
    fn require(&self, name: &str) -> OrderflowResult<String> {
        self.get(name)
            .ok_or_else(|| OrderflowError::config_missing(name))
    }
}

/// In-memory variables
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    values: HashMap<String, String>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Load a JSON object of string values
    ///
    /// Non-string values are stored in their JSON text form.
    pub fn from_json_file(path: &Path) -> OrderflowResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| OrderflowError::InvalidConfig {
            reason: format!("failed to read variables file {}: {}", path.display(), e),
            help: None,
        })?;

        let parsed: HashMap<String, serde_json::Value> = serde_json::from_str(&content)?;
        let values = parsed
            .into_iter()
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, value)
            })
            .collect();

        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl VariableResolver for MapResolver {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

/// Variables from the process environment, `ORDERFLOW_VAR_<NAME>`
#[derive(Debug, Clone)]
pub struct EnvResolver {
    prefix: String,
}

impl EnvResolver {
    pub fn new() -> Self {
        Self {
            prefix: ENV_PREFIX.to_string(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name.to_uppercase())
    }
}

impl Default for EnvResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableResolver for EnvResolver {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(self.key(name)).ok()
    }
}

/// First resolver that knows the name wins
#[derive(Default)]
pub struct ChainResolver {
    resolvers: Vec<Box<dyn VariableResolver>>,
}

impl ChainResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, resolver: impl VariableResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }
}

impl VariableResolver for ChainResolver {
    fn get(&self, name: &str) -> Option<String> {
        self.resolvers.iter().find_map(|r| r.get(name))
    }
}
