// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! Pipeline validation
//!
//! Validates pipeline configuration before execution.

use crate::pipeline::PipelineConfig;
use crate::stages::ArtifactLayout;
use crate::variables::VariableResolver;

/// Pipeline validator
pub struct PipelineValidator;

impl PipelineValidator {
    /// Validate a pipeline configuration
    pub fn validate(config: &PipelineConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        if config.target_city.is_empty() {
            result.add_error("target_city is empty; no order could ever match");
        } else if config.target_city.trim() != config.target_city {
            result.add_warning(&format!(
                "target_city '{}' has surrounding whitespace; matching is exact",
                config.target_city
            ));
        }

        if config.identity_variable.trim().is_empty() {
            result.add_error("identity_variable is empty");
        }

        let names = [
            ("tables.order", &config.tables.order),
            ("tables.order_detail", &config.tables.order_detail),
            ("columns.order_id", &config.columns.order_id),
            ("columns.ship_city", &config.columns.ship_city),
            ("columns.detail_order_id", &config.columns.detail_order_id),
            ("columns.quantity", &config.columns.quantity),
        ];
        for (key, value) in names {
            if value.is_empty() {
                result.add_error(&format!("{} is empty", key));
            }
        }

        if config.output_dir.as_os_str().is_empty() {
            result.add_error("output_dir is empty");
        } else {
            let layout = ArtifactLayout::new(&config.output_dir);
            if layout.snapshot() == config.source
                || layout.count() == config.source
                || layout.final_output() == config.source
            {
                result.add_error("source database would be overwritten by a pipeline artifact");
            }
        }

        result
    }

    /// Check files and variables the run will need (runtime validation)
    pub fn validate_environment(
        config: &PipelineConfig,
        resolver: &dyn VariableResolver,
    ) -> ValidationResult {
        let mut result = ValidationResult::new();

        if !config.source.is_file() {
            result.add_warning(&format!(
                "Source database not found: {}",
                config.source.display()
            ));
        }

        if let Some(ref file) = config.variables_file {
            if !file.is_file() {
                result.add_warning(&format!("Variables file not found: {}", file.display()));
            }
        }

        if resolver.get(&config.identity_variable).is_none() {
            result.add_warning(&format!(
                "Variable '{}' is not set; the finalize stage will fail",
                config.identity_variable
            ));
        }

        result
    }
}

/// Result of pipeline validation
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    pub fn add_warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
    }

    /// Fold another result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::MapResolver;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        let result = PipelineValidator::validate(&PipelineConfig::default());
        assert!(result.is_valid());
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_empty_fields() {
        let mut config = PipelineConfig::default();
        config.target_city = String::new();
        config.columns.quantity = String::new();

        let result = PipelineValidator::validate(&config);
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.contains("target_city")));
        assert!(result.errors.iter().any(|e| e.contains("columns.quantity")));
    }

    #[test]
    fn test_padded_city_warns() {
        let mut config = PipelineConfig::default();
        config.target_city = " Rio de Janeiro".into();

        let result = PipelineValidator::validate(&config);
        assert!(result.is_valid());
        assert!(result.warnings[0].contains("exact"));
    }

    #[test]
    fn test_source_clobbered_by_artifact() {
        let mut config = PipelineConfig::default();
        config.output_dir = PathBuf::from("data");
        config.source = PathBuf::from("data/count.txt");

        let result = PipelineValidator::validate(&config);
        assert!(result.errors.iter().any(|e| e.contains("overwritten")));
    }

    #[test]
    fn test_environment_warnings() {
        let mut config = PipelineConfig::default();
        config.source = PathBuf::from("/nonexistent/db.sqlite");

        let result = PipelineValidator::validate_environment(&config, &MapResolver::new());
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 2);

        let vars = MapResolver::new().with("my_email", "ops@example.com");
        let result = PipelineValidator::validate_environment(&config, &vars);
        assert_eq!(result.warnings.len(), 1);
    }
}
