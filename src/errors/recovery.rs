// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! Recovery suggestions printed after a failed run

use super::OrderflowError;

/// A recovery suggestion with concrete steps
#[derive(Debug, Clone)]
pub struct RecoverySuggestion {
    /// Brief description of what to do
    pub action: String,
    /// Detailed steps
    pub steps: Vec<String>,
    /// Commands to run
    pub commands: Vec<String>,
    /// Whether re-running the same stage can succeed without operator action
    pub retryable: bool,
}

impl RecoverySuggestion {
    /// Pick a suggestion for an error, if one applies
    pub fn for_error(error: &OrderflowError) -> Option<Self> {
        match error {
            OrderflowError::SourceUnavailable { path, .. } => Some(Self::check_source(path)),
            OrderflowError::InputMissing { path, .. } => Some(Self::run_upstream(path)),
            OrderflowError::ConfigMissing { name, env_suffix } => {
                Some(Self::set_variable(name, env_suffix))
            }
            OrderflowError::PipelineNotFound { .. } => Some(Self::create_pipeline()),
            OrderflowError::MalformedInput { path, .. } => Some(Self {
                action: "Inspect the malformed input".into(),
                steps: vec![
                    format!("Offending file: {}", path.display()),
                    "Re-running the same stage on the same input fails the same way".into(),
                ],
                commands: vec![],
                retryable: false,
            }),
            OrderflowError::WriteError { path, .. } => Some(Self {
                action: "Make the output directory writable".into(),
                steps: vec![format!("Could not write {}", path.display())],
                commands: vec![],
                retryable: true,
            }),
            _ => None,
        }
    }

    /// Whether the runner should re-invoke a stage that failed with `error`
    ///
    /// Errors without a suggestion are treated as transient.
    pub fn is_retryable(error: &OrderflowError) -> bool {
        Self::for_error(error).map_or(true, |s| s.retryable)
    }

    /// Suggest checking the relational source
    pub fn check_source(path: &std::path::Path) -> Self {
        Self {
            action: "Check the relational source".into(),
            steps: vec![
                format!("Database file: {}", path.display()),
                "The file must exist and contain the Order and OrderDetail tables".into(),
            ],
            commands: vec![
                "# List tables:".into(),
                format!("sqlite3 {} .tables", path.display()),
            ],
            retryable: true,
        }
    }

    /// Suggest running the stages that produce a missing artifact
    pub fn run_upstream(path: &std::path::Path) -> Self {
        Self {
            action: "Run the upstream stages first".into(),
            steps: vec![format!("Expected artifact: {}", path.display())],
            commands: vec!["orderflow run".into()],
            retryable: false,
        }
    }

    /// Suggest providing a variable
    pub fn set_variable(name: &str, env_suffix: &str) -> Self {
        Self {
            action: format!("Provide the '{}' variable", name),
            steps: vec![
                "Variables are resolved from the environment, then the variables file".into(),
            ],
            commands: vec![
                format!("export ORDERFLOW_VAR_{}=<value>", env_suffix),
                "".into(),
                "# Or in the variables file:".into(),
                format!("{{\"{}\": \"<value>\"}}", name),
            ],
            retryable: false,
        }
    }

    /// Suggest creating a pipeline file
    pub fn create_pipeline() -> Self {
        Self {
            action: "Create a pipeline configuration".into(),
            steps: vec!["No .orderflow.yaml found in current directory".into()],
            commands: vec!["orderflow init".into()],
            retryable: false,
        }
    }
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "→ {}", self.action)?;

        for step in &self.steps {
            writeln!(f, "  {}", step)?;
        }

        if !self.commands.is_empty() {
            writeln!(f)?;
            for cmd in &self.commands {
                writeln!(f, "  {}", cmd)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestion_for_missing_variable() {
        let err = OrderflowError::config_missing("my_email");
        let suggestion = RecoverySuggestion::for_error(&err).unwrap();
        let text = suggestion.to_string();
        assert!(text.contains("ORDERFLOW_VAR_MY_EMAIL"));
        assert!(!suggestion.retryable);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(RecoverySuggestion::is_retryable(
            &OrderflowError::source_unavailable("db.sqlite", "locked")
        ));
        assert!(RecoverySuggestion::is_retryable(&OrderflowError::Io {
            message: "interrupted".into()
        }));
        assert!(!RecoverySuggestion::is_retryable(
            &OrderflowError::config_missing("my_email")
        ));
        assert!(!RecoverySuggestion::is_retryable(
            &OrderflowError::input_missing("outputs/count.txt", "aggregate")
        ));
        assert!(!RecoverySuggestion::is_retryable(&OrderflowError::malformed(
            "outputs/count.txt",
            "not a number"
        )));
    }

    #[test]
    fn test_no_suggestion_for_yaml_error() {
        let err = OrderflowError::Yaml {
            message: "bad".into(),
        };
        assert!(RecoverySuggestion::for_error(&err).is_none());
    }
}
