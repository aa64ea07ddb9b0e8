// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! Finalize stage
//!
//! Prefixes the aggregate with the identity string and writes the base64 of
//! the combination to `final_output.txt`.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{blocking, read_input, write_atomic, ArtifactLayout, Stage, StageKind, StageOutput};
use crate::errors::{OrderflowError, OrderflowResult};
use crate::pipeline::PipelineConfig;
use crate::variables::VariableResolver;

/// The written final artifact
#[derive(Debug, Clone)]
pub struct FinalArtifact {
    pub path: PathBuf,
    pub encoded: String,
}

/// Finalize stage
#[derive(Clone)]
pub struct Finalizer {
    resolver: Arc<dyn VariableResolver>,
    identity_variable: String,
}

impl Finalizer {
    pub fn new(resolver: Arc<dyn VariableResolver>, identity_variable: impl Into<String>) -> Self {
        Self {
            resolver,
            identity_variable: identity_variable.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig, resolver: Arc<dyn VariableResolver>) -> Self {
        Self::new(resolver, &config.identity_variable)
    }

    /// Encode `identity + aggregate` into the layout
    pub fn run(&self, aggregate: &Path, layout: &ArtifactLayout) -> OrderflowResult<FinalArtifact> {
        let raw = read_input(aggregate, StageKind::Aggregate.name())?;
        let count = String::from_utf8(raw)
            .map_err(|e| OrderflowError::malformed(aggregate, e))?;
        let count = count.trim();

        if count.parse::<i64>().is_err() {
            return Err(OrderflowError::malformed(
                aggregate,
                format!("'{}' is not a decimal integer", count),
            ));
        }

        let identity = self.resolver.require(&self.identity_variable)?;
        let encoded = encode(&identity, count);

        let path = layout.final_output();
        write_atomic(&path, encoded.as_bytes())?;

        tracing::info!(path = %path.display(), "wrote final artifact");

        Ok(FinalArtifact { path, encoded })
    }
}

impl std::fmt::Debug for Finalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Finalizer")
            .field("identity_variable", &self.identity_variable)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Stage for Finalizer {
    fn kind(&self) -> StageKind {
        StageKind::Finalize
    }

    async fn execute(&self, layout: &ArtifactLayout) -> OrderflowResult<StageOutput> {
        let stage = self.clone();
        let layout = layout.clone();
        let artifact = blocking(move || stage.run(&layout.count(), &layout)).await?;

        Ok(StageOutput {
            kind: StageKind::Finalize,
            summary: format!("{} base64 chars", artifact.encoded.len()),
            path: artifact.path,
        })
    }
}

/// Base64 of `identity` immediately followed by `count`
pub fn encode(identity: &str, count: &str) -> String {
    let mut message = String::with_capacity(identity.len() + count.len());
    message.push_str(identity);
    message.push_str(count);
    STANDARD.encode(message.as_bytes())
}

/// Inverse of [`encode`]: the plain `identity + count` text
pub fn decode(encoded: &str) -> OrderflowResult<String> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| OrderflowError::malformed("<final artifact>", e))?;
    String::from_utf8(bytes).map_err(|e| OrderflowError::malformed("<final artifact>", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variables::MapResolver;
    use tempfile::TempDir;

    fn finalizer(vars: MapResolver) -> Finalizer {
        Finalizer::new(Arc::new(vars), "my_email")
    }

    #[test]
    fn test_encode_known_value() {
        // "a@b.c8"
        assert_eq!(encode("a@b.c", "8"), "YUBiLmM4");
        assert_eq!(decode("YUBiLmM4").unwrap(), "a@b.c8");
    }

    #[test]
    fn test_decode_reproduces_concatenation() {
        let cases = [("ops@example.com", "0"), ("", "123456789"), ("x y,z", "42")];
        for (identity, count) in cases {
            let decoded = decode(&encode(identity, count)).unwrap();
            assert_eq!(decoded, format!("{}{}", identity, count));
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode("not base64!"),
            Err(OrderflowError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_run_writes_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(temp_dir.path());
        std::fs::write(layout.count(), "8\n").unwrap();

        let vars = MapResolver::new().with("my_email", "ops@example.com");
        let artifact = finalizer(vars).run(&layout.count(), &layout).unwrap();

        let written = std::fs::read_to_string(layout.final_output()).unwrap();
        assert_eq!(written, artifact.encoded);
        assert!(!written.ends_with('\n'));
        assert_eq!(decode(&written).unwrap(), "ops@example.com8");
    }

    #[test]
    fn test_missing_count() {
        let temp_dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(temp_dir.path());

        let vars = MapResolver::new().with("my_email", "ops@example.com");
        let err = finalizer(vars).run(&layout.count(), &layout).unwrap_err();
        assert!(matches!(err, OrderflowError::InputMissing { .. }));
    }

    #[test]
    fn test_empty_count() {
        let temp_dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(temp_dir.path());
        std::fs::write(layout.count(), "").unwrap();

        let vars = MapResolver::new().with("my_email", "ops@example.com");
        let err = finalizer(vars).run(&layout.count(), &layout).unwrap_err();
        assert!(matches!(err, OrderflowError::InputMissing { .. }));
    }

    #[test]
    fn test_missing_identity() {
        let temp_dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(temp_dir.path());
        std::fs::write(layout.count(), "8").unwrap();

        let err = finalizer(MapResolver::new())
            .run(&layout.count(), &layout)
            .unwrap_err();

        assert!(matches!(err, OrderflowError::ConfigMissing { .. }));
        assert!(!layout.final_output().exists());
    }

    #[test]
    fn test_non_numeric_count() {
        let temp_dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(temp_dir.path());
        std::fs::write(layout.count(), "8.0").unwrap();

        let vars = MapResolver::new().with("my_email", "ops@example.com");
        let err = finalizer(vars).run(&layout.count(), &layout).unwrap_err();
        assert!(matches!(err, OrderflowError::MalformedInput { .. }));
    }
}
