// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! Extract stage
//!
//! Copies the Order relation into `orders.csv`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{blocking, write_atomic, ArtifactLayout, Stage, StageKind, StageOutput};
use crate::errors::{OrderflowError, OrderflowResult};
use crate::pipeline::PipelineConfig;
use crate::source::SqliteSource;

/// The written snapshot
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
}

/// Extract stage
#[derive(Debug, Clone)]
pub struct Extractor {
    source: PathBuf,
    table: String,
}

impl Extractor {
    pub fn new(source: impl Into<PathBuf>, table: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            table: table.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.source, &config.tables.order)
    }

    /// Snapshot the order relation into the layout
    pub fn run(&self, layout: &ArtifactLayout) -> OrderflowResult<Snapshot> {
        layout.ensure_dir()?;
        self.write_snapshot(&layout.snapshot())
    }

    fn write_snapshot(&self, path: &Path) -> OrderflowResult<Snapshot> {
        let orders = {
            let source = SqliteSource::open(&self.source)?;
            source.read_table(&self.table)?
        };

        let csv = orders
            .to_csv()
            .map_err(|e| OrderflowError::write_error(path, e))?;
        write_atomic(path, &csv)?;

        tracing::info!(
            rows = orders.len(),
            path = %path.display(),
            "extracted '{}'",
            self.table
        );

        Ok(Snapshot {
            path: path.to_path_buf(),
            rows: orders.len(),
            columns: orders.columns.len(),
        })
    }
}

#[async_trait]
impl Stage for Extractor {
    fn kind(&self) -> StageKind {
        StageKind::Extract
    }

    async fn execute(&self, layout: &ArtifactLayout) -> OrderflowResult<StageOutput> {
        let stage = self.clone();
        let layout = layout.clone();
        let snapshot = blocking(move || stage.run(&layout)).await?;

        Ok(StageOutput {
            kind: StageKind::Extract,
            summary: format!("{} rows, {} columns", snapshot.rows, snapshot.columns),
            path: snapshot.path,
        })
    }
}
