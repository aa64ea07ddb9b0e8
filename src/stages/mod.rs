// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! Pipeline stages
//!
//! Three stages run strictly in order, handing off through files:
//!
//! ```text
//! extract ──orders.csv──▶ aggregate ──count.txt──▶ finalize ──▶ final_output.txt
//! ```
//!
//! Each stage has a synchronous, typed entry point (`run`) taking its
//! resolved input and returning its output, plus a [`Stage`] impl the
//! runner drives.

mod aggregate;
mod artifact;
mod coerce;
mod extract;
mod finalize;

pub use aggregate::{sum_shipped_quantity, Aggregate, AggregateReport, Aggregator, JoinError};
pub use artifact::{
    digest, read_input, write_atomic, ArtifactLayout, COUNT_FILE, FINAL_FILE, SNAPSHOT_FILE,
};
pub use coerce::{coerce_key, coerce_quantity};
pub use extract::{Extractor, Snapshot};
pub use finalize::{decode, encode, FinalArtifact, Finalizer};

use async_trait::async_trait;
use std::path::PathBuf;

use crate::errors::{OrderflowError, OrderflowResult};

/// The three stages, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    Extract,
    Aggregate,
    Finalize,
}

impl StageKind {
    /// Every stage in execution order
    pub const ALL: [StageKind; 3] = [Self::Extract, Self::Aggregate, Self::Finalize];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Extract => "extract",
            Self::Aggregate => "aggregate",
            Self::Finalize => "finalize",
        }
    }

    /// Artifact file this stage writes
    pub fn output_file(&self) -> &'static str {
        match self {
            Self::Extract => SNAPSHOT_FILE,
            Self::Aggregate => COUNT_FILE,
            Self::Finalize => FINAL_FILE,
        }
    }

    /// Stage whose artifact this stage consumes
    pub fn upstream(&self) -> Option<StageKind> {
        match self {
            Self::Extract => None,
            Self::Aggregate => Some(Self::Extract),
            Self::Finalize => Some(Self::Aggregate),
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for StageKind {
    type Err = OrderflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "extract" => Ok(Self::Extract),
            "aggregate" => Ok(Self::Aggregate),
            "finalize" => Ok(Self::Finalize),
            _ => Err(OrderflowError::UnknownStage {
                name: s.to_string(),
            }),
        }
    }
}

/// What a stage produced
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub kind: StageKind,
    /// Artifact written
    pub path: PathBuf,
    /// One-line human summary
    pub summary: String,
}

/// A runnable stage
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    /// Run the stage against a layout, reading its input from the layout
    async fn execute(&self, layout: &ArtifactLayout) -> OrderflowResult<StageOutput>;
}

/// Run blocking stage work off the async runtime
pub(crate) async fn blocking<T, F>(work: F) -> OrderflowResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> OrderflowResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| OrderflowError::Io {
            message: format!("stage task aborted: {}", e),
        })?
}
