// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! Aggregate stage
//!
//! Joins OrderDetail (from the database) against the order snapshot (from
//! `orders.csv`, never re-extracted), keeps rows whose order ships to the
//! target city, and writes the summed quantity to `count.txt`.
//!
//! Join keys that do not coerce to an integer are dropped on both sides.
//! This matches the historical behaviour of the job; the number of dropped
//! rows is reported and logged so the loss is at least visible.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::{
    blocking, coerce_key, coerce_quantity, read_input, write_atomic, ArtifactLayout, Stage,
    StageKind, StageOutput,
};
use crate::errors::{OrderflowError, OrderflowResult};
use crate::pipeline::{ColumnNames, PipelineConfig};
use crate::source::{Cell, SqliteSource, Table};

/// Problems with the joined data itself
#[derive(Debug, Error, PartialEq, Eq)]
pub enum JoinError {
    #[error("relation '{relation}' has no column '{column}'")]
    MissingColumn { relation: String, column: String },

    #[error("quantity '{value}' is not a whole number; fractional or non-numeric quantities are rejected, not rounded")]
    BadQuantity { value: String },

    #[error("quantity sum overflowed")]
    Overflow,
}

/// Row accounting for one aggregation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateReport {
    pub detail_rows: usize,
    pub order_rows: usize,
    /// Detail rows whose order reference did not coerce
    pub dropped_detail_keys: usize,
    /// Snapshot rows whose identifier did not coerce
    pub dropped_order_keys: usize,
    /// Rows produced by the inner join
    pub joined_rows: usize,
    /// Joined rows shipping to the target city
    pub matched_rows: usize,
    /// Matched rows with a NULL quantity (contribute nothing)
    pub null_quantities: usize,
    pub total: i64,
}

impl AggregateReport {
    pub fn dropped_rows(&self) -> usize {
        self.dropped_detail_keys + self.dropped_order_keys
    }
}

/// The written aggregate
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub path: PathBuf,
    pub report: AggregateReport,
}

/// Aggregate stage
#[derive(Debug, Clone)]
pub struct Aggregator {
    source: PathBuf,
    detail_table: String,
    order_table: String,
    columns: ColumnNames,
    target_city: String,
}

impl Aggregator {
    pub fn new(source: impl Into<PathBuf>, target_city: impl Into<String>) -> Self {
        let defaults = PipelineConfig::default();
        Self {
            source: source.into(),
            detail_table: defaults.tables.order_detail,
            order_table: defaults.tables.order,
            columns: defaults.columns,
            target_city: target_city.into(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            source: config.source.clone(),
            detail_table: config.tables.order_detail.clone(),
            order_table: config.tables.order.clone(),
            columns: config.columns.clone(),
            target_city: config.target_city.clone(),
        }
    }

    /// Aggregate against a snapshot, writing the result into the layout
    pub fn run(&self, snapshot: &Path, layout: &ArtifactLayout) -> OrderflowResult<Aggregate> {
        // Preconditions before any computation
        let snapshot_bytes = read_input(snapshot, StageKind::Extract.name())?;
        let details = {
            let source = SqliteSource::open(&self.source)?;
            source.read_table(&self.detail_table)?
        };

        let orders = Table::from_csv(&snapshot_bytes)
            .map_err(|e| OrderflowError::malformed(snapshot, e))?;

        let report = sum_shipped_quantity(
            &details,
            &self.detail_table,
            &orders,
            &self.order_table,
            &self.columns,
            &self.target_city,
        )
        .map_err(|e| {
            // Blame whichever input carries the bad data
            let path = match &e {
                JoinError::MissingColumn { relation, .. } if *relation == self.order_table => {
                    snapshot.to_path_buf()
                }
                _ => self.source.clone(),
            };
            OrderflowError::malformed(path, e)
        })?;

        if report.dropped_rows() > 0 {
            tracing::warn!(
                detail_rows = report.dropped_detail_keys,
                order_rows = report.dropped_order_keys,
                "dropped rows with non-integer join keys"
            );
        }

        let path = layout.count();
        write_atomic(&path, report.total.to_string().as_bytes())?;

        tracing::info!(
            total = report.total,
            matched = report.matched_rows,
            city = %self.target_city,
            path = %path.display(),
            "aggregated quantities"
        );

        Ok(Aggregate { path, report })
    }
}

#[async_trait]
impl Stage for Aggregator {
    fn kind(&self) -> StageKind {
        StageKind::Aggregate
    }

    async fn execute(&self, layout: &ArtifactLayout) -> OrderflowResult<StageOutput> {
        let stage = self.clone();
        let layout = layout.clone();
        let aggregate = blocking(move || stage.run(&layout.snapshot(), &layout)).await?;

        let report = &aggregate.report;
        let mut summary = format!("total {} from {} matched rows", report.total, report.matched_rows);
        if report.dropped_rows() > 0 {
            summary.push_str(&format!(", {} dropped", report.dropped_rows()));
        }

        Ok(StageOutput {
            kind: StageKind::Aggregate,
            path: aggregate.path,
            summary,
        })
    }
}

fn column(table: &Table, relation: &str, name: &str) -> Result<usize, JoinError> {
    table
        .column_index(name)
        .ok_or_else(|| JoinError::MissingColumn {
            relation: relation.to_string(),
            column: name.to_string(),
        })
}

/// Inner-join details to orders on the coerced key, filter on the city and
/// sum quantities
///
/// Duplicate order identifiers multiply matches, as a relational join does.
pub fn sum_shipped_quantity(
    details: &Table,
    detail_relation: &str,
    orders: &Table,
    order_relation: &str,
    columns: &ColumnNames,
    target_city: &str,
) -> Result<AggregateReport, JoinError> {
    let order_id = column(orders, order_relation, &columns.order_id)?;
    let ship_city = column(orders, order_relation, &columns.ship_city)?;
    let detail_order_id = column(details, detail_relation, &columns.detail_order_id)?;
    let quantity = column(details, detail_relation, &columns.quantity)?;

    let mut report = AggregateReport {
        detail_rows: details.len(),
        order_rows: orders.len(),
        ..Default::default()
    };

    // id -> (orders with that id, of which ship to the target city)
    let mut by_id: HashMap<i64, (usize, usize)> = HashMap::new();
    for row in &orders.rows {
        let Some(id) = coerce_key(&row[order_id]) else {
            report.dropped_order_keys += 1;
            continue;
        };
        let entry = by_id.entry(id).or_default();
        entry.0 += 1;
        if matches!(&row[ship_city], Cell::Text(city) if city == target_city) {
            entry.1 += 1;
        }
    }

    for row in &details.rows {
        let Some(key) = coerce_key(&row[detail_order_id]) else {
            report.dropped_detail_keys += 1;
            continue;
        };
        let Some(&(joined, matched)) = by_id.get(&key) else {
            continue;
        };

        report.joined_rows += joined;
        if matched == 0 {
            continue;
        }
        report.matched_rows += matched;

        match coerce_quantity(&row[quantity]) {
            Ok(Some(qty)) => {
                let contribution = qty
                    .checked_mul(matched as i64)
                    .ok_or(JoinError::Overflow)?;
                report.total = report
                    .total
                    .checked_add(contribution)
                    .ok_or(JoinError::Overflow)?;
            }
            Ok(None) => report.null_quantities += matched,
            Err(value) => return Err(JoinError::BadQuantity { value }),
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::fixtures::{self, DetailKey};
    use crate::stages::Extractor;
    use tempfile::TempDir;

    const RIO: &str = "Rio de Janeiro";

    fn table(columns: &[&str], rows: Vec<Vec<Cell>>) -> Table {
        Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn orders() -> Table {
        table(
            &["Id", "ShipCity"],
            vec![vec![text("1"), text(RIO)], vec![text("2"), text("Paris")]],
        )
    }

    fn details(rows: Vec<(Cell, Cell)>) -> Table {
        table(
            &["OrderId", "Quantity"],
            rows.into_iter().map(|(k, q)| vec![k, q]).collect(),
        )
    }

    fn sum(details: &Table, orders: &Table) -> Result<AggregateReport, JoinError> {
        sum_shipped_quantity(
            details,
            "OrderDetail",
            orders,
            "Order",
            &ColumnNames::default(),
            RIO,
        )
    }

    #[test]
    fn test_join_filter_sum() {
        let details = details(vec![
            (Cell::Integer(1), Cell::Integer(5)),
            (Cell::Integer(1), Cell::Integer(3)),
            (Cell::Integer(2), Cell::Integer(100)),
        ]);

        let report = sum(&details, &orders()).unwrap();
        assert_eq!(report.total, 8);
        assert_eq!(report.joined_rows, 3);
        assert_eq!(report.matched_rows, 2);
        assert_eq!(report.dropped_rows(), 0);
    }

    #[test]
    fn test_malformed_keys_dropped() {
        let details = details(vec![
            (Cell::Integer(1), Cell::Integer(5)),
            (text("not-a-number"), Cell::Integer(1000)),
            (Cell::Null, Cell::Integer(1000)),
        ]);
        let mut orders = orders();
        orders.rows.push(vec![text("x1"), text(RIO)]);

        let report = sum(&details, &orders).unwrap();
        assert_eq!(report.total, 5);
        assert_eq!(report.dropped_detail_keys, 2);
        assert_eq!(report.dropped_order_keys, 1);
    }

    #[test]
    fn test_no_target_city_is_zero() {
        let orders = table(&["Id", "ShipCity"], vec![vec![text("2"), text("Paris")]]);
        let details = details(vec![(Cell::Integer(2), Cell::Integer(100))]);

        let report = sum(&details, &orders).unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(report.matched_rows, 0);
    }

    #[test]
    fn test_city_match_is_exact() {
        let orders = table(
            &["Id", "ShipCity"],
            vec![
                vec![text("1"), text("rio de janeiro")],
                vec![text("2"), text("Rio de Janeiro ")],
            ],
        );
        let details = details(vec![
            (Cell::Integer(1), Cell::Integer(5)),
            (Cell::Integer(2), Cell::Integer(5)),
        ]);

        assert_eq!(sum(&details, &orders).unwrap().total, 0);
    }

    #[test]
    fn test_duplicate_order_ids_multiply() {
        let mut orders = orders();
        orders.rows.push(vec![text("1.0"), text(RIO)]);
        let details = details(vec![(Cell::Integer(1), Cell::Integer(5))]);

        let report = sum(&details, &orders).unwrap();
        assert_eq!(report.total, 10);
        assert_eq!(report.matched_rows, 2);
    }

    #[test]
    fn test_null_quantity_contributes_nothing() {
        let details = details(vec![
            (Cell::Integer(1), Cell::Null),
            (Cell::Integer(1), Cell::Integer(4)),
        ]);

        let report = sum(&details, &orders()).unwrap();
        assert_eq!(report.total, 4);
        assert_eq!(report.null_quantities, 1);
    }

    #[test]
    fn test_bad_quantity() {
        let details = details(vec![(Cell::Integer(1), text("lots"))]);
        assert_eq!(
            sum(&details, &orders()).unwrap_err(),
            JoinError::BadQuantity {
                value: "lots".into()
            }
        );
    }

    #[test]
    fn test_fractional_keys_truncate_and_join() {
        let orders = table(&["Id", "ShipCity"], vec![vec![text("7"), text(RIO)]]);
        let details = details(vec![
            (Cell::Real(7.5), Cell::Integer(4)),
            (text("7.9"), Cell::Integer(2)),
        ]);

        let report = sum(&details, &orders).unwrap();
        assert_eq!(report.total, 6);
        assert_eq!(report.matched_rows, 2);
        assert_eq!(report.dropped_detail_keys, 0);
    }

    #[test]
    fn test_fractional_quantity_rejected() {
        let details = details(vec![(Cell::Integer(1), Cell::Real(2.5))]);
        let err = sum(&details, &orders()).unwrap_err();
        assert_eq!(
            err,
            JoinError::BadQuantity {
                value: "2.5".into()
            }
        );
        assert!(err.to_string().contains("rejected, not rounded"));
    }

    #[test]
    fn test_missing_column() {
        let orders = table(&["Id", "City"], vec![]);
        let err = sum(&details(vec![]), &orders).unwrap_err();
        assert_eq!(
            err,
            JoinError::MissingColumn {
                relation: "Order".into(),
                column: "ShipCity".into()
            }
        );
    }

    #[test]
    fn test_run_after_extract() {
        let temp_dir = TempDir::new().unwrap();
        let db = fixtures::create_db(
            temp_dir.path(),
            &[(1, RIO), (2, "Paris")],
            &[
                (DetailKey::Int(1), 5),
                (DetailKey::Text("1"), 3),
                (DetailKey::Text("bogus"), 50),
                (DetailKey::Null, 50),
                (DetailKey::Int(2), 100),
            ],
        );
        let layout = ArtifactLayout::new(temp_dir.path().join("outputs"));
        let snapshot = Extractor::new(&db, "Order").run(&layout).unwrap();

        let aggregate = Aggregator::new(&db, RIO).run(&snapshot.path, &layout).unwrap();

        assert_eq!(aggregate.report.total, 8);
        assert_eq!(aggregate.report.dropped_detail_keys, 2);
        assert_eq!(std::fs::read_to_string(layout.count()).unwrap(), "8");
    }

    #[test]
    fn test_run_without_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let db = fixtures::rio_and_paris(temp_dir.path());
        let layout = ArtifactLayout::new(temp_dir.path().join("outputs"));

        let err = Aggregator::new(&db, RIO)
            .run(&layout.snapshot(), &layout)
            .unwrap_err();

        assert!(matches!(err, OrderflowError::InputMissing { .. }));
        assert!(!layout.count().exists());
    }

    #[test]
    fn test_run_without_source() {
        let temp_dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(temp_dir.path());
        std::fs::write(layout.snapshot(), "Id,ShipCity\n1,Rio de Janeiro\n").unwrap();

        let err = Aggregator::new(temp_dir.path().join("absent.sqlite"), RIO)
            .run(&layout.snapshot(), &layout)
            .unwrap_err();

        assert!(matches!(err, OrderflowError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_snapshot_without_city_column() {
        let temp_dir = TempDir::new().unwrap();
        let db = fixtures::rio_and_paris(temp_dir.path());
        let layout = ArtifactLayout::new(temp_dir.path());
        std::fs::write(layout.snapshot(), "Id,City\n1,Rio de Janeiro\n").unwrap();

        let err = Aggregator::new(&db, RIO)
            .run(&layout.snapshot(), &layout)
            .unwrap_err();

        match err {
            OrderflowError::MalformedInput { path, .. } => assert_eq!(path, layout.snapshot()),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
