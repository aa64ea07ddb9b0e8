// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! In-memory relation and its CSV form

use rusqlite::types::ValueRef;
use std::fmt::Write as _;

/// A single loosely typed value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Cell {
    /// Text form written to the snapshot
    pub fn render(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Integer(i) => i.to_string(),
            Self::Real(r) if r.is_finite() && r.fract() == 0.0 && r.abs() < 1e16 => {
                format!("{:.1}", r)
            }
            Self::Real(r) => r.to_string(),
            Self::Text(s) => s.clone(),
            Self::Blob(bytes) => bytes.iter().fold(String::new(), |mut out, b| {
                let _ = write!(out, "{:02x}", b);
                out
            }),
        }
    }

    /// Read a field back from the snapshot; empty fields are NULL
    pub fn from_field(field: &str) -> Self {
        if field.is_empty() {
            Self::Null
        } else {
            Self::Text(field.to_string())
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// TEXT values must be valid UTF-8; nothing is replaced on the way in
impl TryFrom<ValueRef<'_>> for Cell {
    type Error = std::str::Utf8Error;

    fn try_from(value: ValueRef<'_>) -> Result<Self, Self::Error> {
        Ok(match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(r) => Self::Real(r),
            ValueRef::Text(t) => Self::Text(std::str::from_utf8(t)?.to_string()),
            ValueRef::Blob(b) => Self::Blob(b.to_vec()),
        })
    }
}

/// A relation: named columns and rows of cells
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Position of a column by exact name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render as header plus one comma-delimited line per row
    pub fn to_csv(&self) -> Result<Vec<u8>, csv::Error> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());

        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(Cell::render))?;
        }

        writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }

    /// Parse a snapshot produced by [`Table::to_csv`]
    pub fn from_csv(data: &[u8]) -> Result<Self, csv::Error> {
        let mut reader = csv::Reader::from_reader(data);

        let columns = reader.headers()?.iter().map(String::from).collect();
        let mut table = Self::new(columns);

        for record in reader.records() {
            let record = record?;
            table.rows.push(record.iter().map(Cell::from_field).collect());
        }

        Ok(table)
    }
}
