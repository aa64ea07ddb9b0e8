// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! Relational source
//!
//! A read-only SQLite handle. Each stage that needs the database opens its
//! own [`SqliteSource`] and drops it before returning; no connection
//! outlives a stage.

mod table;

pub use table::{Cell, Table};

use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

use crate::errors::{OrderflowError, OrderflowResult};

/// Read-only connection to a SQLite database file
pub struct SqliteSource {
    path: PathBuf,
    conn: Connection,
}

impl SqliteSource {
    /// Open a database file read-only
    pub fn open(path: &Path) -> OrderflowResult<Self> {
        if !path.is_file() {
            return Err(OrderflowError::source_unavailable(
                path,
                "database file does not exist",
            ));
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)
            .map_err(|e| OrderflowError::source_unavailable(path, e))?;

        // Opening is lazy; touch the schema so a corrupt file fails here
        conn.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0))
            .map_err(|e| OrderflowError::source_unavailable(path, e))?;

        tracing::debug!(path = %path.display(), "opened relational source");

        Ok(Self {
            path: path.to_path_buf(),
            conn,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every row of a relation, columns in declaration order
    pub fn read_table(&self, name: &str) -> OrderflowResult<Table> {
        let sql = format!("SELECT * FROM {}", quote_identifier(name));
        tracing::debug!(%sql, "querying relation");

        let unavailable = |e: rusqlite::Error| {
            OrderflowError::source_unavailable(&self.path, format!("relation '{}': {}", name, e))
        };

        let mut stmt = self.conn.prepare(&sql).map_err(unavailable)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();
        let mut table = Table::new(columns);

        let mut rows = stmt.query([]).map_err(unavailable)?;
        while let Some(row) = rows.next().map_err(unavailable)? {
            let mut cells = Vec::with_capacity(width);
            for (i, column) in table.columns.iter().enumerate() {
                let cell = Cell::try_from(row.get_ref(i).map_err(unavailable)?).map_err(|e| {
                    OrderflowError::source_unavailable(
                        &self.path,
                        format!(
                            "relation '{}', column '{}', row {}: invalid UTF-8 text ({})",
                            name,
                            column,
                            table.rows.len() + 1,
                            e
                        ),
                    )
                })?;
                cells.push(cell);
            }
            table.rows.push(cells);
        }

        Ok(table)
    }
}

/// Quote an SQL identifier; `Order` is a keyword, so every name is quoted
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
