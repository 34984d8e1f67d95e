//! Query engine boundary.
//!
//! The runner only needs three capabilities from the embedded engine: swap
//! the working table for a new dataset, drop it, and execute ad hoc SQL with
//! every result row materialised. [`DuckDbEngine`] provides them on top of an
//! in-process DuckDB connection.

use bench_core::constants::IN_MEMORY_DATABASE;
use duckdb::arrow::array::{Array, Float64Array};
use duckdb::arrow::compute::cast;
use duckdb::arrow::datatypes::DataType;
use duckdb::arrow::record_batch::RecordBatch;
use duckdb::Connection;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Coarse cause of a failed engine call, derived from the engine's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The SQL text did not parse.
    Syntax,
    /// Unknown table, column or field: the dataset lacks the expected schema.
    Binding,
    /// A value could not be converted or was out of range.
    Conversion,
    /// The engine could not read or write a file.
    Io,
    Other,
}

impl FailureKind {
    pub fn classify(message: &str) -> Self {
        const PREFIXES: [(&str, FailureKind); 9] = [
            ("Parser Error", FailureKind::Syntax),
            ("Syntax Error", FailureKind::Syntax),
            ("Binder Error", FailureKind::Binding),
            ("Catalog Error", FailureKind::Binding),
            ("Conversion Error", FailureKind::Conversion),
            ("Invalid Input Error", FailureKind::Conversion),
            ("Out of Range Error", FailureKind::Conversion),
            ("Mismatch Type Error", FailureKind::Conversion),
            ("IO Error", FailureKind::Io),
        ];

        let head = message.trim_start();
        PREFIXES
            .iter()
            .find(|(prefix, _)| head.starts_with(prefix))
            .map(|(_, kind)| *kind)
            .unwrap_or(FailureKind::Other)
    }

    pub fn label(self) -> &'static str {
        match self {
            FailureKind::Syntax => "syntax",
            FailureKind::Binding => "binding",
            FailureKind::Conversion => "conversion",
            FailureKind::Io => "io",
            FailureKind::Other => "other",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct EngineError {
    pub kind: FailureKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<duckdb::Error> for EngineError {
    fn from(e: duckdb::Error) -> Self {
        let message = e.to_string();
        Self {
            kind: FailureKind::classify(&message),
            message,
        }
    }
}

/// Fully materialised result of one query.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    columns: Vec<String>,
    batches: Vec<RecordBatch>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, batches: Vec<RecordBatch>) -> Self {
        Self { columns, batches }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Non-null values of the first projected column as `f64`.
    ///
    /// Returns `None` when there is no column or it cannot be cast to a
    /// float (structs, lists, blobs).
    pub fn first_column_values(&self) -> Option<Vec<f64>> {
        if self.columns.is_empty() {
            return None;
        }

        let mut values = Vec::with_capacity(self.row_count());
        for batch in &self.batches {
            if batch.num_columns() == 0 {
                return None;
            }
            let column = cast(batch.column(0).as_ref(), &DataType::Float64).ok()?;
            let column = column.as_any().downcast_ref::<Float64Array>()?;
            values.extend(column.iter().flatten());
        }
        Some(values)
    }
}

/// Capabilities the benchmark runner needs from an embedded SQL engine.
pub trait QueryEngine {
    /// Drop `table` if it exists, then bulk-load every row of the columnar
    /// file at `dataset` into a new `table`. Returns the number of rows loaded.
    fn replace_table(&mut self, table: &str, dataset: &Path) -> Result<u64, EngineError>;

    /// Drop `table` if it exists.
    fn drop_table(&mut self, table: &str) -> Result<(), EngineError>;

    /// Execute `sql` and materialise every result row.
    fn execute(&mut self, sql: &str) -> Result<ResultSet, EngineError>;
}

/// DuckDB-backed engine.
pub struct DuckDbEngine {
    conn: Connection,
}

impl DuckDbEngine {
    /// Open `location`: `:memory:` for a private in-process catalog, otherwise
    /// a database file path.
    pub fn connect(location: &str) -> Result<Self, EngineError> {
        let conn = if location == IN_MEMORY_DATABASE {
            Connection::open_in_memory()?
        } else {
            Connection::open(location)?
        };
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, EngineError> {
        Self::connect(IN_MEMORY_DATABASE)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn count_rows(&self, table: &str) -> Result<u64, EngineError> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }
}

impl QueryEngine for DuckDbEngine {
    fn replace_table(&mut self, table: &str, dataset: &Path) -> Result<u64, EngineError> {
        self.drop_table(table)?;
        self.conn.execute_batch(&format!(
            "CREATE TABLE {} AS SELECT * FROM read_parquet({})",
            quote_ident(table),
            quote_literal(&dataset.to_string_lossy())
        ))?;
        self.count_rows(table)
    }

    fn drop_table(&mut self, table: &str) -> Result<(), EngineError> {
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))?;
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> Result<ResultSet, EngineError> {
        let mut stmt = self.conn.prepare(sql)?;
        let arrow = stmt.query_arrow([])?;
        let schema = arrow.get_schema();
        let batches: Vec<RecordBatch> = arrow.collect();
        let columns = schema
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect();
        Ok(ResultSet::new(columns, batches))
    }
}

/// Quote an SQL identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote an SQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
