//! Row sinks: batched writers into a database table or a delimited file.

use crate::client::DbScope;
use crate::error::{Result, TransferError};
use crate::schema::ColumnSpec;
use crate::value::Row;
use async_trait::async_trait;
use clickhouse::sql::Identifier;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// A batched, durable consumer of rows.
///
/// `prepare` is called once with the destination schema before any write;
/// `write_batch` returns the acknowledged row count; `finalize` flushes.
/// A failed write aborts the sink with no retry and no rollback of batches
/// already acknowledged.
#[async_trait]
pub trait RowSink: Send {
    /// Create or open the destination for the given schema.
    async fn prepare(&mut self, schema: &[ColumnSpec]) -> Result<()>;

    /// Durably write one batch, returning the acknowledged row count.
    async fn write_batch(&mut self, rows: &[Row]) -> Result<u64>;

    /// Flush and release the destination.
    async fn finalize(&mut self) -> Result<()>;
}

/// Writes batches into a ClickHouse table, creating it if absent.
///
/// Every destination column is declared `String` regardless of the source
/// schema. This mirrors the write-through behavior the tool has always had
/// for file imports; stronger typing on the destination is an explicit
/// opt-in left to the operator's own DDL.
pub struct DbRowSink<'a> {
    scope: &'a DbScope,
    table: String,
    columns: Vec<String>,
    rows_written: u64,
}

impl<'a> DbRowSink<'a> {
    pub fn new(scope: &'a DbScope, table: impl Into<String>) -> Self {
        Self {
            scope,
            table: table.into(),
            columns: Vec::new(),
            rows_written: 0,
        }
    }

    /// `CREATE TABLE IF NOT EXISTS ? (? String, ...)` with identifier binds.
    fn create_table_sql(column_count: usize) -> String {
        let defs = vec!["? String"; column_count].join(", ");
        format!(
            "CREATE TABLE IF NOT EXISTS ? ({}) ENGINE = MergeTree() ORDER BY tuple()",
            defs
        )
    }

    /// `INSERT INTO ? (?, ...) VALUES (?, ...), ...` with one value
    /// placeholder per cell.
    fn insert_sql(column_count: usize, row_count: usize) -> String {
        let cols = vec!["?"; column_count].join(", ");
        let row = format!("({})", vec!["?"; column_count].join(", "));
        let values = vec![row; row_count].join(", ");
        format!("INSERT INTO ? ({}) VALUES {}", cols, values)
    }
}

#[async_trait]
impl RowSink for DbRowSink<'_> {
    async fn prepare(&mut self, schema: &[ColumnSpec]) -> Result<()> {
        if schema.is_empty() {
            return Err(TransferError::schema(format!(
                "cannot create table {} with no columns",
                self.table
            )));
        }

        let sql = Self::create_table_sql(schema.len());
        let mut query = self.scope.client().query(&sql);
        query = query.bind(Identifier(&self.table));
        for column in schema {
            query = query.bind(Identifier(&column.name));
        }
        query.execute().await.map_err(|e| {
            TransferError::schema(format!("CREATE TABLE {} failed: {}", self.table, e))
        })?;

        self.columns = schema.iter().map(|c| c.name.clone()).collect();
        info!(
            "Prepared table {} ({} String columns)",
            self.table,
            self.columns.len()
        );
        Ok(())
    }

    async fn write_batch(&mut self, rows: &[Row]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        if self.columns.is_empty() {
            return Err(TransferError::write("sink was not prepared"));
        }

        for row in rows {
            if row.len() != self.columns.len() {
                return Err(TransferError::write(format!(
                    "row arity {} does not match table {} with {} columns",
                    row.len(),
                    self.table,
                    self.columns.len()
                )));
            }
        }

        // One bulk insert per batch; the HTTP insert either applies the
        // whole statement or fails it.
        let fields: Vec<String> = rows
            .iter()
            .flat_map(|row| row.iter().map(|value| value.to_field()))
            .collect();

        let sql = Self::insert_sql(self.columns.len(), rows.len());
        let mut query = self.scope.client().query(&sql);
        query = query.bind(Identifier(&self.table));
        for column in &self.columns {
            query = query.bind(Identifier(column));
        }
        for field in &fields {
            query = query.bind(field.as_str());
        }
        query
            .execute()
            .await
            .map_err(|e| TransferError::write(format!("INSERT into {} failed: {}", self.table, e)))?;

        self.rows_written += rows.len() as u64;
        debug!(
            "Wrote batch of {} rows into {} (total: {})",
            rows.len(),
            self.table,
            self.rows_written
        );
        Ok(rows.len() as u64)
    }

    async fn finalize(&mut self) -> Result<()> {
        info!("Finalized table {}: {} rows", self.table, self.rows_written);
        Ok(())
    }
}

/// Serializes rows to delimited text with a header row, UTF-8 encoded.
pub struct FileRowSink<W: io::Write + Send> {
    writer: csv::Writer<W>,
    column_count: usize,
    rows_written: u64,
}

impl FileRowSink<std::fs::File> {
    /// Create a file sink at `path`, truncating any existing file.
    pub fn create_path(path: impl AsRef<Path>, delimiter: u8) -> Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::from_writer(file, delimiter))
    }
}

impl<W: io::Write + Send> FileRowSink<W> {
    /// Create a file sink over any writer.
    pub fn from_writer(writer: W, delimiter: u8) -> Self {
        let writer = csv::WriterBuilder::new().delimiter(delimiter).from_writer(writer);
        Self {
            writer,
            column_count: 0,
            rows_written: 0,
        }
    }

    /// Recover the underlying writer after `finalize`.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| TransferError::write(format!("flush failed: {}", e)))
    }
}

#[async_trait]
impl<W: io::Write + Send> RowSink for FileRowSink<W> {
    async fn prepare(&mut self, schema: &[ColumnSpec]) -> Result<()> {
        self.writer
            .write_record(schema.iter().map(|c| c.name.as_str()))?;
        self.column_count = schema.len();
        debug!("Prepared file sink with {} columns", schema.len());
        Ok(())
    }

    async fn write_batch(&mut self, rows: &[Row]) -> Result<u64> {
        for row in rows {
            if row.len() != self.column_count {
                return Err(TransferError::write(format!(
                    "row arity {} does not match header with {} columns",
                    row.len(),
                    self.column_count
                )));
            }
            self.writer
                .write_record(row.iter().map(|value| value.to_field()))?;
        }
        self.rows_written += rows.len() as u64;
        Ok(rows.len() as u64)
    }

    async fn finalize(&mut self) -> Result<()> {
        self.writer.flush()?;
        debug!("Finalized file sink: {} rows", self.rows_written);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;
    use crate::value::Value;

    fn specs(names: &[&str]) -> Vec<ColumnSpec> {
        names
            .iter()
            .map(|n| ColumnSpec::new(*n, ColumnType::String))
            .collect()
    }

    #[tokio::test]
    async fn test_file_sink_round() {
        let mut sink = FileRowSink::from_writer(Vec::new(), b',');
        sink.prepare(&specs(&["a", "b"])).await.unwrap();
        let rows = vec![
            vec![Value::from(1i64), Value::from("x")],
            vec![Value::from(2i64), Value::from("y")],
        ];
        assert_eq!(sink.write_batch(&rows).await.unwrap(), 2);
        sink.finalize().await.unwrap();

        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(out, "a,b\n1,x\n2,y\n");
    }

    #[tokio::test]
    async fn test_file_sink_custom_delimiter_and_null() {
        let mut sink = FileRowSink::from_writer(Vec::new(), b'\t');
        sink.prepare(&specs(&["a", "b"])).await.unwrap();
        sink.write_batch(&[vec![Value::Null, Value::from("x")]])
            .await
            .unwrap();
        sink.finalize().await.unwrap();

        let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(out, "a\tb\n\tx\n");
    }

    #[tokio::test]
    async fn test_file_sink_arity_mismatch() {
        let mut sink = FileRowSink::from_writer(Vec::new(), b',');
        sink.prepare(&specs(&["a", "b"])).await.unwrap();
        let err = sink.write_batch(&[vec![Value::from("1")]]).await.unwrap_err();
        assert!(matches!(err, TransferError::Write(_)));
    }

    #[test]
    fn test_create_table_sql_shape() {
        assert_eq!(
            DbRowSink::create_table_sql(2),
            "CREATE TABLE IF NOT EXISTS ? (? String, ? String) ENGINE = MergeTree() ORDER BY tuple()"
        );
    }

    #[test]
    fn test_insert_sql_shape() {
        assert_eq!(
            DbRowSink::insert_sql(2, 2),
            "INSERT INTO ? (?, ?) VALUES (?, ?), (?, ?)"
        );
    }
}
