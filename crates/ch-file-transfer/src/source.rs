//! Row sources: streaming readers over a database query or a delimited file.
//!
//! Both implementations stream lazily with O(batch) memory. The variant is
//! chosen once at transfer start; a source is owned by a single transfer
//! and never shared across tasks.

use crate::client::DbScope;
use crate::config::TableSelection;
use crate::error::{Result, TransferError};
use crate::value::{json_to_value, Row, Value};
use async_trait::async_trait;
use clickhouse::query::BytesCursor;
use clickhouse::sql::Identifier;
use std::io;
use std::path::Path;
use tracing::debug;

/// A lazy, finite sequence of rows.
///
/// `next_batch` yields up to `max_rows` rows, `None` at end of stream.
/// Returned batches are never empty.
#[async_trait]
pub trait RowSource: Send {
    /// Ordered column names this source produces.
    fn columns(&self) -> &[String];

    /// Pull the next batch of at most `max_rows` rows.
    async fn next_batch(&mut self, max_rows: usize) -> Result<Option<Vec<Row>>>;

    /// Release the underlying resources.
    async fn close(&mut self) -> Result<()>;
}

/// Streams rows from one SELECT over the JSONEachRow byte cursor.
pub struct DbRowSource {
    columns: Vec<String>,
    cursor: Option<BytesCursor>,
    buf: Vec<u8>,
    rows_read: u64,
}

impl DbRowSource {
    /// Open a source projecting exactly the selected columns in order.
    ///
    /// A limit is pushed into the query as `LIMIT n` so preview never
    /// transfers unbounded data.
    pub fn open(scope: &DbScope, selection: &TableSelection, limit: Option<u64>) -> Result<Self> {
        selection.validate()?;

        let mut sql = String::from("SELECT ");
        sql.push_str(&vec!["?"; selection.columns.len()].join(", "));
        sql.push_str(" FROM ?");
        if limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = scope.client().query(&sql);
        for column in &selection.columns {
            query = query.bind(Identifier(column));
        }
        query = query.bind(Identifier(&selection.table));
        if let Some(n) = limit {
            query = query.bind(n);
        }

        let cursor = query.fetch_bytes("JSONEachRow").map_err(|e| {
            TransferError::schema(format!("SELECT from {} failed: {}", selection.table, e))
        })?;

        debug!(
            "Opened database source on {} ({} columns, limit: {:?})",
            selection.table,
            selection.columns.len(),
            limit
        );

        Ok(Self {
            columns: selection.columns.clone(),
            cursor: Some(cursor),
            buf: Vec::new(),
            rows_read: 0,
        })
    }

    /// Take the next complete JSONEachRow line out of the buffer.
    fn take_line(&mut self) -> Option<Vec<u8>> {
        let pos = self.buf.iter().position(|b| *b == b'\n')?;
        let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
        line.pop();
        Some(line)
    }

    fn parse_row(&self, line: &[u8]) -> Result<Row> {
        let object: serde_json::Value = serde_json::from_slice(line)?;
        let row = self
            .columns
            .iter()
            .map(|name| object.get(name).map(json_to_value).unwrap_or(Value::Null))
            .collect();
        Ok(row)
    }
}

#[async_trait]
impl RowSource for DbRowSource {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    async fn next_batch(&mut self, max_rows: usize) -> Result<Option<Vec<Row>>> {
        let mut rows = Vec::new();

        while rows.len() < max_rows {
            if let Some(line) = self.take_line() {
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                rows.push(self.parse_row(&line)?);
                continue;
            }

            let Some(cursor) = self.cursor.as_mut() else {
                break;
            };
            match cursor
                .next()
                .await
                .map_err(|e| TransferError::connection(format!("row stream failed: {}", e)))?
            {
                Some(chunk) => self.buf.extend_from_slice(&chunk),
                None => {
                    // Trailing row without a newline terminator.
                    if !self.buf.iter().all(u8::is_ascii_whitespace) {
                        let line = std::mem::take(&mut self.buf);
                        rows.push(self.parse_row(&line)?);
                    }
                    self.buf.clear();
                    self.cursor = None;
                }
            }
        }

        if rows.is_empty() {
            return Ok(None);
        }
        self.rows_read += rows.len() as u64;
        Ok(Some(rows))
    }

    async fn close(&mut self) -> Result<()> {
        self.cursor = None;
        self.buf.clear();
        debug!("Closed database source after {} rows", self.rows_read);
        Ok(())
    }
}

/// Streams rows from a delimited text file.
///
/// The first record is always the header. Rows are read lazily; the file is
/// never fully materialized.
pub struct FileRowSource<R: io::Read + Send> {
    reader: csv::Reader<R>,
    header: Vec<String>,
    limit: Option<u64>,
    rows_read: u64,
    done: bool,
}

impl FileRowSource<std::fs::File> {
    /// Open a file source at `path`.
    pub fn open_path(path: impl AsRef<Path>, delimiter: u8, limit: Option<u64>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, delimiter, limit)
    }
}

impl<R: io::Read + Send> FileRowSource<R> {
    /// Open a file source over any reader.
    pub fn from_reader(reader: R, delimiter: u8, limit: Option<u64>) -> Result<Self> {
        // Arity violations must map to a typed row-format error with a row
        // number, so the csv reader is set flexible and checked per record.
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let header: Vec<String> = reader
            .headers()?
            .iter()
            .map(|field| field.to_string())
            .collect();

        debug!("Opened file source with {} columns", header.len());

        Ok(Self {
            reader,
            header,
            limit,
            rows_read: 0,
            done: false,
        })
    }
}

#[async_trait]
impl<R: io::Read + Send> RowSource for FileRowSource<R> {
    fn columns(&self) -> &[String] {
        &self.header
    }

    async fn next_batch(&mut self, max_rows: usize) -> Result<Option<Vec<Row>>> {
        if self.done {
            return Ok(None);
        }

        let mut rows = Vec::new();
        let mut record = csv::StringRecord::new();

        while rows.len() < max_rows {
            if let Some(limit) = self.limit {
                if self.rows_read >= limit {
                    self.done = true;
                    break;
                }
            }

            if !self.reader.read_record(&mut record)? {
                self.done = true;
                break;
            }
            self.rows_read += 1;

            if record.len() != self.header.len() {
                return Err(TransferError::RowFormat {
                    row: self.rows_read,
                    expected: self.header.len(),
                    found: record.len(),
                });
            }

            rows.push(record.iter().map(Value::from).collect());
        }

        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(rows))
    }

    async fn close(&mut self) -> Result<()> {
        self.done = true;
        debug!("Closed file source after {} rows", self.rows_read);
        Ok(())
    }
}
