//! Bounded read-only previews over the same sources the full transfer uses.
//!
//! Preview opens a [`RowSource`] with a row cap instead of wiring it to a
//! sink, so what a caller previews is exactly what a transfer would read.

use crate::client::DbScope;
use crate::config::TableSelection;
use crate::error::Result;
use crate::schema::{infer_column_types, ColumnSpec};
use crate::source::{DbRowSource, FileRowSource, RowSource};
use crate::value::Row;
use serde::Serialize;
use std::io;
use tracing::debug;

/// Maximum rows returned by any preview.
pub const PREVIEW_ROW_LIMIT: u64 = 100;

/// Bounded sample of a database table.
#[derive(Debug, Clone, Serialize)]
pub struct TablePreview {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Bounded sample of a delimited file with inferred column types.
#[derive(Debug, Clone, Serialize)]
pub struct FilePreview {
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<Row>,
}

/// Preview the first rows of a table selection.
///
/// The limit is pushed into the query; a table shorter than the limit
/// yields all of its rows.
pub async fn preview_table(scope: &DbScope, selection: &TableSelection) -> Result<TablePreview> {
    let mut source = DbRowSource::open(scope, selection, Some(PREVIEW_ROW_LIMIT))?;
    let rows = drain(&mut source, PREVIEW_ROW_LIMIT).await?;

    debug!(
        "Previewed {} rows from {}",
        rows.len(),
        selection.table
    );
    Ok(TablePreview {
        columns: selection.columns.clone(),
        rows,
    })
}

/// Preview the first rows of a delimited file and infer its schema.
///
/// The preview rows double as the inference sample, so the reported types
/// describe exactly the data shown.
pub async fn preview_file<R: io::Read + Send>(reader: R, delimiter: u8) -> Result<FilePreview> {
    let mut source = FileRowSource::from_reader(reader, delimiter, Some(PREVIEW_ROW_LIMIT))?;
    let header = source.columns().to_vec();
    let rows = drain(&mut source, PREVIEW_ROW_LIMIT).await?;

    let sample: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|value| value.to_field()).collect())
        .collect();
    let columns = infer_column_types(&header, &sample);

    debug!("Previewed {} rows from file", rows.len());
    Ok(FilePreview { columns, rows })
}

async fn drain(source: &mut dyn RowSource, limit: u64) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    let result = loop {
        match source.next_batch(limit as usize).await {
            Ok(Some(batch)) => {
                rows.extend(batch);
                if rows.len() as u64 >= limit {
                    rows.truncate(limit as usize);
                    break Ok(());
                }
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    source.close().await?;
    result.map(|()| rows)
}
