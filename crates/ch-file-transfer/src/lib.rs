//! # ch-file-transfer
//!
//! Bidirectional streaming transfer between ClickHouse and delimited flat
//! files.
//!
//! The library provides:
//!
//! - **Schema discovery** for tables (`SHOW TABLES` / `DESCRIBE`) and
//!   delimited files (sampled type inference)
//! - **Streaming row sources and sinks** over either side, with O(batch)
//!   memory use
//! - **A transfer coordinator** that batches rows, verifies sink
//!   acknowledgements, and honors cancellation and I/O timeouts
//! - **Bounded previews** that share the transfer read path
//!
//! ## Example
//!
//! ```rust,no_run
//! use ch_file_transfer::{
//!     ColumnSpec, ColumnType, ConnectionConfig, DbScope, DbRowSink, FileRowSource,
//!     RowSource, TransferCoordinator, TransferOptions,
//! };
//!
//! #[tokio::main]
//! async fn main() -> ch_file_transfer::Result<()> {
//!     let conn = ConnectionConfig {
//!         host: "localhost".into(),
//!         port: 8123,
//!         database: "default".into(),
//!         user: "default".into(),
//!         password: String::new(),
//!         secure: false,
//!     };
//!     let scope = DbScope::connect(&conn).await?;
//!
//!     let mut source = FileRowSource::open_path("data.csv", b',', None)?;
//!     let schema: Vec<ColumnSpec> = source
//!         .columns()
//!         .iter()
//!         .map(|name| ColumnSpec::new(name.clone(), ColumnType::String))
//!         .collect();
//!     let mut sink = DbRowSink::new(&scope, "imported");
//!
//!     let report = TransferCoordinator::new(TransferOptions::default())
//!         .run(&schema, &mut source, &mut sink)
//!         .await?;
//!     println!("Transferred {} rows", report.rows_transferred);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod preview;
pub mod schema;
pub mod sink;
pub mod source;
pub mod transfer;
pub mod value;

// Re-exports for convenient access
pub use client::DbScope;
pub use config::{Config, ConnectionConfig, TableSelection, TransferOptions};
pub use error::{Result, TransferError};
pub use preview::{preview_file, preview_table, FilePreview, TablePreview, PREVIEW_ROW_LIMIT};
pub use schema::{infer_column_types, map_clickhouse_type, ColumnSpec, ColumnType};
pub use sink::{DbRowSink, FileRowSink, RowSink};
pub use source::{DbRowSource, FileRowSource, RowSource};
pub use transfer::{TransferCoordinator, TransferReport};
pub use value::{Row, Value};
