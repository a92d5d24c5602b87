//! Per-operation ClickHouse connection scope.
//!
//! A [`DbScope`] is acquired once per operation from a caller-supplied
//! [`ConnectionConfig`] and dropped when the operation ends; nothing is
//! pooled or shared across requests. Identifiers are always bound through
//! the client's `Identifier` placeholder, never interpolated into SQL.

use crate::config::ConnectionConfig;
use crate::error::{Result, TransferError};
use crate::schema::{map_clickhouse_type, ColumnSpec};
use clickhouse::sql::Identifier;
use serde::Deserialize;
use tracing::{debug, info};

/// A validated, operation-scoped connection to one ClickHouse endpoint.
pub struct DbScope {
    client: clickhouse::Client,
    database: String,
}

#[derive(Deserialize)]
struct DescribeRow {
    name: String,
    #[serde(rename = "type")]
    native_type: String,
}

impl DbScope {
    /// Connect and validate the endpoint with a no-op query.
    ///
    /// An unreachable or unauthenticated endpoint fails here, before any
    /// schema or data operation can proceed.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        config.validate()?;

        let client = clickhouse::Client::default()
            .with_url(config.url())
            .with_user(&config.user)
            .with_password(&config.password)
            .with_database(&config.database);

        let _: u8 = client
            .query("SELECT 1")
            .fetch_one()
            .await
            .map_err(|e| TransferError::connection(format!("{}: {}", config.url(), e)))?;

        info!(
            "Connected to ClickHouse: {}/{}",
            config.url(),
            config.database
        );

        Ok(Self {
            client,
            database: config.database.clone(),
        })
    }

    /// The database this scope is bound to.
    pub fn database(&self) -> &str {
        &self.database
    }

    pub(crate) fn client(&self) -> &clickhouse::Client {
        &self.client
    }

    /// List table names in the scoped database, in engine order.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let tables = self
            .client
            .query("SHOW TABLES")
            .fetch_all::<String>()
            .await
            .map_err(|e| TransferError::schema(format!("SHOW TABLES failed: {}", e)))?;

        debug!("Found {} tables in {}", tables.len(), self.database);
        Ok(tables)
    }

    /// Describe one table's columns with semantic types.
    ///
    /// Native types without a mapping come back as `Unknown`; a missing
    /// table is a schema error raised by the engine.
    pub async fn describe_table(&self, table: &str) -> Result<Vec<ColumnSpec>> {
        let mut cursor = self
            .client
            .query("DESCRIBE TABLE ?")
            .bind(Identifier(table))
            .fetch_bytes("JSONEachRow")
            .map_err(|e| TransferError::schema(format!("DESCRIBE {} failed: {}", table, e)))?;

        let mut raw = Vec::new();
        while let Some(chunk) = cursor
            .next()
            .await
            .map_err(|e| TransferError::schema(format!("DESCRIBE {} failed: {}", table, e)))?
        {
            raw.extend_from_slice(&chunk);
        }

        let mut columns = Vec::new();
        for line in raw.split(|b| *b == b'\n') {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let row: DescribeRow = serde_json::from_slice(line)?;
            columns.push(ColumnSpec::new(
                row.name,
                map_clickhouse_type(&row.native_type),
            ));
        }

        debug!("Table {} has {} columns", table, columns.len());
        Ok(columns)
    }
}

impl std::fmt::Debug for DbScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbScope")
            .field("database", &self.database)
            .finish()
    }
}
