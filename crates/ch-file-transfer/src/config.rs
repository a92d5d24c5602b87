//! Connection, selection, and transfer tuning configuration.

use crate::error::{Result, TransferError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// One ClickHouse endpoint, supplied by the caller per operation.
///
/// The core never persists credentials; the descriptor lives only for the
/// duration of the operation it was handed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database host.
    pub host: String,

    /// HTTP interface port (default: 8123).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name.
    #[serde(default = "default_database")]
    pub database: String,

    /// Username.
    #[serde(default = "default_user")]
    pub user: String,

    /// Password or token.
    #[serde(default)]
    pub password: String,

    /// Use HTTPS (default: false).
    #[serde(default)]
    pub secure: bool,
}

fn default_port() -> u16 {
    8123
}

fn default_database() -> String {
    "default".to_string()
}

fn default_user() -> String {
    "default".to_string()
}

impl ConnectionConfig {
    /// Build the HTTP endpoint URL for the ClickHouse client.
    ///
    /// Credentials are passed through the client builder, not the URL.
    pub fn url(&self) -> String {
        let protocol = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}", protocol, self.host, self.port)
    }

    /// Validate required fields.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(TransferError::Config("connection.host is required".into()));
        }
        if self.database.is_empty() {
            return Err(TransferError::Config(
                "connection.database must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// A table plus the ordered columns to read from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSelection {
    /// Table name.
    pub table: String,

    /// Ordered column names; must be a subset of the table's columns.
    /// The query engine raises the error if they are not.
    pub columns: Vec<String>,

    /// Join specification, accepted but not interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_spec: Option<serde_json::Value>,
}

impl TableSelection {
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
            join_spec: None,
        }
    }

    /// Validate that the selection names a table and at least one column.
    pub fn validate(&self) -> Result<()> {
        if self.table.is_empty() {
            return Err(TransferError::Config("selection.table is required".into()));
        }
        if self.columns.is_empty() {
            return Err(TransferError::Config(
                "selection.columns must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Tuning knobs for one transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferOptions {
    /// Rows per batch pulled from the source and written to the sink.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Per-operation I/O budget in seconds; one source pull or one sink
    /// write must complete within this window.
    #[serde(default = "default_io_timeout_secs")]
    pub io_timeout_secs: u64,
}

fn default_batch_size() -> usize {
    10_000
}

fn default_io_timeout_secs() -> u64 {
    30
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            io_timeout_secs: default_io_timeout_secs(),
        }
    }
}

impl TransferOptions {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(TransferError::Config("batch_size must be > 0".into()));
        }
        if self.io_timeout_secs == 0 {
            return Err(TransferError::Config("io_timeout_secs must be > 0".into()));
        }
        Ok(())
    }
}

/// Root configuration structure for the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// ClickHouse endpoint.
    pub connection: ConnectionConfig,

    /// Transfer tuning.
    #[serde(default)]
    pub transfer: TransferOptions,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.connection.validate()?;
        self.transfer.validate()
    }
}
