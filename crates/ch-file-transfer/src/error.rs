//! Error types for transfer operations.

use thiserror::Error;

/// Main error type for schema discovery, preview, and transfer operations.
#[derive(Error, Debug)]
pub enum TransferError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Cannot reach or authenticate to the database.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Table or column not found, or malformed DDL.
    #[error("Schema error: {0}")]
    Schema(String),

    /// A source row does not match the expected shape.
    #[error("Row format error at row {row}: expected {expected} columns, found {found}")]
    RowFormat {
        row: u64,
        expected: usize,
        found: usize,
    },

    /// The sink rejected a batch.
    #[error("Write error: {0}")]
    Write(String),

    /// An I/O operation exceeded its budget.
    #[error("Timeout after {seconds}s during {operation}")]
    Timeout { operation: String, seconds: u64 },

    /// Transfer was cancelled between batches.
    #[error("Transfer cancelled")]
    Cancelled,

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parse or serialize error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TransferError {
    /// Create a Connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        TransferError::Connection(message.into())
    }

    /// Create a Schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        TransferError::Schema(message.into())
    }

    /// Create a Write error.
    pub fn write(message: impl Into<String>) -> Self {
        TransferError::Write(message.into())
    }

    /// Create a Timeout error for a named operation.
    pub fn timeout(operation: impl Into<String>, seconds: u64) -> Self {
        TransferError::Timeout {
            operation: operation.into(),
            seconds,
        }
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            TransferError::Config(_) => 2,
            TransferError::Cancelled => 130,
            _ => 1,
        }
    }
}

/// Result type alias for transfer operations.
pub type Result<T> = std::result::Result<T, TransferError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_format_display() {
        let err = TransferError::RowFormat {
            row: 7,
            expected: 3,
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "Row format error at row 7: expected 3 columns, found 2"
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = TransferError::timeout("source read", 30);
        assert_eq!(err.to_string(), "Timeout after 30s during source read");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(TransferError::Config("x".into()).exit_code(), 2);
        assert_eq!(TransferError::Cancelled.exit_code(), 130);
        assert_eq!(TransferError::write("x").exit_code(), 1);
    }
}
