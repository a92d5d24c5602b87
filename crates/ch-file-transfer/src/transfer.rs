//! Transfer coordinator: wires one source to one sink.
//!
//! One coordinator instance serves one transfer; there is no shared state
//! between transfers and no internal parallelism. The pipeline is a
//! sequential pull/write loop with a cancellation check between batches and
//! a per-operation I/O timeout.

use crate::config::TransferOptions;
use crate::error::{Result, TransferError};
use crate::schema::ColumnSpec;
use crate::sink::RowSink;
use crate::source::RowSource;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Coordinator states. Failure is terminal from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SourceOpened,
    Writing,
    Finalized,
    Failed,
}

/// Result of a completed transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferReport {
    /// Total rows read from the source and acknowledged by the sink.
    pub rows_transferred: u64,

    /// Number of batches written.
    pub batches: u64,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the transfer started.
    pub started_at: DateTime<Utc>,

    /// When the transfer completed.
    pub completed_at: DateTime<Utc>,
}

impl TransferReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Orchestrates one end-to-end transfer.
pub struct TransferCoordinator {
    options: TransferOptions,
    cancel: CancellationToken,
}

impl TransferCoordinator {
    /// Create a coordinator with the given tuning options.
    pub fn new(options: TransferOptions) -> Self {
        Self {
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Attach a cancellation token checked between batches.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the transfer to completion.
    ///
    /// The source must be opened without a limit; `schema` is the derived
    /// destination schema handed to the sink's `prepare`. On failure the
    /// destination keeps whatever the last acknowledged batch produced;
    /// there is no rollback.
    pub async fn run(
        &self,
        schema: &[ColumnSpec],
        source: &mut dyn RowSource,
        sink: &mut dyn RowSink,
    ) -> Result<TransferReport> {
        let result = self.run_inner(schema, source, sink).await;
        // Connections are released on every exit path, including failure.
        let closed = source.close().await;

        match result {
            Ok(report) => {
                closed?;
                Ok(report)
            }
            Err(e) => {
                warn!("Transfer entered {:?} state: {}", State::Failed, e);
                Err(e)
            }
        }
    }

    async fn run_inner(
        &self,
        schema: &[ColumnSpec],
        source: &mut dyn RowSource,
        sink: &mut dyn RowSink,
    ) -> Result<TransferReport> {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut state = State::SourceOpened;
        debug!(
            "Transfer starting in {:?}: {} columns, batch_size {}",
            state,
            schema.len(),
            self.options.batch_size
        );

        self.with_timeout("sink prepare", sink.prepare(schema))
            .await?;
        state = State::Writing;
        debug!("Transfer state: {:?}", state);

        let mut rows_transferred: u64 = 0;
        let mut batches: u64 = 0;

        loop {
            if self.cancel.is_cancelled() {
                info!(
                    "Transfer cancelled after {} rows in {} batches",
                    rows_transferred, batches
                );
                return Err(TransferError::Cancelled);
            }

            let batch = match self
                .with_timeout("source read", source.next_batch(self.options.batch_size))
                .await?
            {
                Some(batch) => batch,
                None => break,
            };

            let submitted = batch.len() as u64;
            let acknowledged = self
                .with_timeout("sink write", sink.write_batch(&batch))
                .await?;

            // An under-acknowledged batch is an inconsistency, never a
            // silently smaller count.
            if acknowledged != submitted {
                return Err(TransferError::write(format!(
                    "sink acknowledged {} of {} rows in batch {}",
                    acknowledged,
                    submitted,
                    batches + 1
                )));
            }

            rows_transferred += acknowledged;
            batches += 1;
            debug!(
                "Batch {}: {} rows (total: {})",
                batches, submitted, rows_transferred
            );
        }

        self.with_timeout("sink finalize", sink.finalize()).await?;
        state = State::Finalized;

        let completed_at = Utc::now();
        let duration = start.elapsed();
        info!(
            "Transfer {:?}: {} rows in {} batches over {:.2}s",
            state,
            rows_transferred,
            batches,
            duration.as_secs_f64()
        );

        Ok(TransferReport {
            rows_transferred,
            batches,
            duration_seconds: duration.as_secs_f64(),
            started_at,
            completed_at,
        })
    }

    async fn with_timeout<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = Result<T>> + Send,
    ) -> Result<T> {
        match tokio::time::timeout(self.options.io_timeout(), fut).await {
            Ok(result) => result,
            Err(_) => Err(TransferError::timeout(
                operation,
                self.options.io_timeout_secs,
            )),
        }
    }
}
