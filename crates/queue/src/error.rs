//! Queue-level error type.

use thiserror::Error;

/// Errors surfaced while handing snapshots to a [`crate::SnapshotSink`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The sink refused the snapshot; it is dropped, a newer one will follow.
    #[error("snapshot {seq} rejected: {reason}")]
    Rejected { seq: u64, reason: String },

    /// The background task draining the queue panicked or was cancelled.
    #[error("snapshot worker stopped: {0}")]
    WorkerStopped(String),
}
