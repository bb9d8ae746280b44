//! Consumers of a [`SnapshotQueue`].

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{QueueError, Snapshot, SnapshotQueue};

/// Destination for snapshots taken off a queue.
#[async_trait]
pub trait SnapshotSink<T: Send + 'static>: Send + Sync {
    /// Apply `snapshot`.  Called with strictly increasing sequence numbers.
    async fn apply(&self, snapshot: Snapshot<T>) -> Result<(), QueueError>;
}

/// Apply whatever is pending right now.
///
/// Used at the end of an editing session so the last mutation is never lost.
/// Returns the sequence number that was applied, if any.
pub async fn flush<T, S>(queue: &SnapshotQueue<T>, sink: &S) -> Result<Option<u64>, QueueError>
where
    T: Send + 'static,
    S: SnapshotSink<T> + ?Sized,
{
    match queue.try_take() {
        Some(snapshot) => {
            let seq = snapshot.seq;
            sink.apply(snapshot).await?;
            Ok(Some(seq))
        }
        None => Ok(None),
    }
}

/// Feed snapshots into `sink` until the queue is closed.
///
/// Rejected snapshots are logged and skipped; the next submission carries the
/// newer state anyway.  Returns how many snapshots were applied.
pub async fn drain<T, S>(queue: &SnapshotQueue<T>, sink: &S) -> usize
where
    T: Send + 'static,
    S: SnapshotSink<T> + ?Sized,
{
    let mut applied = 0;
    while let Some(snapshot) = queue.next().await {
        let seq = snapshot.seq;
        match sink.apply(snapshot).await {
            Ok(()) => {
                debug!(seq, "snapshot applied");
                applied += 1;
            }
            Err(e) => warn!(seq, "{e}"),
        }
    }
    applied
}
