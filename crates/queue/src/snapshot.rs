//! The coalescing snapshot queue.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;
use tracing::debug;

/// A value tagged with the sequence number it was submitted under.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub seq: u64,
    pub value: T,
}

#[derive(Debug)]
struct QueueState<T> {
    /// Sequence number the next submission receives.  Starts at 1.
    next_seq: u64,
    /// At most one snapshot waits at any time: the newest.
    pending: Option<Snapshot<T>>,
    /// Highest sequence number handed out by `try_take`.
    last_taken: u64,
    closed: bool,
}

/// Single-slot queue that keeps only the newest submitted snapshot.
///
/// `submit` never blocks.  A consumer either polls with [`try_take`] or
/// awaits [`next`]; both hand out snapshots in submission order and never
/// return one older than a snapshot already taken.
///
/// [`try_take`]: SnapshotQueue::try_take
/// [`next`]: SnapshotQueue::next
#[derive(Debug)]
pub struct SnapshotQueue<T> {
    state: Mutex<QueueState<T>>,
    ready: Notify,
}

impl<T> Default for SnapshotQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SnapshotQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                next_seq: 1,
                pending: None,
                last_taken: 0,
                closed: false,
            }),
            ready: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue `value`, superseding any snapshot still pending.
    ///
    /// Returns the sequence number assigned to `value`.
    pub fn submit(&self, value: T) -> u64 {
        let seq = {
            let mut state = self.lock();
            let seq = state.next_seq;
            state.next_seq += 1;
            if let Some(old) = state.pending.replace(Snapshot { seq, value }) {
                debug!(superseded = old.seq, by = seq, "pending snapshot superseded");
            }
            seq
        };
        self.ready.notify_one();
        seq
    }

    /// Drop the pending snapshot, if any, and return it.
    pub fn cancel(&self) -> Option<Snapshot<T>> {
        let cancelled = self.lock().pending.take();
        if let Some(snapshot) = &cancelled {
            debug!(seq = snapshot.seq, "pending snapshot cancelled");
        }
        cancelled
    }

    /// Take the pending snapshot without waiting.
    pub fn try_take(&self) -> Option<Snapshot<T>> {
        let mut state = self.lock();
        let snapshot = state.pending.take()?;
        debug_assert!(snapshot.seq > state.last_taken);
        state.last_taken = snapshot.seq;
        Some(snapshot)
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the queue is closed and nothing is pending.
    pub async fn next(&self) -> Option<Snapshot<T>> {
        loop {
            // Register interest before checking so a submit in between is not missed.
            let notified = self.ready.notified();
            {
                let mut state = self.lock();
                if let Some(snapshot) = state.pending.take() {
                    state.last_taken = snapshot.seq;
                    return Some(snapshot);
                }
                if state.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Stop accepting waits: `next` returns `None` after the pending snapshot
    /// (if any) has been taken.  Submissions are still accepted.
    pub fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Sequence number of the pending snapshot.
    pub fn pending_seq(&self) -> Option<u64> {
        self.lock().pending.as_ref().map(|s| s.seq)
    }

    /// Sequence number of the most recent submission, if there was one.
    pub fn last_submitted(&self) -> Option<u64> {
        let next = self.lock().next_seq;
        (next > 1).then(|| next - 1)
    }

    /// Highest sequence number handed to a consumer so far (0 if none).
    pub fn last_taken(&self) -> u64 {
        self.lock().last_taken
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn newer_submission_supersedes_pending() {
        let queue = SnapshotQueue::new();
        assert_eq!(queue.submit("a"), 1);
        assert_eq!(queue.submit("b"), 2);
        assert_eq!(queue.submit("c"), 3);

        assert_eq!(queue.try_take(), Some(Snapshot { seq: 3, value: "c" }));
        assert_eq!(queue.try_take(), None);
        assert_eq!(queue.last_taken(), 3);
    }

    #[test]
    fn sequence_numbers_keep_increasing_after_take() {
        let queue = SnapshotQueue::new();
        queue.submit(1);
        let first = queue.try_take().unwrap();
        queue.submit(2);
        let second = queue.try_take().unwrap();
        assert!(second.seq > first.seq);
        assert_eq!(queue.last_submitted(), Some(2));
    }

    #[test]
    fn cancel_discards_pending_snapshot() {
        let queue = SnapshotQueue::new();
        assert_eq!(queue.last_submitted(), None);
        queue.submit("draft");
        assert_eq!(queue.pending_seq(), Some(1));

        let cancelled = queue.cancel().unwrap();
        assert_eq!(cancelled.value, "draft");
        assert_eq!(queue.pending_seq(), None);
        assert_eq!(queue.try_take(), None);
        assert_eq!(queue.last_taken(), 0);
    }

    #[tokio::test]
    async fn next_wakes_on_submit() {
        let queue = Arc::new(SnapshotQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.next().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.submit(42);

        let snapshot = consumer.await.unwrap().unwrap();
        assert_eq!(snapshot, Snapshot { seq: 1, value: 42 });
    }

    #[tokio::test]
    async fn closed_queue_yields_pending_then_none() {
        let queue = SnapshotQueue::new();
        queue.submit("last");
        queue.close();

        assert_eq!(queue.next().await.map(|s| s.value), Some("last"));
        assert_eq!(queue.next().await, None);
        assert!(queue.is_closed());
    }
}
