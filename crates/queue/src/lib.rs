//! `queue` crate: ordered, coalescing delivery of state snapshots.
//!
//! Editors submit a full snapshot after every mutation.  Only the newest
//! pending snapshot is kept; older ones are superseded before they are ever
//! applied.  Sequence numbers are strictly increasing, so a consumer can
//! always tell which of two snapshots is newer.

pub mod error;
pub mod snapshot;
pub mod sink;

pub use error::QueueError;
pub use snapshot::{Snapshot, SnapshotQueue};
pub use sink::{drain, flush, SnapshotSink};
