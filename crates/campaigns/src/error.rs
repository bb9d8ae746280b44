//! Campaign-level error type.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced to callers that need hard failures.
///
/// The store itself treats unknown ids as no-ops and persistence as
/// best-effort; these variants are for callers (such as the CLI) that turn
/// those outcomes into errors.
#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("campaign not found: {0}")]
    NotFound(Uuid),

    #[error("storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error(transparent)]
    Flow(#[from] flow::FlowError),

    #[error(transparent)]
    Queue(#[from] queue::QueueError),
}
