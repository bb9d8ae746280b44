//! `campaigns` crate: the campaign collection and its editing sessions.
//!
//! [`CampaignStore`] owns every campaign and writes the whole collection
//! through a [`storage::BlobStore`] after each change.  [`EditingSession`]
//! opens one campaign's flow in a [`flow::FlowEditor`] and feeds the editor's
//! change queue back into the store.

pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod session;

pub use config::StoreConfig;
pub use error::CampaignError;
pub use models::{Campaign, CampaignQuery, SortOrder, StatusFilter};
pub use session::{EditingSession, FlowWriter, SharedStore};
pub use store::{CampaignStore, DOCUMENT_VERSION};
