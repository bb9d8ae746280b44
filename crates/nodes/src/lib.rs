//! `nodes` crate: the closed set of campaign step types and their payloads.
//!
//! Every node on a campaign canvas carries one [`NodeData`] variant.  The
//! registry hands out freshly constructed defaults for each [`NodeType`].

pub mod error;
pub mod schema;
pub mod registry;

pub use error::NodeError;
pub use schema::{
    ConditionData, DelayData, DelayUnit, EmailData, InputData, InputKind, NodeCategory, NodeData,
    NodeType, SmsData, TriggerData, TriggerKind, FALSE_HANDLE,
};
pub use registry::{default_title, defaults_for, defaults_for_name};
