//! Flow-level error types.

use nodes::{NodeError, NodeType};
use thiserror::Error;

/// Errors produced by the flow model (integrity checks + editing).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FlowError {
    // ------ Integrity errors ------

    /// Two or more nodes share the same ID.
    #[error("duplicate node ID: '{0}'")]
    DuplicateNodeId(String),

    /// Two or more edges share the same ID.
    #[error("duplicate edge ID: '{0}'")]
    DuplicateEdgeId(String),

    /// An edge references a node ID that doesn't exist in the flow.
    #[error("edge '{edge_id}' references unknown node '{node_id}' ({side} side)")]
    DanglingEdge {
        edge_id: String,
        node_id: String,
        side: &'static str,
    },

    /// A stored node's `type` disagrees with the payload it carries.
    #[error("node '{node_id}' is declared as '{declared}' but carries a '{payload}' payload")]
    NodeTypeMismatch {
        node_id: String,
        declared: NodeType,
        payload: NodeType,
    },

    /// A stored node's payload could not be read.
    #[error("malformed data for node '{node_id}': {message}")]
    MalformedNode { node_id: String, message: String },

    // ------ Editing errors ------

    /// A step type name outside the closed set.
    #[error(transparent)]
    UnknownNodeType(#[from] NodeError),

    /// A partial payload could not be merged into the node's data.
    #[error("invalid update for node '{node_id}': {message}")]
    InvalidPatch { node_id: String, message: String },
}
