//! Node-level error type.

use thiserror::Error;

/// Errors raised by the node schema registry.
///
/// The closed set of step types is enforced by [`crate::NodeType`], so this
/// only surfaces when a type *name* coming from outside (a drop payload, a CLI
/// argument, a stored record) does not belong to the set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// The name does not match any known step type.
    #[error("unknown node type: '{0}'")]
    UnknownNodeType(String),
}
