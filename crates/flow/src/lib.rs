//! `flow` crate: the campaign flow graph and its editing semantics.
//!
//! - [`models`]: the persisted shape of a flow (nodes, edges, positions).
//! - [`graph`]: [`FlowGraph`], the in-memory store for one open flow.
//! - [`editor`]: [`FlowEditor`], the policy layer the canvas talks to.
//! - [`validate`]: integrity checks and repair for flows read from storage.

pub mod models;
pub mod error;
pub mod validate;
pub mod graph;
pub mod editor;

pub use models::{Flow, FlowEdge, FlowNode, Position};
pub use error::FlowError;
pub use validate::{validate_flow, RepairReport};
pub use graph::FlowGraph;
pub use editor::{CanvasBounds, Connection, FlowEditor, Viewport};
