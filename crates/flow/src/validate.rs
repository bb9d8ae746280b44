//! Flow integrity checks for flows that come from outside the editor.
//!
//! Rules enforced:
//! 1. Node IDs must be unique within the flow.
//! 2. Edge IDs must be unique within the flow.
//! 3. Every edge must reference existing node IDs (both `source` and `target`).
//!
//! Cycles, self-loops, and parallel edges are all allowed: the authoring
//! tool does not decide whether a campaign makes sense.

use std::collections::HashSet;

use tracing::warn;

use crate::{models::Flow, FlowError};

/// Check the flow's structural invariants.
///
/// # Errors
/// - [`FlowError::DuplicateNodeId`] if two nodes share an ID.
/// - [`FlowError::DuplicateEdgeId`] if two edges share an ID.
/// - [`FlowError::DanglingEdge`] if an edge references a missing node.
pub fn validate_flow(flow: &Flow) -> Result<(), FlowError> {
    // -----------------------------------------------------------------------
    // 1. Ensure node IDs are unique
    // -----------------------------------------------------------------------
    let mut node_ids: HashSet<&str> = HashSet::with_capacity(flow.nodes.len());
    for node in &flow.nodes {
        if !node_ids.insert(node.id.as_str()) {
            return Err(FlowError::DuplicateNodeId(node.id.clone()));
        }
    }

    // -----------------------------------------------------------------------
    // 2. Ensure edge IDs are unique
    // -----------------------------------------------------------------------
    let mut edge_ids: HashSet<&str> = HashSet::with_capacity(flow.edges.len());
    for edge in &flow.edges {
        if !edge_ids.insert(edge.id.as_str()) {
            return Err(FlowError::DuplicateEdgeId(edge.id.clone()));
        }
    }

    // -----------------------------------------------------------------------
    // 3. Validate edge endpoints
    // -----------------------------------------------------------------------
    for edge in &flow.edges {
        if !node_ids.contains(edge.source.as_str()) {
            return Err(FlowError::DanglingEdge {
                edge_id: edge.id.clone(),
                node_id: edge.source.clone(),
                side: "source",
            });
        }
        if !node_ids.contains(edge.target.as_str()) {
            return Err(FlowError::DanglingEdge {
                edge_id: edge.id.clone(),
                node_id: edge.target.clone(),
                side: "target",
            });
        }
    }

    Ok(())
}

/// What [`Flow::repair`] had to throw away.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub duplicate_nodes: Vec<String>,
    pub duplicate_edges: Vec<String>,
    pub dangling_edges: Vec<String>,
}

impl RepairReport {
    pub fn is_clean(&self) -> bool {
        self.duplicate_nodes.is_empty()
            && self.duplicate_edges.is_empty()
            && self.dangling_edges.is_empty()
    }
}

impl Flow {
    /// Bring a corrupted flow back within its invariants.
    ///
    /// Later duplicates of a node or edge ID are dropped (the first one
    /// wins), then every edge whose endpoint no longer exists is dropped.
    /// After this, [`validate_flow`] succeeds.
    pub fn repair(&mut self) -> RepairReport {
        let mut report = RepairReport::default();

        let mut seen: HashSet<String> = HashSet::with_capacity(self.nodes.len());
        self.nodes.retain(|node| {
            let first = seen.insert(node.id.clone());
            if !first {
                report.duplicate_nodes.push(node.id.clone());
            }
            first
        });

        let mut seen_edges: HashSet<String> = HashSet::with_capacity(self.edges.len());
        self.edges.retain(|edge| {
            let first = seen_edges.insert(edge.id.clone());
            if !first {
                report.duplicate_edges.push(edge.id.clone());
            }
            first
        });

        self.edges.retain(|edge| {
            let attached = seen.contains(&edge.source) && seen.contains(&edge.target);
            if !attached {
                report.dangling_edges.push(edge.id.clone());
            }
            attached
        });

        if !report.is_clean() {
            warn!(
                duplicate_nodes = report.duplicate_nodes.len(),
                duplicate_edges = report.duplicate_edges.len(),
                dangling_edges = report.dangling_edges.len(),
                "repaired corrupted flow"
            );
        }

        report
    }
}
