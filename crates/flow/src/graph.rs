//! The in-memory store for one open flow.
//!
//! `FlowGraph` owns the canonical node and edge collections and performs the
//! raw mutations.  It enforces the structural invariants (unique ids, no
//! dangling edges) but no editing policy; that lives in [`crate::editor`].

use nodes::{defaults_for, NodeData, NodeType};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::models::{Flow, FlowEdge, FlowNode, Position};
use crate::FlowError;

/// Canonical node/edge collections for one flow.
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    flow: Flow,
    /// Bumped on every successful mutation.
    revision: u64,
}

impl FlowGraph {
    /// An empty canvas.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a graph from a stored snapshot, repairing it if it is corrupted.
    pub fn from_flow(mut flow: Flow) -> Self {
        flow.repair();
        Self { flow, revision: 0 }
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    pub fn nodes(&self) -> &[FlowNode] {
        &self.flow.nodes
    }

    pub fn edges(&self) -> &[FlowEdge] {
        &self.flow.edges
    }

    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.flow.node(id)
    }

    pub fn edge(&self, id: &str) -> Option<&FlowEdge> {
        self.flow.edge(id)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Deep copy of the current state.
    pub fn snapshot(&self) -> Flow {
        self.flow.clone()
    }

    pub fn into_flow(self) -> Flow {
        self.flow
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut FlowNode> {
        self.flow.nodes.iter_mut().find(|n| n.id == id)
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    fn fresh_id(&self, prefix: &str, taken: impl Fn(&str) -> bool) -> String {
        loop {
            let id = format!("{prefix}-{}", Uuid::new_v4().simple());
            if !taken(&id) {
                return id;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    /// Insert a node of `node_type` with its default payload at `position`.
    pub fn add_node(&mut self, node_type: NodeType, position: Position) -> FlowNode {
        self.add_node_with(defaults_for(node_type), position)
    }

    /// Insert a node carrying `data` at `position`.
    pub fn add_node_with(&mut self, data: NodeData, position: Position) -> FlowNode {
        let id = self.fresh_id(data.node_type().as_str(), |id| self.flow.contains_node(id));
        let node = FlowNode { id, position, data };
        debug!(node_id = %node.id, x = position.x, y = position.y, "node added");

        self.flow.nodes.push(node.clone());
        self.touch();
        node
    }

    /// Merge `patch` into a node's payload, like `{...data, ...patch}`.
    ///
    /// The node's type never changes: a `type` key in the patch is ignored.
    /// Fields not named in the patch keep their values.  Returns `Ok(false)`
    /// if no node has that id.
    ///
    /// # Errors
    /// [`FlowError::InvalidPatch`] if the merged payload is not valid for the
    /// node's type (wrong field type, zero delay, ...).  The node is left
    /// untouched.
    pub fn update_node_data(
        &mut self,
        node_id: &str,
        patch: &Map<String, Value>,
    ) -> Result<bool, FlowError> {
        let Some(node) = self.node_mut(node_id) else {
            debug!(node_id, "update for unknown node ignored");
            return Ok(false);
        };

        let invalid = |message: String| FlowError::InvalidPatch {
            node_id: node_id.to_owned(),
            message,
        };

        let mut merged = match serde_json::to_value(&node.data) {
            Ok(Value::Object(map)) => map,
            Ok(other) => return Err(invalid(format!("payload is not an object: {other}"))),
            Err(e) => return Err(invalid(e.to_string())),
        };
        for (key, value) in patch {
            if key != "type" {
                merged.insert(key.clone(), value.clone());
            }
        }

        node.data = serde_json::from_value(Value::Object(merged)).map_err(|e| invalid(e.to_string()))?;
        debug!(node_id, fields = patch.len(), "node data updated");
        self.touch();
        Ok(true)
    }

    /// Replace an input node's options from multi-line text, one option per
    /// line.  Returns `Ok(false)` if no node has that id.
    ///
    /// # Errors
    /// [`FlowError::InvalidPatch`] if the node is not an input step.
    pub fn set_input_options(&mut self, node_id: &str, text: &str) -> Result<bool, FlowError> {
        let Some(node) = self.node_mut(node_id) else {
            return Ok(false);
        };
        let node_type = node.node_type();
        let NodeData::Input(data) = &mut node.data else {
            return Err(FlowError::InvalidPatch {
                node_id: node_id.to_owned(),
                message: format!("{node_type} steps have no options"),
            });
        };
        data.set_options_from_text(text);
        debug!(node_id, options = data.options.len(), "input options updated");
        self.touch();
        Ok(true)
    }

    /// Overwrite a node's title verbatim (blank titles included).
    pub fn set_node_title(&mut self, node_id: &str, title: impl Into<String>) -> bool {
        let Some(node) = self.node_mut(node_id) else {
            return false;
        };
        node.data.set_title(title);
        self.touch();
        true
    }

    pub fn move_node(&mut self, node_id: &str, position: Position) -> bool {
        let Some(node) = self.node_mut(node_id) else {
            return false;
        };
        node.position = position;
        self.touch();
        true
    }

    /// Delete a node together with every edge attached to it.
    pub fn remove_node(&mut self, node_id: &str) -> Option<FlowNode> {
        let index = self.flow.nodes.iter().position(|n| n.id == node_id)?;
        let node = self.flow.nodes.remove(index);

        let before = self.flow.edges.len();
        self.flow.edges.retain(|e| !e.touches(node_id));
        debug!(node_id, edges_removed = before - self.flow.edges.len(), "node removed");

        self.touch();
        Some(node)
    }

    // -----------------------------------------------------------------------
    // Edges
    // -----------------------------------------------------------------------

    /// Connect `source` to `target` with a new edge.
    ///
    /// Any node may connect to any other, including itself, and parallel
    /// edges are allowed.  Returns `None` only if an endpoint does not exist,
    /// since such an edge would dangle.
    pub fn connect(
        &mut self,
        source: &str,
        target: &str,
        source_handle: Option<String>,
        target_handle: Option<String>,
    ) -> Option<FlowEdge> {
        if !self.flow.contains_node(source) || !self.flow.contains_node(target) {
            debug!(source, target, "connection to unknown node ignored");
            return None;
        }

        let id = self.fresh_id("edge", |id| self.flow.edge(id).is_some());
        let edge = FlowEdge {
            id,
            source: source.to_owned(),
            target: target.to_owned(),
            source_handle,
            target_handle,
            label: None,
        };
        debug!(edge_id = %edge.id, source, target, "edge added");

        self.flow.edges.push(edge.clone());
        self.touch();
        Some(edge)
    }

    pub fn remove_edge(&mut self, edge_id: &str) -> Option<FlowEdge> {
        let index = self.flow.edges.iter().position(|e| e.id == edge_id)?;
        let edge = self.flow.edges.remove(index);
        debug!(edge_id, "edge removed");
        self.touch();
        Some(edge)
    }

    /// Empty both collections.
    pub fn clear(&mut self) {
        self.flow.nodes.clear();
        self.flow.edges.clear();
        debug!("flow cleared");
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate_flow;
    use nodes::{DelayUnit, SmsData};
    use serde_json::json;

    fn patch(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("patch must be an object, got {other}"),
        }
    }

    #[test]
    fn added_node_gets_typed_id_and_defaults() {
        let mut graph = FlowGraph::new();
        let node = graph.add_node(NodeType::Email, Position::new(5.0, 6.0));

        assert!(node.id.starts_with("email-"));
        assert_eq!(node.title(), "Email Message");
        assert_eq!(graph.nodes(), [node]);
        assert_eq!(graph.revision(), 1);
    }

    #[test]
    fn overlapping_positions_are_accepted() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(NodeType::Sms, Position::new(0.0, 0.0));
        let b = graph.add_node(NodeType::Sms, Position::new(0.0, 0.0));
        assert_ne!(a.id, b.id);
        assert_eq!(graph.nodes().len(), 2);
    }

    #[test]
    fn update_merges_fields_and_keeps_the_rest() {
        let mut graph = FlowGraph::new();
        let node = graph.add_node(NodeType::Delay, Position::default());

        let changed = graph
            .update_node_data(&node.id, &patch(json!({ "unit": "hours", "type": "sms" })))
            .unwrap();
        assert!(changed);

        match &graph.node(&node.id).unwrap().data {
            NodeData::Delay(d) => {
                assert_eq!(d.unit, DelayUnit::Hours);
                assert_eq!(d.delay.get(), 1);
                assert_eq!(d.title, "Delay Step");
            }
            other => panic!("type must be preserved, got {other:?}"),
        }
    }

    #[test]
    fn invalid_patch_leaves_node_untouched() {
        let mut graph = FlowGraph::new();
        let node = graph.add_node(NodeType::Delay, Position::default());
        let revision = graph.revision();

        let result = graph.update_node_data(&node.id, &patch(json!({ "delay": 0 })));
        assert!(matches!(result, Err(FlowError::InvalidPatch { .. })));
        assert_eq!(graph.node(&node.id).unwrap(), &node);
        assert_eq!(graph.revision(), revision);
    }

    #[test]
    fn update_of_unknown_node_is_a_no_op() {
        let mut graph = FlowGraph::new();
        graph.add_node(NodeType::Sms, Position::default());
        let before = graph.snapshot();

        assert_eq!(graph.update_node_data("sms-missing", &patch(json!({ "template": "x" }))), Ok(false));
        assert!(!graph.move_node("sms-missing", Position::new(1.0, 1.0)));
        assert!(!graph.set_node_title("sms-missing", "x"));
        assert_eq!(graph.snapshot(), before);
    }

    #[test]
    fn input_options_come_from_text_lines() {
        let mut graph = FlowGraph::new();
        let input = graph.add_node(NodeType::Input, Position::default());
        let delay = graph.add_node(NodeType::Delay, Position::default());

        assert_eq!(graph.set_input_options(&input.id, "red\n\ngreen\n"), Ok(true));
        match &graph.node(&input.id).unwrap().data {
            NodeData::Input(data) => assert_eq!(data.options, ["red", "green"]),
            other => panic!("unexpected payload {other:?}"),
        }

        let revision = graph.revision();
        assert!(graph.set_input_options(&delay.id, "red").is_err());
        assert_eq!(graph.set_input_options("input-missing", "red"), Ok(false));
        assert_eq!(graph.revision(), revision);
    }

    #[test]
    fn remove_node_cascades_to_attached_edges() {
        // A → B → C, remove B
        let mut graph = FlowGraph::new();
        let a = graph.add_node(NodeType::Trigger, Position::default());
        let b = graph.add_node(NodeType::Sms, Position::default());
        let c = graph.add_node(NodeType::Email, Position::default());
        graph.connect(&a.id, &b.id, None, None).unwrap();
        graph.connect(&b.id, &c.id, None, None).unwrap();

        let removed = graph.remove_node(&b.id).unwrap();

        assert_eq!(removed.id, b.id);
        let ids: Vec<&str> = graph.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec![a.id.as_str(), c.id.as_str()]);
        assert!(graph.edges().is_empty());
        assert!(validate_flow(graph.flow()).is_ok());
    }

    #[test]
    fn connect_is_permissive() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(NodeType::Sms, Position::default());
        let b = graph.add_node(NodeType::Sms, Position::default());

        let first = graph.connect(&a.id, &b.id, None, None).unwrap();
        let parallel = graph.connect(&a.id, &b.id, None, None).unwrap();
        let back = graph.connect(&b.id, &a.id, None, None).unwrap();
        let self_loop = graph.connect(&a.id, &a.id, None, None).unwrap();

        assert_ne!(first.id, parallel.id);
        assert_eq!(back.source, b.id);
        assert_eq!(self_loop.source, self_loop.target);
        assert_eq!(graph.edges().len(), 4);
    }

    #[test]
    fn connect_to_missing_node_is_refused() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(NodeType::Sms, Position::default());
        assert!(graph.connect(&a.id, "ghost", None, None).is_none());
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn remove_edge_and_clear() {
        let mut graph = FlowGraph::new();
        let a = graph.add_node(NodeType::Sms, Position::default());
        let edge = graph.connect(&a.id, &a.id, None, None).unwrap();

        assert_eq!(graph.remove_edge(&edge.id), Some(edge.clone()));
        assert_eq!(graph.remove_edge(&edge.id), None);
        assert_eq!(graph.nodes().len(), 1);

        graph.clear();
        assert!(graph.flow().is_empty());
    }

    #[test]
    fn from_flow_repairs_dangling_edges() {
        let flow = Flow {
            nodes: vec![FlowNode {
                id: "sms-1".into(),
                position: Position::default(),
                data: NodeData::Sms(SmsData::default()),
            }],
            edges: vec![FlowEdge {
                id: "edge-1".into(),
                source: "sms-1".into(),
                target: "gone".into(),
                source_handle: None,
                target_handle: None,
                label: None,
            }],
        };

        let graph = FlowGraph::from_flow(flow);
        assert_eq!(graph.nodes().len(), 1);
        assert!(graph.edges().is_empty());
        assert_eq!(graph.revision(), 0);
    }
}
