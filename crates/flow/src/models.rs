//! Core domain models for a campaign flow.
//!
//! These types are the source of truth for what a flow looks like in
//! memory, and they serialise to the exact JSON layout the campaign
//! collection is persisted in:
//!
//! ```json
//! { "nodes": [{ "id": "sms-…", "type": "sms", "position": {"x": 0, "y": 0},
//!               "data": { "type": "sms", "title": "SMS Message", "template": "" } }],
//!   "edges": [{ "id": "edge-…", "source": "…", "target": "…", "sourceHandle": "false" }] }
//! ```

use nodes::{NodeData, NodeType, FALSE_HANDLE};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::FlowError;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A point in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// ---------------------------------------------------------------------------
// FlowNode
// ---------------------------------------------------------------------------

/// A single campaign step placed on the canvas.
///
/// The step type is derived from the payload, so the two can never disagree
/// in memory.  On the wire `type` is written both on the node and inside
/// `data`; reading checks that they match.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawFlowNode")]
pub struct FlowNode {
    /// `"{type}-{suffix}"`, unique within its flow.
    pub id: String,
    pub position: Position,
    pub data: NodeData,
}

impl FlowNode {
    pub fn node_type(&self) -> NodeType {
        self.data.node_type()
    }

    pub fn title(&self) -> &str {
        self.data.title()
    }
}

impl Serialize for FlowNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut node = serializer.serialize_struct("FlowNode", 4)?;
        node.serialize_field("id", &self.id)?;
        node.serialize_field("type", &self.node_type())?;
        node.serialize_field("position", &self.position)?;
        node.serialize_field("data", &self.data)?;
        node.end()
    }
}

/// Wire shape of a node.  Extra canvas bookkeeping (`width`, `selected`,
/// `dragging`, ...) is ignored.
#[derive(Deserialize)]
struct RawFlowNode {
    id: String,
    #[serde(rename = "type")]
    node_type: NodeType,
    #[serde(default)]
    position: Position,
    #[serde(default)]
    data: Value,
}

impl TryFrom<RawFlowNode> for FlowNode {
    type Error = FlowError;

    fn try_from(raw: RawFlowNode) -> Result<Self, Self::Error> {
        let mut data = match raw.data {
            Value::Object(map) => map,
            Value::Null => Default::default(),
            other => {
                return Err(FlowError::MalformedNode {
                    node_id: raw.id,
                    message: format!("node data must be an object, got {other}"),
                })
            }
        };
        // Payloads missing their tag inherit the node-level type.
        data.entry("type")
            .or_insert_with(|| Value::String(raw.node_type.as_str().to_owned()));

        let data: NodeData =
            serde_json::from_value(Value::Object(data)).map_err(|e| FlowError::MalformedNode {
                node_id: raw.id.clone(),
                message: e.to_string(),
            })?;

        if data.node_type() != raw.node_type {
            return Err(FlowError::NodeTypeMismatch {
                node_id: raw.id,
                declared: raw.node_type,
                payload: data.node_type(),
            });
        }

        Ok(Self {
            id: raw.id,
            position: raw.position,
            data,
        })
    }
}

// ---------------------------------------------------------------------------
// FlowEdge
// ---------------------------------------------------------------------------

/// Directed connection from one node's output handle to another node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    /// Output port on `source`; `None` is the node's default port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl FlowEdge {
    /// `true` if either end of the edge is `node_id`.
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }

    /// `true` for edges leaving a condition node through its "false" port.
    pub fn is_false_branch(&self) -> bool {
        self.source_handle.as_deref() == Some(FALSE_HANDLE)
    }
}

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

/// The directed graph of steps for one campaign.  An empty flow is valid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Flow {
    #[serde(default)]
    pub nodes: Vec<FlowNode>,
    #[serde(default)]
    pub edges: Vec<FlowEdge>,
}

impl Flow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&FlowEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Edges leaving `node_id`, in insertion order.
    pub fn outgoing<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a FlowEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    /// Edges arriving at `node_id`, in insertion order.
    pub fn incoming<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a FlowEdge> + 'a {
        self.edges.iter().filter(move |e| e.target == node_id)
    }
}
