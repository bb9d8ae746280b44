//! The editing policy layer between the canvas and the flow graph.
//!
//! `FlowEditor` turns canvas gestures into graph mutations and applies the
//! editing rules that have data-model consequences:
//!
//! 1. Nodes added from the toolbox land in the centre of the visible canvas;
//!    dropped nodes land under the cursor.  Both go through the current
//!    pan/zoom transform.
//! 2. A title left blank when its field loses focus reverts to the type's
//!    default title.
//! 3. Every mutation that changes the flow submits a full snapshot to the
//!    change queue.  Snapshots are coalesced downstream; the newest one
//!    always wins.

use std::sync::Arc;

use nodes::NodeType;
use queue::SnapshotQueue;
use serde_json::{Map, Value};
use tracing::debug;

use crate::graph::FlowGraph;
use crate::models::{Flow, FlowEdge, FlowNode, Position};
use crate::FlowError;

// ---------------------------------------------------------------------------
// Viewport
// ---------------------------------------------------------------------------

/// Pan offset (screen pixels) and zoom factor of the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Viewport {
    pub const MIN_ZOOM: f64 = 0.1;
    pub const MAX_ZOOM: f64 = 1.5;

    /// Zoom is clamped to `[MIN_ZOOM, MAX_ZOOM]`; a non-finite zoom resets to 1.
    pub fn new(x: f64, y: f64, zoom: f64) -> Self {
        let zoom = if zoom.is_finite() {
            zoom.clamp(Self::MIN_ZOOM, Self::MAX_ZOOM)
        } else {
            1.0
        };
        Self { x, y, zoom }
    }

    /// Convert a point in screen space to canvas space.
    pub fn screen_to_canvas(&self, screen: Position, bounds: &CanvasBounds) -> Position {
        Position {
            x: (screen.x - bounds.left - self.x) / self.zoom,
            y: (screen.y - bounds.top - self.y) / self.zoom,
        }
    }

    /// Canvas point currently shown at the centre of the canvas element.
    pub fn visible_center(&self, bounds: &CanvasBounds) -> Position {
        self.screen_to_canvas(bounds.center(), bounds)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, zoom: 1.0 }
    }
}

/// Screen-space rectangle of the canvas element.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CanvasBounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CanvasBounds {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    pub fn center(&self) -> Position {
        Position {
            x: self.left + self.width / 2.0,
            y: self.top + self.height / 2.0,
        }
    }
}

/// A connect gesture: drag from a source handle onto a target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Connection {
    pub source: String,
    pub target: String,
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
}

impl Connection {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            ..Self::default()
        }
    }

    pub fn with_source_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }

    pub fn with_target_handle(mut self, handle: impl Into<String>) -> Self {
        self.target_handle = Some(handle.into());
        self
    }
}

// ---------------------------------------------------------------------------
// FlowEditor
// ---------------------------------------------------------------------------

/// One editing session over a flow.
///
/// Selection, viewport and canvas bounds are runtime-only: they never appear
/// in the snapshots handed to the change queue.
pub struct FlowEditor {
    graph: FlowGraph,
    viewport: Viewport,
    bounds: CanvasBounds,
    selected: Option<String>,
    changes: Arc<SnapshotQueue<Flow>>,
}

impl FlowEditor {
    /// Open `flow` for editing; every change is submitted to `changes`.
    pub fn new(flow: Flow, changes: Arc<SnapshotQueue<Flow>>) -> Self {
        Self {
            graph: FlowGraph::from_flow(flow),
            viewport: Viewport::default(),
            bounds: CanvasBounds::default(),
            selected: None,
            changes,
        }
    }

    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    pub fn flow(&self) -> &Flow {
        self.graph.flow()
    }

    pub fn changes(&self) -> &Arc<SnapshotQueue<Flow>> {
        &self.changes
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Pan/zoom changed.  Not a flow mutation.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// The canvas element was laid out or resized.
    pub fn set_bounds(&mut self, bounds: CanvasBounds) {
        self.bounds = bounds;
    }

    pub fn selected(&self) -> Option<&FlowNode> {
        self.selected.as_deref().and_then(|id| self.graph.node(id))
    }

    /// Submit the current state downstream.
    fn publish(&self) -> u64 {
        let seq = self.changes.submit(self.graph.snapshot());
        debug!(seq, revision = self.graph.revision(), "flow change published");
        seq
    }

    // -----------------------------------------------------------------------
    // Adding nodes
    // -----------------------------------------------------------------------

    /// Toolbox click: add a node in the centre of the visible canvas.
    pub fn add_node_centered(&mut self, node_type: NodeType) -> FlowNode {
        let position = self.viewport.visible_center(&self.bounds);
        self.add_node_at(node_type, position)
    }

    /// Drag-and-drop: add a node where it was dropped.
    ///
    /// `type_name` is the step type carried by the drag payload.
    ///
    /// # Errors
    /// [`FlowError::UnknownNodeType`] if the payload does not name a step type.
    pub fn drop_node(&mut self, type_name: &str, screen: Position) -> Result<FlowNode, FlowError> {
        let node_type: NodeType = type_name.parse()?;
        let position = self.viewport.screen_to_canvas(screen, &self.bounds);
        Ok(self.add_node_at(node_type, position))
    }

    /// Add a node at a position already in canvas space.
    pub fn add_node_at(&mut self, node_type: NodeType, position: Position) -> FlowNode {
        let node = self.graph.add_node(node_type, position);
        self.publish();
        node
    }

    // -----------------------------------------------------------------------
    // Editing nodes
    // -----------------------------------------------------------------------

    /// Drag move finished.
    pub fn move_node(&mut self, node_id: &str, position: Position) -> bool {
        let moved = self.graph.move_node(node_id, position);
        if moved {
            self.publish();
        }
        moved
    }

    /// Merge a partial payload into a node.  See [`FlowGraph::update_node_data`].
    pub fn update_node_data(
        &mut self,
        node_id: &str,
        patch: &Map<String, Value>,
    ) -> Result<bool, FlowError> {
        let updated = self.graph.update_node_data(node_id, patch)?;
        if updated {
            self.publish();
        }
        Ok(updated)
    }

    /// The options text area of an input step changed.
    /// See [`FlowGraph::set_input_options`].
    pub fn set_input_options(&mut self, node_id: &str, text: &str) -> Result<bool, FlowError> {
        let updated = self.graph.set_input_options(node_id, text)?;
        if updated {
            self.publish();
        }
        Ok(updated)
    }

    /// Keystroke in a title field.  The text is stored as typed, even blank.
    pub fn edit_title(&mut self, node_id: &str, text: &str) -> bool {
        let updated = self.graph.set_node_title(node_id, text);
        if updated {
            self.publish();
        }
        updated
    }

    /// The title field lost focus.
    ///
    /// A blank or whitespace-only title reverts to the type's default title.
    /// Returns `true` if the title was reverted.
    pub fn blur_title(&mut self, node_id: &str) -> bool {
        let Some(node) = self.graph.node(node_id) else {
            return false;
        };
        if !node.data.has_blank_title() {
            return false;
        }

        let default_title = node.node_type().default_title();
        self.graph.set_node_title(node_id, default_title);
        debug!(node_id, default_title, "blank title reverted");
        self.publish();
        true
    }

    pub fn remove_node(&mut self, node_id: &str) -> Option<FlowNode> {
        let removed = self.graph.remove_node(node_id)?;
        if self.selected.as_deref() == Some(node_id) {
            self.selected = None;
        }
        self.publish();
        Some(removed)
    }

    // -----------------------------------------------------------------------
    // Edges
    // -----------------------------------------------------------------------

    pub fn connect(&mut self, connection: Connection) -> Option<FlowEdge> {
        let Connection { source, target, source_handle, target_handle } = connection;
        let edge = self.graph.connect(&source, &target, source_handle, target_handle)?;
        self.publish();
        Some(edge)
    }

    pub fn remove_edge(&mut self, edge_id: &str) -> Option<FlowEdge> {
        let edge = self.graph.remove_edge(edge_id)?;
        self.publish();
        Some(edge)
    }

    /// "Clear All": empty the canvas.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.selected = None;
        self.publish();
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Node click.  Returns `false` if the node does not exist.
    pub fn select(&mut self, node_id: &str) -> bool {
        if self.graph.node(node_id).is_none() {
            return false;
        }
        self.selected = Some(node_id.to_owned());
        true
    }

    /// Background click.
    pub fn deselect(&mut self) {
        self.selected = None;
    }

    /// Close the session and hand back the final flow.
    pub fn into_flow(self) -> Flow {
        self.graph.into_flow()
    }
}
