//! Graph store
//!
//! Holds the nodes and connections of the workflow being edited together
//! with transient editor state (viewport, zoom, selection, in-progress
//! connection). Every connection mutation keeps the cached `connected` flag
//! on the affected ports in sync.

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::CanvasError;
use crate::graph::validation::{validate_connection, validate_workflow, ValidationResult, WorkflowReport};
use crate::graph::NodeMap;
use crate::models::workflow::{Connection, Node, PortType, Viewport, Workflow};
use crate::utils::{clamp_zoom, generate_id};

/// Offset applied to a duplicated node's position
const DUPLICATE_OFFSET: f64 = 40.0;

/// Current selection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub node_id: Option<String>,
    pub connection_id: Option<String>,
}

/// A connection gesture started from an output port and not yet finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConnection {
    pub source_node_id: String,
    pub source_port_id: String,
}

/// Partial node update. `None` fields are left alone; `parameters` and
/// `data` are merged key by key.
#[derive(Debug, Clone, Default)]
pub struct NodeUpdate {
    pub name: Option<String>,
    pub position: Option<(f64, f64)>,
    pub size: Option<(f64, f64)>,
    pub color: Option<String>,
    pub parameters: Option<Map<String, Value>>,
    pub data: Option<Map<String, Value>>,
}

impl NodeUpdate {
    pub fn parameter(key: &str, value: Value) -> Self {
        let mut parameters = Map::new();
        parameters.insert(key.to_string(), value);
        Self {
            parameters: Some(parameters),
            ..Default::default()
        }
    }
}

/// In-memory workflow graph
#[derive(Debug, Clone)]
pub struct GraphStore {
    name: String,
    nodes: NodeMap,
    connections: Vec<Connection>,
    viewport: Viewport,
    zoom: f64,
    selection: Selection,
    connecting: Option<PendingConnection>,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new("Untitled Workflow")
    }
}

impl GraphStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: NodeMap::new(),
            connections: Vec::new(),
            viewport: Viewport::default(),
            zoom: 1.0,
            selection: Selection::default(),
            connecting: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &NodeMap {
        &self.nodes
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection(&self, connection_id: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == connection_id)
    }

    /// Nodes feeding into the given node's inputs, in connection order
    pub fn upstream(&self, node_id: &str) -> Vec<&Node> {
        self.connections
            .iter()
            .filter(|c| c.target_node_id == node_id)
            .filter_map(|c| self.nodes.get(&c.source_node_id))
            .collect()
    }

    // ----------------------------------------------------------------- nodes

    /// Add a node. Its port flags are recomputed from the current connections.
    pub fn add_node(&mut self, node: Node) -> Result<(), CanvasError> {
        if self.nodes.contains_key(&node.id) {
            return Err(CanvasError::DuplicateNode(node.id));
        }
        let node_id = node.id.clone();
        debug!("Adding node {} ({})", node_id, node.node_type);
        self.nodes.insert(node_id.clone(), node);
        self.refresh_port_flags(&node_id);
        Ok(())
    }

    pub fn update_node(&mut self, node_id: &str, update: NodeUpdate) -> Result<(), CanvasError> {
        let node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| CanvasError::NodeNotFound(node_id.to_string()))?;

        if let Some(name) = update.name {
            node.name = name;
        }
        if let Some((x, y)) = update.position {
            node.x = x;
            node.y = y;
        }
        if let Some((width, height)) = update.size {
            node.width = width;
            node.height = height;
        }
        if let Some(color) = update.color {
            node.color = color;
        }
        if let Some(parameters) = update.parameters {
            node.parameters.extend(parameters);
        }
        if let Some(data) = update.data {
            node.data.extend(data);
        }
        Ok(())
    }

    /// Delete a node and every connection where it is source or target
    pub fn delete_node(&mut self, node_id: &str) -> Result<Node, CanvasError> {
        let node = self
            .nodes
            .remove(node_id)
            .ok_or_else(|| CanvasError::NodeNotFound(node_id.to_string()))?;

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.connections)
            .into_iter()
            .partition(|c| c.touches(node_id));
        self.connections = kept;

        for conn in &removed {
            self.refresh_port_flags(&conn.source_node_id);
            self.refresh_port_flags(&conn.target_node_id);
            if self.selection.connection_id.as_deref() == Some(conn.id.as_str()) {
                self.selection.connection_id = None;
            }
        }

        if self.selection.node_id.as_deref() == Some(node_id) {
            self.selection.node_id = None;
        }
        if self
            .connecting
            .as_ref()
            .is_some_and(|p| p.source_node_id == node_id)
        {
            self.connecting = None;
        }

        debug!(
            "Deleted node {} and {} incident connection(s)",
            node_id,
            removed.len()
        );
        Ok(node)
    }

    /// Copy a node under a fresh id, offset on the canvas, with no connections
    pub fn duplicate_node(&mut self, node_id: &str) -> Result<String, CanvasError> {
        let mut copy = self
            .nodes
            .get(node_id)
            .cloned()
            .ok_or_else(|| CanvasError::NodeNotFound(node_id.to_string()))?;

        copy.id = format!("{}-{}", copy.node_type, generate_id());
        copy.name = format!("{} (copy)", copy.name);
        copy.x += DUPLICATE_OFFSET;
        copy.y += DUPLICATE_OFFSET;
        for port in copy.inputs.iter_mut().chain(copy.outputs.iter_mut()) {
            port.connected = false;
        }

        let copy_id = copy.id.clone();
        self.add_node(copy)?;
        Ok(copy_id)
    }

    // ----------------------------------------------------------- connections

    /// Insert a connection without running the connection rules.
    ///
    /// Both endpoints must exist: the source port among the source node's
    /// outputs and the target port among the target node's inputs.
    pub fn add_connection(&mut self, connection: Connection) -> Result<(), CanvasError> {
        if self.connection(&connection.id).is_some() {
            return Err(CanvasError::InvalidConnection(format!(
                "connection id '{}' is already in use",
                connection.id
            )));
        }
        self.check_endpoints(&connection)?;

        if let Some(port) = self
            .nodes
            .get_mut(&connection.source_node_id)
            .and_then(|n| n.output_port_mut(&connection.source_port_id))
        {
            port.connected = true;
        }
        if let Some(port) = self
            .nodes
            .get_mut(&connection.target_node_id)
            .and_then(|n| n.input_port_mut(&connection.target_port_id))
        {
            port.connected = true;
        }

        debug!(
            "Connected {}.{} -> {}.{}",
            connection.source_node_id,
            connection.source_port_id,
            connection.target_node_id,
            connection.target_port_id
        );
        self.connections.push(connection);
        Ok(())
    }

    /// Validate and insert a connection between two ports.
    ///
    /// Returns the validation result (possibly carrying a warning) when the
    /// connection was inserted, or `InvalidConnection` when it was rejected.
    pub fn connect(
        &mut self,
        source: (&str, &str),
        target: (&str, &str),
    ) -> Result<ValidationResult, CanvasError> {
        if source.0 == target.0 {
            return Err(CanvasError::InvalidConnection(
                "a node cannot connect to itself".to_string(),
            ));
        }

        let connection_type = self
            .nodes
            .get(source.0)
            .and_then(|n| n.output_port(source.1))
            .map(|p| p.port_type)
            .unwrap_or(PortType::Main);
        let candidate = Connection::new(
            format!("conn-{}", generate_id()),
            source,
            target,
            connection_type,
        );
        self.check_endpoints(&candidate)?;

        let result = validate_connection(&candidate, &self.nodes, &self.connections);
        if !result.is_valid {
            let message = result
                .error_message
                .unwrap_or_else(|| "connection rejected".to_string());
            warn!("Rejected connection to {}.{}: {}", target.0, target.1, message);
            return Err(CanvasError::InvalidConnection(message));
        }

        self.add_connection(candidate)?;
        Ok(result)
    }

    /// Delete a connection. A port's `connected` flag is cleared only when no
    /// remaining connection references the same (node, port) pair.
    pub fn delete_connection(&mut self, connection_id: &str) -> Result<Connection, CanvasError> {
        let index = self
            .connections
            .iter()
            .position(|c| c.id == connection_id)
            .ok_or_else(|| CanvasError::ConnectionNotFound(connection_id.to_string()))?;
        let removed = self.connections.remove(index);

        let source_in_use = self
            .connections
            .iter()
            .any(|c| c.uses_source(&removed.source_node_id, &removed.source_port_id));
        if let Some(port) = self
            .nodes
            .get_mut(&removed.source_node_id)
            .and_then(|n| n.output_port_mut(&removed.source_port_id))
        {
            port.connected = source_in_use;
        }

        let target_in_use = self
            .connections
            .iter()
            .any(|c| c.uses_target(&removed.target_node_id, &removed.target_port_id));
        if let Some(port) = self
            .nodes
            .get_mut(&removed.target_node_id)
            .and_then(|n| n.input_port_mut(&removed.target_port_id))
        {
            port.connected = target_in_use;
        }

        if self.selection.connection_id.as_deref() == Some(connection_id) {
            self.selection.connection_id = None;
        }
        Ok(removed)
    }

    fn check_endpoints(&self, connection: &Connection) -> Result<(), CanvasError> {
        let source = self
            .nodes
            .get(&connection.source_node_id)
            .ok_or_else(|| CanvasError::NodeNotFound(connection.source_node_id.clone()))?;
        if source.output_port(&connection.source_port_id).is_none() {
            return Err(CanvasError::PortNotFound {
                node_id: connection.source_node_id.clone(),
                port_id: connection.source_port_id.clone(),
            });
        }

        let target = self
            .nodes
            .get(&connection.target_node_id)
            .ok_or_else(|| CanvasError::NodeNotFound(connection.target_node_id.clone()))?;
        if target.input_port(&connection.target_port_id).is_none() {
            return Err(CanvasError::PortNotFound {
                node_id: connection.target_node_id.clone(),
                port_id: connection.target_port_id.clone(),
            });
        }
        Ok(())
    }

    /// Recompute every port flag on a node from the connection list
    fn refresh_port_flags(&mut self, node_id: &str) {
        let Some(node) = self.nodes.get_mut(node_id) else {
            return;
        };
        for port in node.outputs.iter_mut() {
            port.connected = self.connections.iter().any(|c| c.uses_source(node_id, &port.id));
        }
        for port in node.inputs.iter_mut() {
            port.connected = self.connections.iter().any(|c| c.uses_target(node_id, &port.id));
        }
    }

    // ------------------------------------------------------------ selection

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn select_node(&mut self, node_id: Option<&str>) {
        self.selection.node_id = node_id
            .filter(|id| self.nodes.contains_key(*id))
            .map(str::to_string);
    }

    pub fn select_connection(&mut self, connection_id: Option<&str>) {
        self.selection.connection_id = connection_id
            .filter(|id| self.connection(id).is_some())
            .map(str::to_string);
    }

    pub fn clear_selection(&mut self) {
        self.selection = Selection::default();
    }

    // ------------------------------------------------------------- viewport

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Set the zoom factor, clamped to [0.1, 2.0]. Returns the applied value.
    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        self.zoom = clamp_zoom(zoom);
        self.zoom
    }

    // -------------------------------------------------------- connecting

    pub fn connecting(&self) -> Option<&PendingConnection> {
        self.connecting.as_ref()
    }

    /// Begin a connection gesture from an output port
    pub fn start_connecting(&mut self, node_id: &str, port_id: &str) -> Result<(), CanvasError> {
        let node = self
            .nodes
            .get(node_id)
            .ok_or_else(|| CanvasError::NodeNotFound(node_id.to_string()))?;
        if node.output_port(port_id).is_none() {
            return Err(CanvasError::PortNotFound {
                node_id: node_id.to_string(),
                port_id: port_id.to_string(),
            });
        }
        self.connecting = Some(PendingConnection {
            source_node_id: node_id.to_string(),
            source_port_id: port_id.to_string(),
        });
        Ok(())
    }

    /// Finish the connection gesture. Dropping on an input port attempts the
    /// connection; dropping on empty canvas (`None`) cancels it. The gesture
    /// ends either way.
    pub fn end_connecting(
        &mut self,
        target: Option<(&str, &str)>,
    ) -> Result<Option<ValidationResult>, CanvasError> {
        let Some(pending) = self.connecting.take() else {
            return Ok(None);
        };
        match target {
            Some(target) => self
                .connect(
                    (pending.source_node_id.as_str(), pending.source_port_id.as_str()),
                    target,
                )
                .map(Some),
            None => Ok(None),
        }
    }

    // ------------------------------------------------------------ workflow

    /// Run the workflow-level health audit
    pub fn validate(&self) -> WorkflowReport {
        validate_workflow(&self.nodes, &self.connections)
    }

    /// Snapshot the graph as a saveable workflow
    pub fn to_workflow(&self) -> Workflow {
        Workflow {
            name: self.name.clone(),
            nodes: self.nodes.values().cloned().collect(),
            connections: self.connections.clone(),
            viewport: self.viewport,
            zoom: self.zoom,
            timestamp: Utc::now(),
        }
    }

    /// Replace the graph with a loaded workflow. Editor state is reset; the
    /// nodes and connections are taken as they are.
    pub fn load_workflow(&mut self, workflow: Workflow) {
        self.name = workflow.name;
        self.nodes = workflow
            .nodes
            .into_iter()
            .map(|n| (n.id.clone(), n))
            .collect();
        self.connections = workflow.connections;
        self.viewport = workflow.viewport;
        self.zoom = clamp_zoom(workflow.zoom);
        self.selection = Selection::default();
        self.connecting = None;
    }
}
