//! Workflow graph models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameter key under which execution responses are stored on a node
pub const EXECUTION_RESULTS_KEY: &str = "executionResults";

/// A saved workflow: the unit written to and read from workflow files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Workflow name
    pub name: String,

    /// Nodes in the workflow
    pub nodes: Vec<Node>,

    /// Connections between node ports
    pub connections: Vec<Connection>,

    /// Canvas pan offset
    #[serde(default)]
    pub viewport: Viewport,

    /// Canvas zoom factor
    #[serde(default = "default_zoom")]
    pub zoom: f64,

    /// Save time
    pub timestamp: DateTime<Utc>,
}

fn default_zoom() -> f64 {
    1.0
}

/// Canvas pan offset
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
}

/// A node in the workflow graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique node ID
    pub id: String,

    /// Node type (e.g., "csv_input", "merge", "eda")
    #[serde(rename = "type")]
    pub node_type: String,

    /// Display name
    pub name: String,

    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub color: String,

    /// Input ports
    #[serde(default)]
    pub inputs: Vec<Port>,

    /// Output ports
    #[serde(default)]
    pub outputs: Vec<Port>,

    /// User-editable configuration, also the home of execution results
    #[serde(default)]
    pub parameters: Map<String, Value>,

    /// Display data derived from execution (plots, tables)
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Node {
    pub fn input_port(&self, port_id: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.id == port_id)
    }

    pub fn output_port(&self, port_id: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.id == port_id)
    }

    pub fn input_port_mut(&mut self, port_id: &str) -> Option<&mut Port> {
        self.inputs.iter_mut().find(|p| p.id == port_id)
    }

    pub fn output_port_mut(&mut self, port_id: &str) -> Option<&mut Port> {
        self.outputs.iter_mut().find(|p| p.id == port_id)
    }

    /// Get a string parameter
    pub fn parameter_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(|v| v.as_str())
    }

    /// The response of the last successful execution, if any
    pub fn execution_results(&self) -> Option<&Value> {
        self.parameters.get(EXECUTION_RESULTS_KEY)
    }
}

/// Port kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortType {
    #[default]
    Main,
    Data,
    Condition,
}

/// A port on a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    /// Port ID, unique within its side of the node
    pub id: String,

    #[serde(rename = "type", default)]
    pub port_type: PortType,

    pub label: String,

    /// Cached: true while at least one connection references this port
    #[serde(default)]
    pub connected: bool,
}

impl Port {
    pub fn new(id: &str, port_type: PortType, label: &str) -> Self {
        Self {
            id: id.to_string(),
            port_type,
            label: label.to_string(),
            connected: false,
        }
    }
}

/// A directed connection from an output port to an input port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: String,
    pub source_node_id: String,
    pub source_port_id: String,
    pub target_node_id: String,
    pub target_port_id: String,
    #[serde(rename = "type", default)]
    pub connection_type: PortType,
}

impl Connection {
    pub fn new(
        id: impl Into<String>,
        source: (&str, &str),
        target: (&str, &str),
        connection_type: PortType,
    ) -> Self {
        Self {
            id: id.into(),
            source_node_id: source.0.to_string(),
            source_port_id: source.1.to_string(),
            target_node_id: target.0.to_string(),
            target_port_id: target.1.to_string(),
            connection_type,
        }
    }

    /// Whether this connection starts or ends at the node
    pub fn touches(&self, node_id: &str) -> bool {
        self.source_node_id == node_id || self.target_node_id == node_id
    }

    pub fn uses_source(&self, node_id: &str, port_id: &str) -> bool {
        self.source_node_id == node_id && self.source_port_id == port_id
    }

    pub fn uses_target(&self, node_id: &str, port_id: &str) -> bool {
        self.target_node_id == node_id && self.target_port_id == port_id
    }
}
