//! Node library: default shape and ports for each node type

use serde_json::Map;

use crate::models::workflow::{Node, Port, PortType};
use crate::utils::generate_id;

pub const CSV_INPUT: &str = "csv_input";
pub const MERGE: &str = "merge";
pub const SPLIT: &str = "split";
pub const EDA: &str = "eda";
pub const PANDAS: &str = "pandas";
pub const NUMPY: &str = "numpy";
pub const MATPLOTLIB: &str = "matplotlib";
pub const OUTPUT: &str = "output";

/// Merge node input port names
pub const MERGE_INPUT_PORTS: [&str; 2] = ["input1", "input2"];

const DEFAULT_WIDTH: f64 = 200.0;
const DEFAULT_HEIGHT: f64 = 100.0;

/// Template for a node type
#[derive(Debug, Clone)]
pub struct NodeTemplate {
    pub node_type: &'static str,
    pub name: &'static str,
    pub color: &'static str,
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
}

impl NodeTemplate {
    /// Look up the template for a node type. Unknown types get a generic
    /// single-input, single-output shape.
    pub fn for_type(node_type: &str) -> NodeTemplate {
        match node_type {
            CSV_INPUT => NodeTemplate {
                node_type: CSV_INPUT,
                name: "CSV Input",
                color: "#4CAF50",
                inputs: vec![],
                outputs: vec![Port::new("output", PortType::Data, "Data")],
            },
            MERGE => NodeTemplate {
                node_type: MERGE,
                name: "Merge",
                color: "#FF9800",
                inputs: vec![
                    Port::new("input1", PortType::Data, "Left"),
                    Port::new("input2", PortType::Data, "Right"),
                ],
                outputs: vec![Port::new("output", PortType::Data, "Merged")],
            },
            SPLIT => NodeTemplate {
                node_type: SPLIT,
                name: "Split",
                color: "#9C27B0",
                inputs: vec![Port::new("input", PortType::Data, "Data")],
                outputs: vec![
                    Port::new("output1", PortType::Data, "Train"),
                    Port::new("output2", PortType::Data, "Test"),
                ],
            },
            EDA | PANDAS | NUMPY | MATPLOTLIB => NodeTemplate {
                node_type: analysis_type(node_type),
                name: analysis_name(node_type),
                color: "#2196F3",
                inputs: vec![Port::new("input", PortType::Data, "Data")],
                outputs: vec![Port::new("output", PortType::Data, "Results")],
            },
            OUTPUT => NodeTemplate {
                node_type: OUTPUT,
                name: "Output",
                color: "#607D8B",
                inputs: vec![Port::new("input", PortType::Main, "Input")],
                outputs: vec![],
            },
            _ => NodeTemplate {
                node_type: "custom",
                name: "Node",
                color: "#9E9E9E",
                inputs: vec![Port::new("input", PortType::Main, "Input")],
                outputs: vec![Port::new("output", PortType::Main, "Output")],
            },
        }
    }

    /// Instantiate the template at a canvas position
    pub fn instantiate(&self, node_type: &str, x: f64, y: f64) -> Node {
        Node {
            id: format!("{}-{}", node_type, generate_id()),
            node_type: node_type.to_string(),
            name: self.name.to_string(),
            x,
            y,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            color: self.color.to_string(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            parameters: Map::new(),
            data: Map::new(),
        }
    }
}

fn analysis_type(node_type: &str) -> &'static str {
    match node_type {
        PANDAS => PANDAS,
        NUMPY => NUMPY,
        MATPLOTLIB => MATPLOTLIB,
        _ => EDA,
    }
}

fn analysis_name(node_type: &str) -> &'static str {
    match node_type {
        PANDAS => "Pandas",
        NUMPY => "NumPy",
        MATPLOTLIB => "Matplotlib",
        _ => "EDA",
    }
}

/// Create a fresh node of the given type with its default ports
pub fn create_node(node_type: &str, x: f64, y: f64) -> Node {
    NodeTemplate::for_type(node_type).instantiate(node_type, x, y)
}

/// Whether the node type runs through the remote execution endpoint
pub fn is_analysis_type(node_type: &str) -> bool {
    matches!(node_type, EDA | PANDAS | NUMPY | MATPLOTLIB)
}
