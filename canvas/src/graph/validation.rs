//! Connection validation
//!
//! Two checks share the same arity rule for merge nodes:
//! [`validate_connection`] runs before a connection is inserted, and
//! [`validate_merge_node_connections`] audits a node's existing connections.
//! Node types other than `merge` have no rules and always pass.

use serde::Serialize;

use crate::graph::NodeMap;
use crate::models::library::{MERGE, MERGE_INPUT_PORTS};
use crate::models::workflow::{Connection, Node};

/// Number of input connections a merge node needs
pub const MERGE_REQUIRED_INPUTS: usize = 2;

/// Outcome of a validation check
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_message: Option<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            error_message: None,
            warning_message: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error_message: Some(message.into()),
            warning_message: None,
        }
    }

    pub fn with_warning(mut self, message: impl Into<String>) -> Self {
        self.warning_message = Some(message.into());
        self
    }
}

fn incoming<'a>(node_id: &'a str, connections: &'a [Connection]) -> impl Iterator<Item = &'a Connection> {
    connections.iter().filter(move |c| c.target_node_id == node_id)
}

/// Check a candidate connection against the current graph before inserting it
pub fn validate_connection(
    candidate: &Connection,
    nodes: &NodeMap,
    connections: &[Connection],
) -> ValidationResult {
    match nodes.get(&candidate.target_node_id) {
        Some(target) if target.node_type == MERGE => {
            validate_merge_candidate(target, &candidate.target_port_id, connections)
        }
        _ => ValidationResult::valid(),
    }
}

fn validate_merge_candidate(
    node: &Node,
    port_id: &str,
    connections: &[Connection],
) -> ValidationResult {
    if !MERGE_INPUT_PORTS.contains(&port_id) {
        return ValidationResult::invalid(format!(
            "Invalid input port '{}'. Merge nodes accept only {} and {}",
            port_id, MERGE_INPUT_PORTS[0], MERGE_INPUT_PORTS[1]
        ));
    }

    if incoming(&node.id, connections).any(|c| c.target_port_id == port_id) {
        return ValidationResult::invalid(format!(
            "Port {} is already connected. Each merge input accepts one connection",
            port_id
        ));
    }

    let existing = incoming(&node.id, connections).count();
    if existing >= MERGE_REQUIRED_INPUTS {
        return ValidationResult::invalid(format!(
            "Merge node can only have exactly {} input connections",
            MERGE_REQUIRED_INPUTS
        ));
    }

    if existing + 1 < MERGE_REQUIRED_INPUTS {
        let other = MERGE_INPUT_PORTS
            .iter()
            .find(|p| **p != port_id)
            .copied()
            .unwrap_or_default();
        return ValidationResult::valid()
            .with_warning(format!("Merge node still needs a connection on {}", other));
    }

    ValidationResult::valid()
}

/// Audit the connections a node already has
pub fn validate_merge_node_connections(node: &Node, connections: &[Connection]) -> ValidationResult {
    if node.node_type != MERGE {
        return ValidationResult::valid();
    }

    let bound: Vec<&str> = incoming(&node.id, connections)
        .map(|c| c.target_port_id.as_str())
        .collect();

    if bound.len() > MERGE_REQUIRED_INPUTS {
        return ValidationResult::invalid(format!(
            "Merge node has too many input connections ({}); it requires exactly {}",
            bound.len(),
            MERGE_REQUIRED_INPUTS
        ));
    }

    if let Some(port) = bound.iter().find(|p| !MERGE_INPUT_PORTS.contains(p)) {
        return ValidationResult::invalid(format!("Invalid input port '{}' on merge node", port));
    }

    if bound.len() == MERGE_REQUIRED_INPUTS && bound[0] == bound[1] {
        return ValidationResult::invalid(format!(
            "Port {} is already connected; {} has no connection",
            bound[0],
            MERGE_INPUT_PORTS
                .iter()
                .find(|p| **p != bound[0])
                .copied()
                .unwrap_or_default()
        ));
    }

    match bound.len() {
        0 => ValidationResult::invalid(format!(
            "Merge node requires exactly {} input connections ({} and {}); none are connected",
            MERGE_REQUIRED_INPUTS, MERGE_INPUT_PORTS[0], MERGE_INPUT_PORTS[1]
        )),
        1 => {
            let missing = MERGE_INPUT_PORTS
                .iter()
                .find(|p| **p != bound[0])
                .copied()
                .unwrap_or_default();
            ValidationResult::invalid(format!(
                "Merge node is missing a connection on {}",
                missing
            ))
        }
        _ => ValidationResult::valid(),
    }
}

/// A problem found by [`validate_workflow`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowIssue {
    /// Offending node, or the connection for dangling references
    pub subject_id: String,
    pub message: String,
}

/// Workflow-level health report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkflowReport {
    pub issues: Vec<WorkflowIssue>,
}

impl WorkflowReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Run the full-state audit over every node and connection
pub fn validate_workflow(nodes: &NodeMap, connections: &[Connection]) -> WorkflowReport {
    let mut report = WorkflowReport::default();

    for conn in connections {
        for node_id in [&conn.source_node_id, &conn.target_node_id] {
            if !nodes.contains_key(node_id) {
                report.issues.push(WorkflowIssue {
                    subject_id: conn.id.clone(),
                    message: format!("Connection references missing node '{}'", node_id),
                });
            }
        }
    }

    for node in nodes.values() {
        let result = validate_merge_node_connections(node, connections);
        if let Some(message) = result.error_message {
            report.issues.push(WorkflowIssue {
                subject_id: node.id.clone(),
                message,
            });
        }
    }

    report
}
