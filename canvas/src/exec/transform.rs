//! Merge and split transforms
//!
//! A merge node sends the CSVs wired into `input1` and `input2`, in port
//! order, to the backend. A split node sends its own CSV or the first one
//! found upstream. The returned CSVs are stored on the node under
//! `data.transformOutputs`, keyed by output port.

use chrono::Utc;
use openapi_client::models::TransformResponse;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::errors::CanvasError;
use crate::exec::orchestrator::{csv_from_graph, csv_from_parameters, CSV_CONTENT_KEYS};
use crate::graph::store::{GraphStore, NodeUpdate};
use crate::graph::validation::validate_merge_node_connections;
use crate::http::client::HttpClient;
use crate::models::library::{MERGE, MERGE_INPUT_PORTS, SPLIT};
use crate::models::workflow::Node;

pub const TRANSFORM_OUTPUTS_KEY: &str = "transformOutputs";

enum TransformInput {
    Merge(String, String),
    Split(String),
}

/// Run a merge or split node through the backend and store its outputs
pub async fn run_transform(
    client: &HttpClient,
    store: &RwLock<GraphStore>,
    node_id: &str,
) -> Result<TransformResponse, CanvasError> {
    let (input, parameters) = {
        let store = store.read().await;
        let node = store
            .node(node_id)
            .ok_or_else(|| CanvasError::NodeNotFound(node_id.to_string()))?;
        (transform_input(&store, node)?, transform_parameters(node))
    };

    let response = match input {
        TransformInput::Merge(left, right) => {
            info!("Merging inputs of node {}", node_id);
            client.transform_merge(node_id, left, right, parameters).await
        }
        TransformInput::Split(csv) => {
            info!("Splitting input of node {}", node_id);
            client.transform_split(node_id, csv, parameters).await
        }
    };
    let response = match response {
        Ok(response) => response,
        Err(e) => {
            error!("Transform of node {} failed: {}", node_id, e);
            return Err(e);
        }
    };
    if !response.success {
        return Err(CanvasError::ExecutionFailed(
            response
                .message
                .clone()
                .unwrap_or_else(|| "transform failed".to_string()),
        ));
    }

    let mut store = store.write().await;
    let outputs: Map<String, Value> = match store.node(node_id) {
        Some(node) => node
            .outputs
            .iter()
            .zip(&response.outputs)
            .map(|(port, csv)| (port.id.clone(), Value::String(csv.clone())))
            .collect(),
        None => {
            warn!("Node {} was deleted while transforming; discarding outputs", node_id);
            return Err(CanvasError::NodeNotFound(node_id.to_string()));
        }
    };

    let mut data = Map::new();
    data.insert(TRANSFORM_OUTPUTS_KEY.to_string(), Value::Object(outputs));
    data.insert(
        "lastTransformedAt".to_string(),
        Value::String(Utc::now().to_rfc3339()),
    );
    store.update_node(
        node_id,
        NodeUpdate {
            data: Some(data),
            ..Default::default()
        },
    )?;

    Ok(response)
}

fn transform_input(store: &GraphStore, node: &Node) -> Result<TransformInput, CanvasError> {
    match node.node_type.as_str() {
        MERGE => {
            let check = validate_merge_node_connections(node, store.connections());
            if !check.is_valid {
                return Err(CanvasError::InvalidConnection(
                    check.error_message.unwrap_or_default(),
                ));
            }
            let [left, right] = MERGE_INPUT_PORTS.map(|port| merge_input(store, node, port));
            Ok(TransformInput::Merge(left?, right?))
        }
        SPLIT => csv_from_graph(store, node)
            .map(|(input, _)| TransformInput::Split(input.csv_content))
            .ok_or_else(|| {
                CanvasError::MissingInput(format!("no CSV data found for node {}", node.id))
            }),
        other => Err(CanvasError::ExecutionFailed(format!(
            "node type '{}' has no transform",
            other
        ))),
    }
}

fn merge_input(store: &GraphStore, node: &Node, port_id: &str) -> Result<String, CanvasError> {
    store
        .connections()
        .iter()
        .find(|c| c.uses_target(&node.id, port_id))
        .and_then(|c| store.node(&c.source_node_id))
        .and_then(csv_from_parameters)
        .map(|input| input.csv_content)
        .ok_or_else(|| {
            CanvasError::MissingInput(format!(
                "no CSV data connected to {} on node {}",
                port_id, node.id
            ))
        })
}

/// The node's parameters without inline CSV content
fn transform_parameters(node: &Node) -> Map<String, Value> {
    node.parameters
        .iter()
        .filter(|(key, _)| !CSV_CONTENT_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
