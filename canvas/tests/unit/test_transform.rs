//! Merge and split transforms against a fake backend

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use civic_canvas::errors::CanvasError;
use civic_canvas::exec::transform::{run_transform, TRANSFORM_OUTPUTS_KEY};
use civic_canvas::graph::store::{GraphStore, NodeUpdate};
use civic_canvas::http::client::HttpClient;
use openapi_client::models::TransformRequest;
use serde_json::{json, Value};

use crate::common::{shared, spawn_backend, store_with};

type Seen = Arc<Mutex<Vec<TransformRequest>>>;

async fn merge(State(seen): State<Seen>, Json(body): Json<TransformRequest>) -> Json<Value> {
    seen.lock().unwrap().push(body.clone());
    Json(json!({"success": true, "outputs": [body.inputs.join("|")]}))
}

async fn split(State(seen): State<Seen>, Json(body): Json<TransformRequest>) -> Json<Value> {
    seen.lock().unwrap().push(body.clone());
    Json(json!({"success": true, "outputs": ["train", "test"], "message": "80/20"}))
}

async fn backend() -> (HttpClient, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let base_url = spawn_backend(
        Router::new()
            .route("/api/v1/transform/merge", post(merge))
            .route("/api/v1/transform/split", post(split))
            .with_state(seen.clone()),
    )
    .await;
    (HttpClient::new(&base_url, None).unwrap(), seen)
}

fn set_csv(store: &mut GraphStore, node_id: &str, csv: &str) {
    store
        .update_node(node_id, NodeUpdate::parameter("csvContent", json!(csv)))
        .unwrap();
}

fn merge_graph() -> GraphStore {
    let mut store = store_with(&[("left", "csv_input"), ("right", "csv_input"), ("merge-1", "merge")]);
    set_csv(&mut store, "left", "id\n1\n");
    set_csv(&mut store, "right", "id\n2\n");
    store
}

#[tokio::test]
async fn test_merge_sends_inputs_in_port_order() {
    let (client, seen) = backend().await;
    let mut graph = merge_graph();
    // wired in reverse so connection order differs from port order
    graph.connect(("right", "output"), ("merge-1", "input2")).unwrap();
    graph.connect(("left", "output"), ("merge-1", "input1")).unwrap();
    let store = shared(graph);

    let response = run_transform(&client, &store, "merge-1").await.unwrap();
    assert_eq!(response.outputs, vec!["id\n1\n|id\n2\n"]);

    let requests = seen.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].node_id, "merge-1");
    assert_eq!(requests[0].inputs, vec!["id\n1\n", "id\n2\n"]);

    let store = store.read().await;
    let node = store.node("merge-1").unwrap();
    assert_eq!(node.data[TRANSFORM_OUTPUTS_KEY]["output"], "id\n1\n|id\n2\n");
    assert!(node.data["lastTransformedAt"].is_string());
}

#[tokio::test]
async fn test_merge_with_one_input_is_rejected_before_sending() {
    let (client, seen) = backend().await;
    let mut graph = merge_graph();
    graph.connect(("left", "output"), ("merge-1", "input1")).unwrap();
    let store = shared(graph);

    match run_transform(&client, &store, "merge-1").await {
        Err(CanvasError::InvalidConnection(message)) => assert!(message.contains("input2")),
        other => panic!("unexpected: {:?}", other),
    }
    assert!(seen.lock().unwrap().is_empty());
    assert!(store.read().await.node("merge-1").unwrap().data.is_empty());
}

#[tokio::test]
async fn test_merge_input_without_csv_is_missing_input() {
    let (client, seen) = backend().await;
    let mut graph = store_with(&[("left", "csv_input"), ("right", "csv_input"), ("merge-1", "merge")]);
    set_csv(&mut graph, "left", "id\n1\n");
    graph.connect(("left", "output"), ("merge-1", "input1")).unwrap();
    graph.connect(("right", "output"), ("merge-1", "input2")).unwrap();
    let store = shared(graph);

    assert!(matches!(
        run_transform(&client, &store, "merge-1").await,
        Err(CanvasError::MissingInput(_))
    ));
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_split_uses_upstream_csv_and_keeps_parameters() {
    let (client, seen) = backend().await;
    let mut graph = store_with(&[("source-1", "csv_input"), ("split-1", "split")]);
    set_csv(&mut graph, "source-1", "id\n1\n2\n");
    graph
        .update_node("split-1", NodeUpdate::parameter("ratio", json!(0.8)))
        .unwrap();
    graph.connect(("source-1", "output"), ("split-1", "input")).unwrap();
    let store = shared(graph);

    let response = run_transform(&client, &store, "split-1").await.unwrap();
    assert_eq!(response.message.as_deref(), Some("80/20"));

    let requests = seen.lock().unwrap().clone();
    assert_eq!(requests[0].inputs, vec!["id\n1\n2\n"]);
    assert_eq!(requests[0].parameters["ratio"], 0.8);

    let store = store.read().await;
    let outputs = &store.node("split-1").unwrap().data[TRANSFORM_OUTPUTS_KEY];
    assert_eq!(outputs["output1"], "train");
    assert_eq!(outputs["output2"], "test");
}

#[tokio::test]
async fn test_analysis_node_has_no_transform() {
    let (client, _) = backend().await;
    let store = shared(store_with(&[("eda-1", "eda")]));

    assert!(matches!(
        run_transform(&client, &store, "eda-1").await,
        Err(CanvasError::ExecutionFailed(_))
    ));
}
