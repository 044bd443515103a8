//! Execution orchestrator

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use civic_canvas::errors::CanvasError;
use civic_canvas::exec::chain::{FunctionChain, FUNCTION_CHAIN_KEY};
use civic_canvas::exec::orchestrator::{
    CsvSource, ExecutionBackend, ExecutionOrchestrator, ExecutionStatus,
};
use civic_canvas::graph::store::{GraphStore, NodeUpdate};
use civic_canvas::http::client::HttpClient;
use civic_canvas::models::workflow::EXECUTION_RESULTS_KEY;
use civic_canvas::storage::local::{LocalStorage, StoredCsv};
use civic_canvas::storage::settings::ExecutionSettings;
use openapi_client::models::{
    ExecutionRequest, ExecutionResponse, Library, LibraryResults,
};
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;

use crate::common::{shared, spawn_backend, store_with, temp_dir};

/// Backend that records requests and answers with a canned response
struct FakeBackend {
    requests: Mutex<Vec<ExecutionRequest>>,
    response: Result<ExecutionResponse, String>,
}

impl FakeBackend {
    fn answering(response: ExecutionResponse) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            response: Ok(response),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            response: Err(message.to_string()),
        })
    }

    fn requests(&self) -> Vec<ExecutionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutionBackend for FakeBackend {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResponse, CanvasError> {
        self.requests.lock().unwrap().push(request.clone());
        self.response
            .clone()
            .map_err(|message| CanvasError::BackendError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: message,
            })
    }
}

fn describe_chain() -> FunctionChain {
    FunctionChain::new()
        .with(Library::Pandas, "describe", Map::new())
        .with(Library::Matplotlib, "hist", Map::new())
}

fn library(success: bool, plots: Vec<Value>, tables: Vec<Value>) -> Option<LibraryResults> {
    Some(LibraryResults {
        success,
        error: (!success).then(|| "failed".to_string()),
        plots,
        tables,
        ..Default::default()
    })
}

fn full_success() -> ExecutionResponse {
    ExecutionResponse {
        success: true,
        pandas_results: library(true, vec![], vec![json!({"name": "describe"})]),
        matplotlib_results: library(true, vec![json!("iVBORw0KGgo=")], vec![]),
        download_url: Some("/api/v1/eda-download/exec-1".to_string()),
        execution_id: Some("exec-1".to_string()),
        ..Default::default()
    }
}

/// eda-1 carries CSV content and a chain; source-1 feeds it
fn analysis_store() -> GraphStore {
    let mut store = store_with(&[("source-1", "csv_input"), ("eda-1", "eda")]);
    store.connect(("source-1", "output"), ("eda-1", "input")).unwrap();
    store
        .update_node(
            "eda-1",
            NodeUpdate::parameter(FUNCTION_CHAIN_KEY, describe_chain().to_parameter().unwrap()),
        )
        .unwrap();
    store
}

fn set_param(store: &mut GraphStore, node_id: &str, key: &str, value: &str) {
    store
        .update_node(node_id, NodeUpdate::parameter(key, Value::from(value)))
        .unwrap();
}

async fn orchestrator(
    backend: Arc<dyn ExecutionBackend>,
    store: Arc<RwLock<GraphStore>>,
) -> (ExecutionOrchestrator, LocalStorage) {
    let local = LocalStorage::new(temp_dir().await);
    let orchestrator =
        ExecutionOrchestrator::new(backend, store, local.clone(), ExecutionSettings::default());
    (orchestrator, local)
}

#[tokio::test]
async fn test_success_writes_results_onto_node() {
    let mut graph = analysis_store();
    set_param(&mut graph, "eda-1", "csvContent", "a,b\n1,2\n");
    set_param(&mut graph, "eda-1", "filename", "own.csv");
    let store = shared(graph);
    let backend = FakeBackend::answering(full_success());
    let (orchestrator, _) = orchestrator(backend.clone(), store.clone()).await;

    let outcome = orchestrator.execute("eda-1", None).await.unwrap();

    assert_eq!(outcome.status, ExecutionStatus::Success);
    assert_eq!(outcome.input_source, CsvSource::Node);
    assert_eq!(outcome.plot_count, 1);
    assert_eq!(outcome.table_count, 1);

    let request = &backend.requests()[0];
    assert_eq!(request.node_id, "eda-1");
    assert_eq!(request.workflow_type, "eda");
    assert_eq!(request.function_chain.len(), 2);
    assert_eq!(request.input_data.filename.as_deref(), Some("own.csv"));
    assert!(request.generate_download_link);
    assert!(!request.colab_optimized);

    let store = store.read().await;
    let node = store.node("eda-1").unwrap();
    let results = node.parameters.get(EXECUTION_RESULTS_KEY).unwrap();
    assert_eq!(results["execution_id"], "exec-1");
    assert_eq!(node.data["plots"].as_array().unwrap().len(), 1);
    assert_eq!(node.data["tables"].as_array().unwrap().len(), 1);
    assert_eq!(node.data["downloadUrl"], "/api/v1/eda-download/exec-1");
}

#[tokio::test]
async fn test_csv_from_upstream_node() {
    let mut graph = analysis_store();
    set_param(&mut graph, "source-1", "fileContent", "x\n1\n");
    let store = shared(graph);
    let backend = FakeBackend::answering(full_success());
    let (orchestrator, _) = orchestrator(backend.clone(), store).await;

    let outcome = orchestrator.execute("eda-1", None).await.unwrap();

    assert_eq!(outcome.input_source, CsvSource::Upstream("source-1".to_string()));
    assert_eq!(backend.requests()[0].input_data.csv_content, "x\n1\n");
}

#[tokio::test]
async fn test_csv_from_local_storage_fallback() {
    let store = shared(analysis_store());
    let backend = FakeBackend::answering(full_success());
    let (orchestrator, local) = orchestrator(backend.clone(), store).await;
    local
        .set_last_uploaded_csv(&StoredCsv {
            content: "y\n2\n".to_string(),
            filename: "stored.csv".to_string(),
            timestamp: Utc::now(),
            columns: vec!["y".to_string()],
            shape: (1, 1),
        })
        .await
        .unwrap();

    let outcome = orchestrator.execute("eda-1", None).await.unwrap();

    assert_eq!(outcome.input_source, CsvSource::LocalStorage);
    let request = &backend.requests()[0];
    assert_eq!(request.input_data.csv_content, "y\n2\n");
    assert_eq!(request.input_data.filename.as_deref(), Some("stored.csv"));
}

#[tokio::test]
async fn test_missing_csv_is_reported_before_sending() {
    let store = shared(analysis_store());
    let backend = FakeBackend::answering(full_success());
    let (orchestrator, _) = orchestrator(backend.clone(), store).await;

    assert!(matches!(
        orchestrator.execute("eda-1", None).await,
        Err(CanvasError::MissingInput(_))
    ));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_empty_chain_is_rejected() {
    let mut graph = store_with(&[("eda-1", "eda")]);
    set_param(&mut graph, "eda-1", "csvContent", "a\n1\n");
    let backend = FakeBackend::answering(full_success());
    let (orchestrator, _) = orchestrator(backend.clone(), shared(graph)).await;

    assert!(matches!(
        orchestrator.execute("eda-1", None).await,
        Err(CanvasError::MissingInput(_))
    ));

    let outcome = orchestrator.execute("eda-1", Some(describe_chain())).await;
    assert!(outcome.is_ok());
}

#[tokio::test]
async fn test_backend_failure_leaves_node_untouched() {
    let mut graph = analysis_store();
    set_param(&mut graph, "eda-1", "csvContent", "a\n1\n");
    let before = graph.node("eda-1").unwrap().clone();
    let store = shared(graph);
    let backend = FakeBackend::failing("boom");
    let (orchestrator, _) = orchestrator(backend, store.clone()).await;

    assert!(matches!(
        orchestrator.execute("eda-1", None).await,
        Err(CanvasError::BackendError { .. })
    ));
    assert_eq!(store.read().await.node("eda-1").unwrap(), &before);
}

#[tokio::test]
async fn test_partial_success_is_still_applied() {
    let mut graph = analysis_store();
    set_param(&mut graph, "eda-1", "csvContent", "a\n1\n");
    let store = shared(graph);
    let backend = FakeBackend::answering(ExecutionResponse {
        success: false,
        pandas_results: library(true, vec![], vec![json!({"rows": 1})]),
        matplotlib_results: library(false, vec![], vec![]),
        ..Default::default()
    });
    let (orchestrator, _) = orchestrator(backend, store.clone()).await;

    let outcome = orchestrator.execute("eda-1", None).await.unwrap();

    assert_eq!(
        outcome.status,
        ExecutionStatus::PartialSuccess {
            failed: vec![Library::Matplotlib]
        }
    );
    assert!(outcome.message.contains("matplotlib"));
    assert!(store
        .read()
        .await
        .node("eda-1")
        .unwrap()
        .execution_results()
        .is_some());
}

#[tokio::test]
async fn test_total_failure_response_leaves_node_untouched() {
    let mut graph = analysis_store();
    set_param(&mut graph, "eda-1", "csvContent", "a\n1\n");
    let before = graph.node("eda-1").unwrap().clone();
    let store = shared(graph);
    let backend = FakeBackend::answering(ExecutionResponse {
        success: false,
        error: Some("bad csv".to_string()),
        ..Default::default()
    });
    let (orchestrator, _) = orchestrator(backend, store.clone()).await;

    assert!(matches!(
        orchestrator.execute("eda-1", None).await,
        Err(CanvasError::ExecutionFailed(_))
    ));
    assert_eq!(store.read().await.node("eda-1").unwrap(), &before);
}

#[tokio::test]
async fn test_execute_many_runs_every_node() {
    let mut graph = store_with(&[("eda-1", "eda"), ("eda-2", "eda")]);
    for id in ["eda-1", "eda-2"] {
        set_param(&mut graph, id, "csvContent", "a\n1\n");
        graph
            .update_node(
                id,
                NodeUpdate::parameter(FUNCTION_CHAIN_KEY, describe_chain().to_parameter().unwrap()),
            )
            .unwrap();
    }
    let backend = FakeBackend::answering(full_success());
    let (orchestrator, _) = orchestrator(backend.clone(), shared(graph)).await;

    let results = orchestrator
        .execute_many(&["eda-1".to_string(), "eda-2".to_string(), "ghost".to_string()])
        .await;

    assert_eq!(backend.requests().len(), 2);
    assert!(results[0].1.is_ok());
    assert!(results[1].1.is_ok());
    assert!(matches!(results[2].1, Err(CanvasError::NodeNotFound(_))));
}

type Received = Arc<Mutex<Vec<Value>>>;

async fn execute_handler(State(received): State<Received>, Json(body): Json<Value>) -> Json<Value> {
    received.lock().unwrap().push(body);
    Json(json!({
        "success": true,
        "pandas_results": {"success": true, "tables": [{"name": "head"}]},
        "execution_id": "exec-http",
        "download_url": "/api/v1/eda-download/exec-http",
        "colab_url": "https://colab.example/notebook"
    }))
}

#[tokio::test]
async fn test_http_backend_round_trip() {
    let received: Received = Arc::new(Mutex::new(Vec::new()));
    let base_url = spawn_backend(
        Router::new()
            .route("/api/v1/eda-execute/", post(execute_handler))
            .with_state(received.clone()),
    )
    .await;
    let client = Arc::new(HttpClient::new(&base_url, None).unwrap());

    let mut graph = analysis_store();
    set_param(&mut graph, "eda-1", "csvContent", "a\n1\n");
    let store = shared(graph);
    let (orchestrator, _) = orchestrator(client, store.clone()).await;

    let outcome = orchestrator.execute("eda-1", None).await.unwrap();
    assert_eq!(outcome.execution_id.as_deref(), Some("exec-http"));

    let body = received.lock().unwrap()[0].clone();
    assert_eq!(body["node_id"], "eda-1");
    assert_eq!(body["function_chain"][0]["library"], "pandas");
    assert_eq!(body["function_chain"][0]["function"], "describe");
    assert_eq!(body["input_data"]["csv_content"], "a\n1\n");
    assert_eq!(body["generate_download_link"], true);

    let store = store.read().await;
    let results = store.node("eda-1").unwrap().execution_results().unwrap();
    assert_eq!(results["colab_url"], "https://colab.example/notebook");
}

#[tokio::test]
async fn test_http_backend_error_status() {
    async fn failing() -> (StatusCode, &'static str) {
        (StatusCode::BAD_GATEWAY, "upstream down")
    }
    let base_url = spawn_backend(Router::new().route("/api/v1/eda-execute/", post(failing))).await;
    let client = Arc::new(HttpClient::new(&base_url, None).unwrap());

    let mut graph = analysis_store();
    set_param(&mut graph, "eda-1", "csvContent", "a\n1\n");
    let (orchestrator, _) = orchestrator(client, shared(graph)).await;

    match orchestrator.execute("eda-1", None).await {
        Err(CanvasError::BackendError { status, body }) => {
            assert_eq!(status, StatusCode::BAD_GATEWAY);
            assert_eq!(body, "upstream down");
        }
        other => panic!("unexpected: {:?}", other.map(|o| o.message)),
    }
}
