//! Execution orchestrator
//!
//! Builds an execution request from a node's parameters, sends it to the
//! backend and writes a successful response back onto the node. The store
//! lock is never held across the backend call. Requests are not retried or
//! deduplicated, and two executions of the same node may overlap.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use openapi_client::models::{ExecutionRequest, ExecutionResponse, InputData, Library};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::errors::CanvasError;
use crate::exec::chain::FunctionChain;
use crate::graph::store::{GraphStore, NodeUpdate};
use crate::http::client::HttpClient;
use crate::models::workflow::{Node, EXECUTION_RESULTS_KEY};
use crate::storage::local::LocalStorage;
use crate::storage::settings::ExecutionSettings;

/// Node parameter keys that may hold CSV content, checked in order
pub const CSV_CONTENT_KEYS: [&str; 2] = ["csvContent", "fileContent"];

/// Node parameter keys that may hold the CSV file name, checked in order
pub const FILENAME_KEYS: [&str; 2] = ["filename", "fileName"];

/// Something that can run an execution request
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResponse, CanvasError>;
}

#[async_trait]
impl ExecutionBackend for HttpClient {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResponse, CanvasError> {
        self.execute_chain(request).await
    }
}

/// Where a request's CSV content came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvSource {
    /// The executed node's own parameters
    Node,
    /// An upstream node connected to the executed node
    Upstream(String),
    /// The last uploaded CSV in local storage
    LocalStorage,
}

/// How an execution ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    /// Some library chains failed while others succeeded
    PartialSuccess { failed: Vec<Library> },
}

/// Result of a successful (or partially successful) execution
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub node_id: String,
    pub status: ExecutionStatus,
    /// Message for display
    pub message: String,
    pub input_source: CsvSource,
    pub execution_id: Option<String>,
    pub download_url: Option<String>,
    pub plot_count: usize,
    pub table_count: usize,
}

/// Coordinates execution between the graph store and the backend
pub struct ExecutionOrchestrator {
    backend: Arc<dyn ExecutionBackend>,
    store: Arc<RwLock<GraphStore>>,
    local_storage: LocalStorage,
    settings: ExecutionSettings,
}

impl ExecutionOrchestrator {
    pub fn new(
        backend: Arc<dyn ExecutionBackend>,
        store: Arc<RwLock<GraphStore>>,
        local_storage: LocalStorage,
        settings: ExecutionSettings,
    ) -> Self {
        Self {
            backend,
            store,
            local_storage,
            settings,
        }
    }

    /// Assemble the request for a node. `chain` overrides the chain stored
    /// on the node.
    pub async fn build_request(
        &self,
        node_id: &str,
        chain: Option<FunctionChain>,
    ) -> Result<(ExecutionRequest, CsvSource), CanvasError> {
        let (chain, local_input) = {
            let store = self.store.read().await;
            let node = store
                .node(node_id)
                .ok_or_else(|| CanvasError::NodeNotFound(node_id.to_string()))?;
            let chain = match chain {
                Some(chain) => chain,
                None => FunctionChain::from_node(node)?,
            };
            (chain, csv_from_graph(&store, node))
        };

        if chain.is_empty() {
            return Err(CanvasError::MissingInput(format!(
                "node {} has no functions to execute",
                node_id
            )));
        }

        let (input_data, source) = match local_input {
            Some(found) => found,
            None => {
                let stored = self.local_storage.last_uploaded_csv().await?.ok_or_else(|| {
                    CanvasError::MissingInput(format!(
                        "no CSV data found for node {}; upload a CSV first",
                        node_id
                    ))
                })?;
                let input = InputData {
                    csv_content: stored.content,
                    filename: Some(stored.filename),
                };
                (input, CsvSource::LocalStorage)
            }
        };

        let request = ExecutionRequest {
            node_id: node_id.to_string(),
            workflow_type: self.settings.workflow_type.clone(),
            function_chain: chain.into_calls(),
            input_data,
            generate_download_link: self.settings.generate_download_link,
            colab_optimized: self.settings.colab_optimized,
        };
        Ok((request, source))
    }

    /// Execute a node. On failure the node is left untouched.
    pub async fn execute(
        &self,
        node_id: &str,
        chain: Option<FunctionChain>,
    ) -> Result<ExecutionOutcome, CanvasError> {
        let (request, input_source) = self.build_request(node_id, chain).await?;
        info!(
            "Executing node {} with {} function(s)",
            node_id,
            request.function_chain.len()
        );

        let response = match self.backend.execute(&request).await {
            Ok(response) => response,
            Err(e) => {
                error!("Execution of node {} failed: {}", node_id, e);
                return Err(e);
            }
        };

        let status = classify(&response)?;
        let outcome = self.reconcile(node_id, response, status, input_source).await?;
        info!("Node {}: {}", node_id, outcome.message);
        Ok(outcome)
    }

    /// Execute several nodes at once, without any concurrency limit
    pub async fn execute_many(
        &self,
        node_ids: &[String],
    ) -> Vec<(String, Result<ExecutionOutcome, CanvasError>)> {
        let runs = node_ids.iter().map(|id| async move {
            let result = self.execute(id, None).await;
            (id.clone(), result)
        });
        join_all(runs).await
    }

    async fn reconcile(
        &self,
        node_id: &str,
        response: ExecutionResponse,
        status: ExecutionStatus,
        input_source: CsvSource,
    ) -> Result<ExecutionOutcome, CanvasError> {
        let plots: Vec<Value> = response
            .library_results()
            .into_iter()
            .flat_map(|(_, r)| r.plots.iter().cloned())
            .collect();
        let tables: Vec<Value> = response
            .library_results()
            .into_iter()
            .flat_map(|(_, r)| r.tables.iter().cloned())
            .collect();

        let outcome = ExecutionOutcome {
            node_id: node_id.to_string(),
            message: outcome_message(&status),
            status,
            input_source,
            execution_id: response.execution_id.clone(),
            download_url: response.download_url.clone(),
            plot_count: plots.len(),
            table_count: tables.len(),
        };

        let mut data = Map::new();
        data.insert("plots".to_string(), Value::Array(plots));
        data.insert("tables".to_string(), Value::Array(tables));
        data.insert(
            "downloadUrl".to_string(),
            response.download_url.clone().map_or(Value::Null, Value::String),
        );
        data.insert(
            "executionId".to_string(),
            response.execution_id.clone().map_or(Value::Null, Value::String),
        );
        data.insert(
            "lastExecutedAt".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );

        let mut parameters = Map::new();
        parameters.insert(EXECUTION_RESULTS_KEY.to_string(), serde_json::to_value(&response)?);

        let mut store = self.store.write().await;
        if store.node(node_id).is_none() {
            warn!("Node {} was deleted while executing; discarding results", node_id);
            return Err(CanvasError::NodeNotFound(node_id.to_string()));
        }
        store.update_node(
            node_id,
            NodeUpdate {
                parameters: Some(parameters),
                data: Some(data),
                ..Default::default()
            },
        )?;

        Ok(outcome)
    }
}

/// Find CSV content in the graph: the node itself first, then each upstream
/// node in connection order.
pub(crate) fn csv_from_graph(store: &GraphStore, node: &Node) -> Option<(InputData, CsvSource)> {
    if let Some(input) = csv_from_parameters(node) {
        return Some((input, CsvSource::Node));
    }
    store
        .upstream(&node.id)
        .into_iter()
        .find_map(|up| csv_from_parameters(up).map(|input| (input, CsvSource::Upstream(up.id.clone()))))
}

pub(crate) fn csv_from_parameters(node: &Node) -> Option<InputData> {
    let content = CSV_CONTENT_KEYS
        .iter()
        .find_map(|key| node.parameter_str(key))
        .filter(|content| !content.is_empty())?;
    let filename = FILENAME_KEYS
        .iter()
        .find_map(|key| node.parameter_str(key))
        .map(str::to_string);
    Some(InputData {
        csv_content: content.to_string(),
        filename,
    })
}

/// Decide between success, partial success and failure
fn classify(response: &ExecutionResponse) -> Result<ExecutionStatus, CanvasError> {
    let results = response.library_results();
    let failed: Vec<Library> = results
        .iter()
        .filter(|(_, r)| !r.success)
        .map(|(library, _)| *library)
        .collect();
    let any_succeeded = results.iter().any(|(_, r)| r.success);

    if response.success && failed.is_empty() {
        return Ok(ExecutionStatus::Success);
    }
    if any_succeeded && !failed.is_empty() {
        return Ok(ExecutionStatus::PartialSuccess { failed });
    }

    let message = response
        .error
        .clone()
        .or_else(|| response.message.clone())
        .unwrap_or_else(|| "backend reported failure".to_string());
    Err(CanvasError::ExecutionFailed(message))
}

fn outcome_message(status: &ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Success => "Execution completed successfully".to_string(),
        ExecutionStatus::PartialSuccess { failed } => {
            let names: Vec<&str> = failed.iter().map(Library::as_str).collect();
            format!(
                "Execution completed with some issues ({} did not finish)",
                names.join(", ")
            )
        }
    }
}
