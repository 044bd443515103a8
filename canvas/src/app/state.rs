//! Application state management

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::app::options::AppOptions;
use crate::errors::CanvasError;
use crate::exec::orchestrator::ExecutionOrchestrator;
use crate::filesys::file::File;
use crate::graph::store::GraphStore;
use crate::http::client::HttpClient;
use crate::storage::layout::StorageLayout;
use crate::storage::local::LocalStorage;
use crate::storage::workflow_file::{load_workflow, save_workflow};

/// Everything one editing session needs
pub struct AppState {
    pub layout: StorageLayout,
    pub http_client: Arc<HttpClient>,
    pub local_storage: LocalStorage,
    pub store: Arc<RwLock<GraphStore>>,
    pub orchestrator: ExecutionOrchestrator,
}

impl AppState {
    /// Initialize application state
    pub async fn init(options: AppOptions) -> Result<Self, CanvasError> {
        info!("Initializing civic canvas (backend {})", options.backend_base_url);

        options.layout.setup().await?;

        let http_client = Arc::new(HttpClient::new(
            &options.backend_base_url,
            options.request_timeout,
        )?);
        let local_storage = LocalStorage::new(options.layout.local_storage_dir());
        let store = Arc::new(RwLock::new(GraphStore::default()));
        let orchestrator = ExecutionOrchestrator::new(
            http_client.clone(),
            store.clone(),
            local_storage.clone(),
            options.execution,
        );

        Ok(Self {
            layout: options.layout,
            http_client,
            local_storage,
            store,
            orchestrator,
        })
    }

    /// Replace the current graph with a workflow file
    pub async fn open_workflow(&self, file: &File) -> Result<(), CanvasError> {
        let workflow = load_workflow(file).await?;
        info!(
            "Opened workflow '{}' ({} nodes)",
            workflow.name,
            workflow.nodes.len()
        );
        self.store.write().await.load_workflow(workflow);
        Ok(())
    }

    /// Write the current graph to a workflow file
    pub async fn save_workflow(&self, file: &File) -> Result<(), CanvasError> {
        let workflow = self.store.read().await.to_workflow();
        save_workflow(file, &workflow).await
    }
}
