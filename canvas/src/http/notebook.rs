//! Notebook server API

use openapi_client::models::{NotebookFiles, NotebookStatus};

use crate::errors::CanvasError;
use crate::http::client::HttpClient;

impl HttpClient {
    pub async fn start_notebook(&self) -> Result<NotebookStatus, CanvasError> {
        self.post_empty("/notebook/start").await
    }

    pub async fn stop_notebook(&self) -> Result<NotebookStatus, CanvasError> {
        self.post_empty("/notebook/stop").await
    }

    pub async fn notebook_status(&self) -> Result<NotebookStatus, CanvasError> {
        self.get("/notebook/status").await
    }

    /// List files available to the notebook server
    pub async fn check_notebook_files(&self) -> Result<NotebookFiles, CanvasError> {
        self.get("/notebook/check-files").await
    }

    pub async fn cleanup_notebook(&self) -> Result<NotebookStatus, CanvasError> {
        self.post_empty("/notebook/cleanup").await
    }
}
