//! Execution API

use openapi_client::models::{ExecutionRequest, ExecutionResponse};
use url::Url;

use crate::errors::CanvasError;
use crate::http::client::HttpClient;

/// Query for `GET /eda-download/{execution_id}`
#[derive(Debug, Clone)]
pub struct DownloadQuery {
    pub execution_id: String,
    pub filename: String,
    pub format: String,
    pub node_id: String,
}

impl DownloadQuery {
    fn path(&self) -> String {
        format!("/eda-download/{}", self.execution_id)
    }

    fn pairs(&self) -> [(&str, &str); 4] {
        [
            ("execution_id", self.execution_id.as_str()),
            ("filename", self.filename.as_str()),
            ("format", self.format.as_str()),
            ("node_id", self.node_id.as_str()),
        ]
    }
}

impl HttpClient {
    /// Run a function chain on the backend
    pub async fn execute_chain(&self, request: &ExecutionRequest) -> Result<ExecutionResponse, CanvasError> {
        self.post("/eda-execute/", request).await
    }

    /// Fetch an execution's downloadable results
    pub async fn download(&self, query: &DownloadQuery) -> Result<Vec<u8>, CanvasError> {
        self.get_bytes(&query.path(), &query.pairs()).await
    }

    /// The full download link for an execution, for handing to a browser
    pub fn download_url(&self, query: &DownloadQuery) -> Result<Url, CanvasError> {
        Ok(Url::parse_with_params(&self.url(&query.path()), query.pairs())?)
    }
}
