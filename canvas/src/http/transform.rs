//! Node-specific transform API

use openapi_client::models::{TransformRequest, TransformResponse};
use serde_json::{Map, Value};

use crate::errors::CanvasError;
use crate::http::client::HttpClient;

impl HttpClient {
    /// Merge two CSV inputs
    pub async fn transform_merge(
        &self,
        node_id: &str,
        left: String,
        right: String,
        parameters: Map<String, Value>,
    ) -> Result<TransformResponse, CanvasError> {
        let body = TransformRequest {
            node_id: node_id.to_string(),
            inputs: vec![left, right],
            parameters,
        };
        self.post("/transform/merge", &body).await
    }

    /// Split one CSV input
    pub async fn transform_split(
        &self,
        node_id: &str,
        input: String,
        parameters: Map<String, Value>,
    ) -> Result<TransformResponse, CanvasError> {
        let body = TransformRequest {
            node_id: node_id.to_string(),
            inputs: vec![input],
            parameters,
        };
        self.post("/transform/split", &body).await
    }
}
