//! Data upload API

use openapi_client::models::{UploadCsvRequest, UploadCsvResponse};

use crate::errors::CanvasError;
use crate::http::client::HttpClient;

impl HttpClient {
    /// Upload CSV content for profiling
    pub async fn upload_csv(
        &self,
        csv_content: &str,
        filename: &str,
    ) -> Result<UploadCsvResponse, CanvasError> {
        let body = UploadCsvRequest {
            csv_content: csv_content.to_string(),
            filename: filename.to_string(),
        };
        self.post("/data/upload-csv", &body).await
    }
}
