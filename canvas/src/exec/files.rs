//! CSV upload and result download

use chrono::Utc;
use openapi_client::models::UploadCsvResponse;
use tracing::info;

use crate::errors::CanvasError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::http::client::HttpClient;
use crate::http::execution::DownloadQuery;
use crate::storage::local::{LocalStorage, StoredCsv};

/// Upload a CSV and remember it as the last uploaded CSV.
///
/// Local storage is only written once the backend accepted the upload.
pub async fn upload_csv(
    client: &HttpClient,
    local_storage: &LocalStorage,
    content: &str,
    filename: &str,
) -> Result<UploadCsvResponse, CanvasError> {
    let response = client.upload_csv(content, filename).await?;
    info!(
        "Uploaded {}: {} rows x {} columns",
        filename, response.shape.0, response.shape.1
    );

    let stored = StoredCsv {
        content: content.to_string(),
        filename: filename.to_string(),
        timestamp: Utc::now(),
        columns: response.columns.clone(),
        shape: response.shape,
    };
    local_storage.set_last_uploaded_csv(&stored).await?;
    Ok(response)
}

/// Download an execution's results into a directory
pub async fn download_results(
    client: &HttpClient,
    downloads_dir: &Dir,
    query: &DownloadQuery,
) -> Result<File, CanvasError> {
    let name = std::path::Path::new(&query.filename)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            CanvasError::ConfigError(format!("invalid download file name '{}'", query.filename))
        })?;

    let bytes = client.download(query).await?;
    let file = downloads_dir.file(name);
    file.write_atomic(&bytes).await?;
    info!(
        "Downloaded {} bytes for execution {} to {}",
        bytes.len(),
        query.execution_id,
        file.path().display()
    );
    Ok(file)
}
