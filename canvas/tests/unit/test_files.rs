//! Upload, download and local storage against a fake backend

use std::collections::HashMap;

use axum::extract::{Path, Query};
use axum::routing::{get, post};
use axum::{Json, Router};
use civic_canvas::exec::files::{download_results, upload_csv};
use civic_canvas::http::client::HttpClient;
use civic_canvas::http::execution::DownloadQuery;
use civic_canvas::storage::local::LocalStorage;
use openapi_client::models::{UploadCsvRequest, UploadCsvResponse};
use serde_json::json;

use crate::common::{spawn_backend, temp_dir};

async fn upload_handler(Json(body): Json<UploadCsvRequest>) -> Json<UploadCsvResponse> {
    let mut lines = body.csv_content.lines();
    let columns: Vec<String> = lines
        .next()
        .unwrap_or_default()
        .split(',')
        .map(str::to_string)
        .collect();
    let rows = lines.count() as u64;
    Json(UploadCsvResponse {
        shape: (rows, columns.len() as u64),
        columns,
        summary: json!({"filename": body.filename}),
    })
}

async fn download_handler(
    Path(execution_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> String {
    format!(
        "{}|{}|{}",
        execution_id,
        query.get("format").cloned().unwrap_or_default(),
        query.get("node_id").cloned().unwrap_or_default()
    )
}

#[tokio::test]
async fn test_upload_records_last_uploaded_csv() {
    let base_url = spawn_backend(
        Router::new().route("/api/v1/data/upload-csv", post(upload_handler)),
    )
    .await;
    let client = HttpClient::new(&base_url, None).unwrap();
    let dir = temp_dir().await;
    let local = LocalStorage::new(dir.subdir("local-storage"));

    assert!(local.last_uploaded_csv().await.unwrap().is_none());

    let response = upload_csv(&client, &local, "a,b\n1,2\n3,4\n", "tiny.csv")
        .await
        .unwrap();
    assert_eq!(response.shape, (2, 2));

    let stored = local.last_uploaded_csv().await.unwrap().unwrap();
    assert_eq!(stored.filename, "tiny.csv");
    assert_eq!(stored.columns, vec!["a", "b"]);
    assert_eq!(stored.shape, (2, 2));

    dir.delete().await.unwrap();
}

#[tokio::test]
async fn test_failed_upload_leaves_local_storage_alone() {
    let base_url = spawn_backend(Router::new()).await;
    let client = HttpClient::new(&base_url, None).unwrap();
    let dir = temp_dir().await;
    let local = LocalStorage::new(dir.subdir("local-storage"));

    assert!(upload_csv(&client, &local, "a\n1\n", "x.csv").await.is_err());
    assert!(local.last_uploaded_csv().await.unwrap().is_none());

    dir.delete().await.unwrap();
}

#[tokio::test]
async fn test_download_sends_query_and_writes_file() {
    let base_url = spawn_backend(
        Router::new().route("/api/v1/eda-download/{execution_id}", get(download_handler)),
    )
    .await;
    let client = HttpClient::new(&base_url, None).unwrap();
    let dir = temp_dir().await;

    let query = DownloadQuery {
        execution_id: "exec-42".to_string(),
        filename: "../escape.csv".to_string(),
        format: "csv".to_string(),
        node_id: "eda-1".to_string(),
    };
    let file = download_results(&client, &dir, &query).await.unwrap();

    assert_eq!(file.path(), dir.path().join("escape.csv"));
    assert_eq!(file.read_string().await.unwrap(), "exec-42|csv|eda-1");

    dir.delete().await.unwrap();
}
