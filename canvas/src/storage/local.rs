//! Local key-value storage
//!
//! Each key is a JSON file in one directory. Reads and writes are
//! last-writer-wins with no versioning.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::errors::CanvasError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Key holding the most recently uploaded CSV
pub const LAST_UPLOADED_CSV: &str = "lastUploadedCSV";

/// The most recently uploaded CSV and what the backend reported about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCsv {
    pub content: String,
    pub filename: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub columns: Vec<String>,
    /// (rows, columns)
    #[serde(default)]
    pub shape: (u64, u64),
}

/// Directory-backed local storage
#[derive(Debug, Clone)]
pub struct LocalStorage {
    dir: Dir,
}

impl LocalStorage {
    pub fn new(dir: Dir) -> Self {
        Self { dir }
    }

    fn entry(&self, key: &str) -> File {
        self.dir.file(&format!("{}.json", key))
    }

    /// Read a key. Missing keys yield `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CanvasError> {
        let file = self.entry(key);
        if !file.exists().await {
            return Ok(None);
        }
        Ok(Some(file.read_json().await?))
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CanvasError> {
        debug!("Writing local storage key {}", key);
        self.entry(key).write_json(value).await
    }

    pub async fn last_uploaded_csv(&self) -> Result<Option<StoredCsv>, CanvasError> {
        self.get(LAST_UPLOADED_CSV).await
    }

    pub async fn set_last_uploaded_csv(&self, csv: &StoredCsv) -> Result<(), CanvasError> {
        self.set(LAST_UPLOADED_CSV, csv).await
    }
}
