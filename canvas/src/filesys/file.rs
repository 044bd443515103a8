//! File operations

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::CanvasError;

/// A file on disk, addressed by path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    path: PathBuf,
}

impl File {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without directories
    pub fn name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    pub async fn read_string(&self) -> Result<String, CanvasError> {
        Ok(fs::read_to_string(&self.path).await?)
    }

    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, CanvasError> {
        let contents = self.read_string().await?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Write bytes through a uniquely named sibling temp file and rename into
    /// place. Parent directories are created as needed.
    pub async fn write_atomic(&self, contents: &[u8]) -> Result<(), CanvasError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_name = format!(
            "{}.{}.tmp",
            self.name().unwrap_or("file"),
            uuid::Uuid::new_v4()
        );
        let temp_path = self.path.with_file_name(temp_name);
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    pub async fn write_string(&self, contents: &str) -> Result<(), CanvasError> {
        self.write_atomic(contents.as_bytes()).await
    }

    pub async fn write_json<T: Serialize>(&self, value: &T) -> Result<(), CanvasError> {
        let contents = serde_json::to_string_pretty(value)?;
        self.write_string(&contents).await
    }
}
