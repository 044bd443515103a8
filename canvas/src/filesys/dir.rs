//! Directory operations

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::errors::CanvasError;
use crate::filesys::file::File;

/// A directory on disk, addressed by path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dir {
    path: PathBuf,
}

impl Dir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    /// Create the directory (and parents)
    pub async fn create(&self) -> Result<(), CanvasError> {
        fs::create_dir_all(&self.path).await?;
        Ok(())
    }

    /// Delete the directory and all contents
    pub async fn delete(&self) -> Result<(), CanvasError> {
        if self.exists().await {
            fs::remove_dir_all(&self.path).await?;
        }
        Ok(())
    }

    /// Files in the directory with the given extension, sorted by name.
    /// A missing directory lists as empty.
    pub async fn list_files(&self, extension: &str) -> Result<Vec<File>, CanvasError> {
        if !self.exists().await {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.path).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|e| e == extension) {
                files.push(path);
            }
        }
        files.sort();

        Ok(files.into_iter().map(File::new).collect())
    }

    pub fn file(&self, name: &str) -> File {
        File::new(self.path.join(name))
    }

    pub fn subdir(&self, name: &str) -> Dir {
        Dir::new(self.path.join(name))
    }

    /// Create a uniquely named directory under the system temp dir
    pub async fn create_temp_dir(prefix: &str) -> Result<Dir, CanvasError> {
        let temp_dir = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
        fs::create_dir_all(&temp_dir).await?;
        Ok(Dir::new(temp_dir))
    }
}
