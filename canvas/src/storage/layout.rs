//! Storage layout configuration

use std::path::PathBuf;

use crate::errors::CanvasError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Environment variable overriding the base directory
pub const HOME_ENV: &str = "CIVIC_CANVAS_HOME";

/// Paths of everything the canvas keeps on disk
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }

    /// Key-value store standing in for browser local storage
    pub fn local_storage_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("local-storage"))
    }

    /// Default location for saved workflows
    pub fn workflows_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("workflows"))
    }

    /// Execution result downloads
    pub fn downloads_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("downloads"))
    }

    pub fn logs_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("logs"))
    }

    /// Create every directory of the layout
    pub async fn setup(&self) -> Result<(), CanvasError> {
        self.local_storage_dir().create().await?;
        self.workflows_dir().create().await?;
        self.downloads_dir().create().await?;
        self.logs_dir().create().await?;
        Ok(())
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        let base_dir = std::env::var_os(HOME_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .or_else(|| std::env::var_os("USERPROFILE"))
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".civic-canvas")
            });

        Self::new(base_dir)
    }
}
