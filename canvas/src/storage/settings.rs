//! Settings file management

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::filesys::file::File;
use crate::logs::LogLevel;

/// Canvas settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_level: LogLevel,

    /// Also write logs to a daily file in the logs directory
    #[serde(default)]
    pub log_to_file: bool,

    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub execution: ExecutionSettings,
}

impl Settings {
    /// Read settings from a file; a missing file yields the defaults
    pub async fn load(file: &File) -> Result<Settings, crate::errors::CanvasError> {
        if !file.exists().await {
            info!("No settings file at {}, using defaults", file.path().display());
            return Ok(Settings::default());
        }
        let settings = file.read_json::<Settings>().await?;
        if settings.backend.request_timeout_secs == Some(0) {
            warn!("request_timeout_secs of 0 disables the timeout");
        }
        Ok(settings)
    }
}

/// Backend API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default = "default_backend_url")]
    pub base_url: String,

    /// Client-side request timeout. Unset means requests wait indefinitely.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_backend_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}

impl BackendSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            request_timeout_secs: None,
        }
    }
}

/// Defaults applied to every execution request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSettings {
    #[serde(default = "default_workflow_type")]
    pub workflow_type: String,

    #[serde(default = "default_true")]
    pub generate_download_link: bool,

    #[serde(default)]
    pub colab_optimized: bool,
}

fn default_workflow_type() -> String {
    "eda".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            workflow_type: default_workflow_type(),
            generate_download_link: true,
            colab_optimized: false,
        }
    }
}
