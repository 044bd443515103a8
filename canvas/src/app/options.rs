//! Application configuration options

use std::time::Duration;

use crate::storage::layout::StorageLayout;
use crate::storage::settings::{ExecutionSettings, Settings};

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Backend API base URL
    pub backend_base_url: String,

    /// Client-side request timeout; `None` waits indefinitely
    pub request_timeout: Option<Duration>,

    /// Storage layout paths
    pub layout: StorageLayout,

    /// Defaults for execution requests
    pub execution: ExecutionSettings,
}

impl AppOptions {
    pub fn from_settings(settings: &Settings, layout: StorageLayout) -> Self {
        Self {
            backend_base_url: settings.backend.base_url.clone(),
            request_timeout: settings.backend.request_timeout(),
            layout,
            execution: settings.execution.clone(),
        }
    }
}

impl Default for AppOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default(), StorageLayout::default())
    }
}
