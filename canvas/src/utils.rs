//! Utility functions

use serde::{Deserialize, Serialize};

/// Smallest zoom factor the canvas accepts
pub const MIN_ZOOM: f64 = 0.1;

/// Largest zoom factor the canvas accepts
pub const MAX_ZOOM: f64 = 2.0;

/// Version information for the canvas tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Clamp a zoom factor into [MIN_ZOOM, MAX_ZOOM]. NaN maps to 1.0.
pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_nan() {
        return 1.0;
    }
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Generate a random UUID v4
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
