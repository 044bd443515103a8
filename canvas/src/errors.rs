//! Error types for the civic canvas

use http::StatusCode;
use thiserror::Error;

/// Main error type for the civic canvas
#[derive(Error, Debug)]
pub enum CanvasError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    BackendError { status: StatusCode, body: String },

    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(String),

    #[error("Port '{port_id}' not found on node '{node_id}'")]
    PortNotFound { node_id: String, port_id: String },

    #[error("Invalid connection: {0}")]
    InvalidConnection(String),

    #[error("Malformed workflow file: {0}")]
    MalformedWorkflow(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for CanvasError {
    fn from(err: anyhow::Error) -> Self {
        CanvasError::Internal(err.to_string())
    }
}

impl From<url::ParseError> for CanvasError {
    fn from(err: url::ParseError) -> Self {
        CanvasError::ConfigError(format!("invalid URL: {}", err))
    }
}
