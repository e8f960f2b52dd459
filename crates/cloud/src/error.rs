//! Error types for backend and assistant calls.

use thiserror::Error;

/// Errors produced by remote and local raster backends and the assistant client.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("dataset unavailable: {dataset}")]
    DatasetUnavailable { dataset: String },

    #[error("empty result for {dataset}: {reason}")]
    EmptyResult { dataset: String, reason: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("core error: {0}")]
    Core(#[from] estuaria_core::Error),
}

impl CloudError {
    /// Whether the backend answered but had no imagery for the request.
    pub fn is_empty_result(&self) -> bool {
        matches!(self, CloudError::EmptyResult { .. })
    }
}

/// Result alias for cloud operations.
pub type Result<T> = std::result::Result<T, CloudError>;
