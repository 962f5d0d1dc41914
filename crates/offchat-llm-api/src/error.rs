//! Error types for inference operations.

use thiserror::Error;

/// Errors that can occur while talking to or managing the inference server.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned an error response.
    #[error("API error: {0}")]
    Api(String),

    /// Server is not running or not reachable.
    #[error("Inference server not running at {0}")]
    ServerNotRunning(String),

    /// Server failed to start.
    #[error("Failed to start server: {0}")]
    ServerStartFailed(String),

    /// llama-server binary not found.
    #[error("llama-server binary not found at {0}")]
    ServerBinaryNotFound(String),

    /// Model weight file missing.
    #[error("Model file not found: {0}")]
    ModelNotFound(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout waiting for server to start.
    #[error("Timeout waiting for server to become ready")]
    ServerStartTimeout,
}
