//! Error types for backend operations.

use thiserror::Error;

/// Error type for backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Internal backend error, state or computation error.
    ///
    /// Any error not related to I/O.
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),

    /// I/O error while talking to durable storage.
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Format(#[from] serde_json::Error),
}
