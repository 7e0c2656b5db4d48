//! Error types for the subscription client.

use thiserror::Error;

/// Main error type for client operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Malformed event envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Not connected")]
    NotConnected,
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::MalformedEnvelope(e.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, SyncError>;
