//! Error types for the wicket server

use thiserror::Error;

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors that can occur in the server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Credential store error
    #[error("Store error: {0}")]
    Store(#[from] wicket_core::StoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ServerError {
    fn from(e: serde_json::Error) -> Self {
        ServerError::Config(e.to_string())
    }
}
