//! Error types for the wicket core library

use thiserror::Error;

/// Result type alias for credential store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the credential store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The credential file could not be opened, read, or written
    #[error("credential store unavailable: {0}")]
    Unavailable(#[from] std::io::Error),

    /// A partially written or malformed record was encountered mid-scan
    #[error("credential store corrupt: {0}")]
    Corrupt(String),

    /// The password hashing function rejected its parameters or input
    #[error("password hashing failed: {0}")]
    Hash(String),
}
