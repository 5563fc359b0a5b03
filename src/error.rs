//! Error types for gridstore
//!
//! Provides a unified error type for all operations.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using GridError
pub type Result<T> = std::result::Result<T, GridError>;

/// Unified error type for gridstore operations
#[derive(Debug, Error)]
pub enum GridError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Backing Store Errors
    // -------------------------------------------------------------------------
    /// The backing store is unreachable, refused the call, or timed out
    #[error("Backing store unavailable: {0}")]
    Connectivity(String),

    /// A stored collection failed its checksum or could not be decoded
    #[error("Stored collection corrupted: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Request Errors
    // -------------------------------------------------------------------------
    /// Request payload failed the shape check; raised before any lock is taken
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The server answered with an error envelope
    #[error("Server error: {0}")]
    Remote(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Dispatch Errors
    // -------------------------------------------------------------------------
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Dispatcher error: {0}")]
    Dispatcher(String),
}

impl GridError {
    /// True for failures that originate in the backing store itself
    pub fn is_store_failure(&self) -> bool {
        matches!(self, GridError::Connectivity(_) | GridError::Corruption(_))
    }
}
