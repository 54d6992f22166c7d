//! Error types for VTable
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using VtError
pub type Result<T> = std::result::Result<T, VtError>;

/// Unified error type for VTable operations
#[derive(Debug, Error)]
pub enum VtError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("Store corruption detected: {0}")]
    Corruption(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Worker Errors
    // -------------------------------------------------------------------------
    #[error("Worker closed: {0}")]
    WorkerClosed(String),
}

impl From<bincode::Error> for VtError {
    fn from(err: bincode::Error) -> Self {
        VtError::Serialization(err.to_string())
    }
}
