//! Error types for iidb
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using IidbError
pub type Result<T> = std::result::Result<T, IidbError>;

/// Unified error type for iidb operations
#[derive(Debug, Error)]
pub enum IidbError {
    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("key not found: {0}")]
    KeyNotFound(String),

    // -------------------------------------------------------------------------
    // Record Errors
    // -------------------------------------------------------------------------
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Unsupported compression mode: {0}")]
    UnsupportedCompressionMode(u16),

    #[error("{codec} codec failure: {message}")]
    Codec { codec: &'static str, message: String },

    // -------------------------------------------------------------------------
    // Image Errors
    // -------------------------------------------------------------------------
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    // -------------------------------------------------------------------------
    // Store Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Store is closed")]
    ClosedStore,

    #[error("Store is read-only: {0} not permitted")]
    ReadOnlyViolation(&'static str),

    // -------------------------------------------------------------------------
    // Storage Engine Errors
    // -------------------------------------------------------------------------
    #[error("Storage engine error: {0}")]
    StorageEngine(#[from] heed::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
