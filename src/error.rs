//! Error types for the viewer state core.

use crate::layers::ReconcileReport;
use thiserror::Error;

/// Main error type for viewer operations.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Durable storage unavailable")]
    StorageUnavailable,

    #[error("Storage quota exceeded writing {key} ({needed} bytes, {available} available)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        available: usize,
    },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage directory is locked by another process")]
    Locked,

    #[error("Storage directory not initialized: {0}")]
    NotInitialized(String),

    #[error("Invalid blob format: {0}")]
    InvalidFormat(String),

    #[error("Checksum mismatch: expected {expected}, got {got}")]
    ChecksumMismatch { expected: u32, got: u32 },

    #[error("Blob not found: {0}")]
    BlobNotFound(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),

    #[error("Patch does not produce a valid view state: {0}")]
    InvalidPatch(String),

    #[error("Map engine error: {0}")]
    Map(String),

    /// A pass failed on one layer after changing the other.
    #[error("Layer reconciliation incomplete: {source}")]
    PartialReconcile {
        report: Box<ReconcileReport>,
        #[source]
        source: Box<ViewerError>,
    },

    #[error("Subscription dropped")]
    SubscriptionDropped,
}

impl From<serde_json::Error> for ViewerError {
    fn from(e: serde_json::Error) -> Self {
        ViewerError::Serialization(e.to_string())
    }
}

/// Result type for viewer operations.
pub type Result<T> = std::result::Result<T, ViewerError>;
