//! Error types for trkcore.
//!
//! Queries never fail: missing data collapses to an empty result. Errors are
//! only raised when decoding raw codes or loading configuration.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrkError {
    /// Sub-detector field of a detector id outside the tracker range
    #[error("invalid tracker sub-detector code: {0}")]
    InvalidSubDetector(u32),

    /// Configuration rejected by validation
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TrkError>;
