//! Error type for dataset format operations.

use thiserror::Error;

/// Errors raised while importing or exporting dataset files.
#[derive(Debug, Error)]
pub enum FormatError {
    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Structurally valid input with contents the format cannot accept.
    #[error("invalid data: {0}")]
    InvalidData(String),
    /// A required file or field was absent from the input.
    #[error("missing required input: {0}")]
    MissingInput(String),
}
