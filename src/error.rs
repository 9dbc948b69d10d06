//! Crate-level error types.

use thiserror::Error;

use crate::formats::FormatError;
use crate::store::StorageError;

/// Errors surfaced by workspace operations.
///
/// Validation rejections (rectangle too small, polygon under 3 points) are
/// never errors; those gestures are simply discarded. Errors here are the
/// recoverable failures the host must report to the user.
#[derive(Error, Debug)]
pub enum Error {
    /// Persistence read/write failure; in-memory state was not advanced.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Referenced image does not exist.
    #[error("unknown image: {0}")]
    UnknownImage(String),

    /// Referenced label does not exist.
    #[error("unknown label: {0}")]
    UnknownLabel(String),

    /// Referenced annotation does not exist.
    #[error("unknown annotation: {0}")]
    UnknownAnnotation(String),

    /// Label names must be unique within the dataset.
    #[error("duplicate label name: '{0}'")]
    DuplicateLabelName(String),

    /// Label names must be non-empty.
    #[error("label name must not be empty")]
    EmptyLabelName,

    /// The external segmentation call failed; nothing was committed.
    #[error("segmentation failed: {0}")]
    Segmentation(String),

    /// Dataset import/export failure.
    #[error("format error: {0}")]
    Format(#[from] FormatError),
}

/// Convenience result alias for workspace operations.
pub type Result<T> = std::result::Result<T, Error>;
