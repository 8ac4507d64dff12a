use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while building batches, running the model or managing
/// checkpoints.
#[derive(Error, Debug)]
pub enum Error {
    /// A caller-supplied argument is out of range or conflicts with another.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Train and eval modes need labels; predict mode does not.
    #[error("labels are required in train and eval mode")]
    MissingLabels,

    /// Two buffers that must agree in size do not.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    /// Malformed IDX image or label file.
    #[error("IDX error: {0}")]
    Idx(String),

    /// The model directory holds no checkpoint to restore.
    #[error("no checkpoint found in `{}`", .0.display())]
    NoCheckpoint(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn shape(expected: impl ToString, actual: impl ToString) -> Self {
        Error::Shape {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
