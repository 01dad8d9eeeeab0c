//! Error types in linfa-ffm
//!

use thiserror::Error;

/// Simplified `Result` using [`FfmError`](crate::FfmError) as error type
pub type Result<T> = std::result::Result<T, FfmError>;

#[derive(Error, Debug)]
pub enum FfmError {
    #[error("learning rate eta should be positive and finite, but is {0}")]
    InvalidLearningRate(f32),
    #[error("regularization lambda should be non-negative and finite, but is {0}")]
    InvalidLambda(f32),
    #[error("latent dimension must be bigger than 0")]
    InvalidLatentDim,
    #[error("number of threads must be bigger than 0")]
    InvalidThreadCount,
    #[error("cannot allocate a weight buffer of {0} floats")]
    Allocation(usize),
    #[error("cannot compact to latent dimension {requested}, the store holds {aligned}")]
    InvalidCompaction { requested: usize, aligned: usize },
    #[error("Expected the number of rows and labels to match, got {0} != {1}")]
    MismatchedShapes(usize, usize),
    #[error("row {row}: response must be an integer, found {found}")]
    LabelType { row: usize, found: &'static str },
    #[error("row {row}: feature column `{column}` {reason}")]
    FeatureType {
        row: usize,
        column: String,
        reason: String,
    },
    #[error("unknown column `{0}`")]
    UnknownColumn(String),
    #[error("row has {found} cells but the frame has {expected} columns")]
    RowWidth { expected: usize, found: usize },
    #[error("malformed model file at line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    LinfaError(#[from] linfa::error::Error),
}
