//! Error taxonomy for the thresholding core

use thiserror::Error;

/// Hard failures raised by the thresholding core.
///
/// Degenerate graphs, density-search exhaustion and zero-weight arithmetic
/// are recovered locally and never show up here.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ThresholdError {
    #[error("connectivity matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("expected {expected} node labels, got {actual}")]
    LabelMismatch { expected: usize, actual: usize },

    #[error("expected {expected} node coordinates, got {actual}")]
    CoordinateMismatch { expected: usize, actual: usize },

    #[error("matrix dimension mismatch: expected {expected} nodes, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("non-finite value at ({row}, {col})")]
    NonFinite { row: usize, col: usize },

    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("disparity null model: {0}")]
    NullModel(String),
}

pub type ThresholdResult<T> = std::result::Result<T, ThresholdError>;
