//! Thresholding and sparsification of weighted brain connectivity matrices

pub mod cluster;
pub mod config;
pub mod error;
pub mod graph;
pub mod matrix;
pub mod orchestrate;
pub mod storage;
pub mod threshold;
pub mod viz;

pub use anyhow::{Result, anyhow};
pub use error::{ThresholdError, ThresholdResult};
pub use matrix::{NodeSet, WeightedMatrix};
pub use threshold::{select, Selection, ThresholdSpec};
