//! Dense connectivity matrices and node annotations

pub mod normalize;
pub mod repair;

use crate::error::{ThresholdError, ThresholdResult};
use ndarray::Array2;

/// Square matrix of pairwise connection strengths between N nodes.
///
/// Squareness is checked on construction; everything else (finiteness,
/// symmetry, diagonal) is the job of [`repair`].
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedMatrix {
    data: Array2<f64>,
}

impl WeightedMatrix {
    /// Wrap an array, rejecting non-square shapes
    pub fn new(data: Array2<f64>) -> ThresholdResult<Self> {
        let (rows, cols) = data.dim();
        if rows != cols {
            return Err(ThresholdError::NotSquare { rows, cols });
        }
        Ok(Self { data })
    }

    /// Build from nested rows (mostly for fixtures)
    pub fn from_rows(rows: &[Vec<f64>]) -> ThresholdResult<Self> {
        let n = rows.len();
        let mut data = Array2::zeros((n, n));
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(ThresholdError::NotSquare { rows: n, cols: row.len() });
            }
            for (j, &value) in row.iter().enumerate() {
                data[[i, j]] = value;
            }
        }
        Ok(Self { data })
    }

    /// Empty-edge matrix over `n` nodes
    pub fn zeros(n: usize) -> Self {
        Self { data: Array2::zeros((n, n)) }
    }

    /// Number of nodes (rows)
    pub fn node_count(&self) -> usize {
        self.data.nrows()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[[row, col]]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[[row, col]] = value;
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }

    pub(crate) fn as_array_mut(&mut self) -> &mut Array2<f64> {
        &mut self.data
    }

    /// Elementwise map into a new matrix of the same shape
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        Self { data: self.data.mapv(f) }
    }

    /// Keep entries for which `keep(row, col, value)` holds, zero the rest
    pub fn retain<F: Fn(usize, usize, f64) -> bool>(&self, keep: F) -> Self {
        let mut data = self.data.clone();
        for ((i, j), value) in data.indexed_iter_mut() {
            if !keep(i, j, *value) {
                *value = 0.0;
            }
        }
        Self { data }
    }

    pub fn sum(&self) -> f64 {
        self.data.sum()
    }

    /// Largest finite entry, `None` when there is none
    pub fn max(&self) -> Option<f64> {
        self.finite_values().reduce(f64::max)
    }

    /// Smallest finite entry, `None` when there is none
    pub fn min(&self) -> Option<f64> {
        self.finite_values().reduce(f64::min)
    }

    /// Largest finite absolute value, 0 for an empty or all-NaN matrix
    pub fn max_abs(&self) -> f64 {
        self.finite_values().fold(0.0, |acc, v| acc.max(v.abs()))
    }

    /// Number of nonzero off-diagonal entries (NaN counts as absent)
    pub fn off_diagonal_nonzero(&self) -> usize {
        self.data
            .indexed_iter()
            .filter(|&((i, j), &v)| i != j && v != 0.0 && !v.is_nan())
            .count()
    }

    /// Whether every off-diagonal entry is zero or NaN
    pub fn is_edge_free(&self) -> bool {
        self.off_diagonal_nonzero() == 0
    }

    fn finite_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().copied().filter(|v| v.is_finite())
    }
}

/// A 3D node centroid in millimetres
pub type Coordinate = [f64; 3];

/// Optional per-node annotations aligned with matrix rows.
///
/// Labels and coordinates only annotate nodes; they carry no weights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeSet {
    pub labels: Option<Vec<String>>,
    pub coords: Option<Vec<Coordinate>>,
}

impl NodeSet {
    pub fn new(labels: Option<Vec<String>>, coords: Option<Vec<Coordinate>>) -> Self {
        Self { labels, coords }
    }

    /// Labels only
    pub fn labelled(labels: Vec<String>) -> Self {
        Self { labels: Some(labels), coords: None }
    }

    /// Check both annotation sequences against the matrix dimension
    pub fn validate(&self, node_count: usize) -> ThresholdResult<()> {
        if let Some(labels) = &self.labels {
            if labels.len() != node_count {
                return Err(ThresholdError::LabelMismatch {
                    expected: node_count,
                    actual: labels.len(),
                });
            }
        }
        if let Some(coords) = &self.coords {
            if coords.len() != node_count {
                return Err(ThresholdError::CoordinateMismatch {
                    expected: node_count,
                    actual: coords.len(),
                });
            }
        }
        Ok(())
    }

    pub fn label(&self, node: usize) -> Option<&str> {
        self.labels.as_ref().and_then(|l| l.get(node)).map(String::as_str)
    }

    pub fn coord(&self, node: usize) -> Option<Coordinate> {
        self.coords.as_ref().and_then(|c| c.get(node)).copied()
    }
}
