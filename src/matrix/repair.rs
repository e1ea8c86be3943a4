//! Elementwise cleanup of raw connectivity matrices

use crate::error::{ThresholdError, ThresholdResult};
use crate::matrix::WeightedMatrix;

/// Relative tolerance used when deciding whether a matrix is symmetric
const SYMMETRY_RTOL: f64 = 1e-5;
const SYMMETRY_ATOL: f64 = 1e-8;

/// Replace NaN, +Inf and -Inf with 0, leaving finite entries untouched
pub fn autofix(matrix: &WeightedMatrix) -> WeightedMatrix {
    let fixed = matrix.map(|v| if v.is_finite() { v } else { 0.0 });

    let replaced = matrix.as_array().iter().filter(|v| !v.is_finite()).count();
    if replaced > 0 {
        log::debug!("Replaced {} non-finite entries with 0", replaced);
    }

    fixed
}

/// Copy of `matrix` with every diagonal entry set to `value`
pub fn fill_diagonal(matrix: &WeightedMatrix, value: f64) -> WeightedMatrix {
    let mut out = matrix.clone();
    out.as_array_mut().diag_mut().fill(value);
    out
}

/// Whether `matrix` equals its transpose within floating tolerance
pub fn is_symmetric(matrix: &WeightedMatrix) -> bool {
    let a = matrix.as_array();
    let n = matrix.node_count();
    for i in 0..n {
        for j in (i + 1)..n {
            let (x, y) = (a[[i, j]], a[[j, i]]);
            if x.is_nan() && y.is_nan() {
                continue;
            }
            if (x - y).abs() > SYMMETRY_ATOL + SYMMETRY_RTOL * y.abs() || x.is_nan() != y.is_nan() {
                return false;
            }
        }
    }
    true
}

/// Average `matrix` with its transpose
pub fn symmetrize(matrix: &WeightedMatrix) -> WeightedMatrix {
    let a = matrix.as_array();
    let sym = (a + &a.t()) / 2.0;
    WeightedMatrix { data: sym }
}

/// Fail with the first non-finite entry, if any
pub fn ensure_finite(matrix: &WeightedMatrix) -> ThresholdResult<()> {
    match matrix
        .as_array()
        .indexed_iter()
        .find(|(_, v)| !v.is_finite())
    {
        Some(((row, col), _)) => Err(ThresholdError::NonFinite { row, col }),
        None => Ok(()),
    }
}
