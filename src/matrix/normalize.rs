//! Rescaling, inversion and weight-type conversion of matrix entries

use crate::matrix::WeightedMatrix;
use serde::{Deserialize, Serialize};

/// Divide every entry by the largest absolute value.
///
/// An all-zero matrix comes back unchanged.
pub fn normalize(matrix: &WeightedMatrix) -> WeightedMatrix {
    let max_abs = matrix.max_abs();
    if max_abs == 0.0 {
        return matrix.clone();
    }
    matrix.map(|v| v / max_abs)
}

/// Min-max rescale into [0, 1]; a flat matrix becomes all zeros
pub fn standardize(matrix: &WeightedMatrix) -> WeightedMatrix {
    let (Some(min), Some(max)) = (matrix.min(), matrix.max()) else {
        return WeightedMatrix::zeros(matrix.node_count());
    };
    let range = max - min;
    if range == 0.0 {
        return WeightedMatrix::zeros(matrix.node_count());
    }
    matrix.map(|v| if v.is_finite() { (v - min) / range } else { 0.0 })
}

/// Map every nonzero entry to 1; zeros and NaN become 0
pub fn binarize(matrix: &WeightedMatrix) -> WeightedMatrix {
    matrix.map(binary_value)
}

/// Reciprocal of every nonzero entry; zeros stay zero
pub fn invert(matrix: &WeightedMatrix) -> WeightedMatrix {
    matrix.map(reciprocal)
}

/// Drop entries under `epsilon`, so nothing survives in (0, epsilon)
pub fn thr2prob(matrix: &WeightedMatrix, epsilon: f64) -> WeightedMatrix {
    matrix.map(|v| if v < epsilon { 0.0 } else { v })
}

/// Target weight type for [`weight_conversion`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightConversion {
    /// Nonzero weights become 1
    Binarize,
    /// Weights become connection lengths (reciprocals)
    Lengths,
    /// Weights are divided by the largest absolute weight
    Normalize,
}

/// Convert weights into a fresh matrix, leaving the input untouched
pub fn weight_conversion(matrix: &WeightedMatrix, mode: WeightConversion) -> WeightedMatrix {
    match mode {
        WeightConversion::Binarize => binarize(matrix),
        WeightConversion::Lengths => invert(matrix),
        WeightConversion::Normalize => normalize(matrix),
    }
}

/// Convert weights of `matrix` in place
pub fn weight_conversion_in_place(matrix: &mut WeightedMatrix, mode: WeightConversion) {
    match mode {
        WeightConversion::Binarize => matrix.as_array_mut().mapv_inplace(binary_value),
        WeightConversion::Lengths => matrix.as_array_mut().mapv_inplace(reciprocal),
        WeightConversion::Normalize => {
            let max_abs = matrix.max_abs();
            if max_abs != 0.0 {
                matrix.as_array_mut().mapv_inplace(|v| v / max_abs);
            }
        }
    }
}

fn binary_value(v: f64) -> f64 {
    if v != 0.0 && !v.is_nan() {
        1.0
    } else {
        0.0
    }
}

fn reciprocal(v: f64) -> f64 {
    if v != 0.0 {
        1.0 / v
    } else {
        0.0
    }
}
