//! Rank-based thresholding, globally and per node

use crate::error::ThresholdResult;
use crate::matrix::repair::{fill_diagonal, is_symmetric};
use crate::matrix::{NodeSet, WeightedMatrix};
use ndarray::Array2;

/// Keep the strongest `proportion` of all node pairs, zero everything else.
///
/// For symmetric input only the upper triangle is ranked and the result is
/// mirrored; asymmetric input ranks every off-diagonal entry. The kept count
/// is `pairs * proportion` rounded half to even. Ties keep row-major order,
/// so identical input always gives identical output. NaN entries never
/// survive and the diagonal is zeroed.
pub fn threshold_proportional(matrix: &WeightedMatrix, proportion: f64) -> WeightedMatrix {
    let proportion = if proportion.is_nan() { 0.0 } else { proportion.clamp(0.0, 1.0) };
    let n = matrix.node_count();
    let w = fill_diagonal(matrix, 0.0);
    let symmetric = is_symmetric(&w);

    // Row-major candidates, strongest first (stable on ties)
    let mut candidates: Vec<((usize, usize), f64)> = w
        .as_array()
        .indexed_iter()
        .filter(|&((i, j), &v)| (if symmetric { i < j } else { i != j }) && v != 0.0 && !v.is_nan())
        .map(|(idx, &v)| (idx, v))
        .collect();
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));

    let undirected = if symmetric { 2.0 } else { 1.0 };
    let keep = (((n * n - n) as f64) * proportion / undirected).round_ties_even() as usize;

    let mut out = WeightedMatrix::zeros(n);
    for &((i, j), v) in candidates.iter().take(keep) {
        out.set(i, j, v);
        if symmetric {
            out.set(j, i, v);
        }
    }

    log::debug!(
        "Proportional threshold {} kept {} of {} candidate edges",
        proportion,
        keep.min(candidates.len()),
        candidates.len()
    );

    out
}

/// Apply the proportional rule to each node's own incident edges.
///
/// Node `i` keeps its `round(proportion * degree_i)` strongest edges, so
/// weakly connected nodes retain their relative structure regardless of the
/// global weight scale. An edge survives if either endpoint keeps it.
/// `proportion = 0` isolates every node; `proportion = 1` removes nothing.
pub fn local_thresholding_prop(
    matrix: &WeightedMatrix,
    nodes: &NodeSet,
    proportion: f64,
) -> ThresholdResult<WeightedMatrix> {
    let n = matrix.node_count();
    nodes.validate(n)?;

    let proportion = if proportion.is_nan() { 0.0 } else { proportion.clamp(0.0, 1.0) };
    let a = matrix.as_array();
    let mut keep = Array2::from_elem((n, n), false);

    for i in 0..n {
        let mut incident: Vec<(usize, f64)> = (0..n)
            .filter(|&j| j != i)
            .map(|j| (j, a[[i, j]]))
            .filter(|&(_, v)| v != 0.0 && v.is_finite())
            .collect();
        incident.sort_by(|x, y| y.1.total_cmp(&x.1));

        let quota = (incident.len() as f64 * proportion).round_ties_even() as usize;
        for &(j, _) in incident.iter().take(quota) {
            keep[[i, j]] = true;
            keep[[j, i]] = true;
        }
    }

    let out = matrix.retain(|i, j, v| keep[[i, j]] && v.is_finite());
    log::debug!(
        "Local proportional threshold {} kept {} directed entries",
        proportion,
        out.off_diagonal_nonzero()
    );

    Ok(out)
}
