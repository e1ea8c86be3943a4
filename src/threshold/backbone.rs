//! Spanning-forest backbone grown with nearest-neighbour edges
//!
//! Starts from the maximum-weight spanning forest, which keeps every
//! component connected, then adds k-nearest-neighbour edges for k = 1, 2, ...
//! strongest first until the requested edge count is reached.

use crate::config::ThresholdConfig;
use crate::error::{ThresholdError, ThresholdResult};
use crate::graph::algorithms::maximum_spanning_forest;
use crate::graph::{EdgeAttr, GraphBuilder};
use crate::matrix::repair::{autofix, fill_diagonal};
use crate::matrix::WeightedMatrix;
use crate::threshold::knn;

/// Grow the backbone to `proportion` of all node pairs (truncated)
pub fn local_thresholding_mst_prop(
    matrix: &WeightedMatrix,
    proportion: f64,
    config: &ThresholdConfig,
) -> WeightedMatrix {
    let proportion = if proportion.is_nan() { 0.0 } else { proportion.clamp(0.0, 1.0) };
    let target = (proportion * pair_count(matrix) as f64) as usize;
    grow_backbone(matrix, target, config.backbone_fail_tol)
}

/// Grow the backbone until its density reaches `target`
pub fn local_thresholding_mst_dens(
    matrix: &WeightedMatrix,
    target: f64,
    config: &ThresholdConfig,
) -> ThresholdResult<WeightedMatrix> {
    if !(0.0..=1.0).contains(&target) {
        return Err(ThresholdError::InvalidParameter { name: "target density", value: target });
    }
    let edges = (target * pair_count(matrix) as f64).round_ties_even() as usize;
    Ok(grow_backbone(matrix, edges, config.backbone_fail_tol))
}

fn pair_count(matrix: &WeightedMatrix) -> usize {
    let n = matrix.node_count();
    n * n.saturating_sub(1) / 2
}

fn grow_backbone(matrix: &WeightedMatrix, target_edges: usize, fail_tol: usize) -> WeightedMatrix {
    let clean = fill_diagonal(&autofix(matrix), 0.0);
    let magnitude = clean.map(f64::abs);
    let n = clean.node_count();

    let full = GraphBuilder::from_matrix(&magnitude);
    let maximum_edges = full.edge_count();
    let mut backbone = maximum_spanning_forest(&full);

    if backbone.edge_count() > target_edges {
        log::warn!(
            "Spanning forest already has {} edges, more than the {} requested",
            backbone.edge_count(),
            target_edges
        );
    }

    let mut history: Vec<usize> = Vec::new();
    let mut k = 1;
    while backbone.edge_count() < target_edges && k <= n {
        history.push(backbone.edge_count());
        if stalled(&history, fail_tol) {
            log::warn!("Backbone growth stalled at {} edges", backbone.edge_count());
            break;
        }

        let nng = knn(&magnitude, k);
        let mut candidates: Vec<(usize, usize, f64)> = nng
            .edges()
            .filter(|&(u, v, _)| !backbone.has_edge(u, v))
            .map(|(u, v, attr)| (u, v, attr.weight))
            .collect();
        if candidates.is_empty() && nng.edge_count() >= maximum_edges {
            break;
        }

        candidates.sort_by(|a, b| b.2.total_cmp(&a.2));
        for (u, v, w) in candidates {
            backbone.add_edge(u, v, EdgeAttr::new(w));
            if backbone.edge_count() >= target_edges {
                break;
            }
        }
        k += 1;
    }

    log::debug!(
        "Backbone has {} edges (target {}) after k = {}",
        backbone.edge_count(),
        target_edges,
        k
    );

    clean.retain(|i, j, _| backbone.has_edge(i, j))
}

/// True when the last `fail_tol` edge counts are all the same
fn stalled(history: &[usize], fail_tol: usize) -> bool {
    if fail_tol == 0 || history.len() < fail_tol {
        return false;
    }
    let recent = &history[history.len() - fail_tol..];
    recent.iter().all(|&c| c == recent[0])
}
