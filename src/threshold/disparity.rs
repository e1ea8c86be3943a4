//! Disparity filter: per-node edge significance against a uniform null
//!
//! For a node with `k` incident edges, the null model spreads its strength
//! uniformly at random over those edges, so the normalized weight `p` of any
//! one edge follows `Beta(1, k - 1)`. An edge's alpha is the probability of
//! seeing a share at least as large as the observed one, `1 - F(p)`.
//!
//! Endpoints with a single incident edge have no null to test against; that
//! edge is treated as significant (alpha 0). An edge's alpha is the smaller
//! of its two endpoint values, so it survives a cut when either endpoint
//! finds it significant.

use crate::error::{ThresholdError, ThresholdResult};
use crate::graph::ConnectomeGraph;
use statrs::distribution::{Beta, ContinuousCDF};
use std::collections::HashMap;

/// Copy of `graph` with every edge's `alpha` set
pub fn disparity_filter(graph: &ConnectomeGraph) -> ThresholdResult<ConnectomeGraph> {
    let mut alphas: HashMap<(usize, usize), f64> = HashMap::with_capacity(graph.edge_count());

    for u in 0..graph.node_count() {
        let incident: Vec<(usize, f64)> = graph
            .neighbors(u)
            .map(|(v, attr)| (v, attr.weight.abs()))
            .collect();
        let k = incident.len();
        if k == 0 {
            continue;
        }

        let strength: f64 = incident.iter().map(|&(_, w)| w).sum();
        let null = if k > 1 {
            Some(Beta::new(1.0, (k - 1) as f64).map_err(|e| ThresholdError::NullModel(e.to_string()))?)
        } else {
            None
        };

        for (v, w) in incident {
            let alpha = match &null {
                None => 0.0,
                Some(_) if strength == 0.0 => 1.0,
                Some(beta) => (1.0 - beta.cdf(w / strength)).clamp(0.0, 1.0),
            };
            let key = (u.min(v), u.max(v));
            alphas
                .entry(key)
                .and_modify(|a| *a = a.min(alpha))
                .or_insert(alpha);
        }
    }

    let mut out = graph.empty_like();
    for (u, v, attr) in graph.edges() {
        let mut attr = *attr;
        attr.alpha = alphas.get(&(u, v)).copied();
        out.add_edge(u, v, attr);
    }

    Ok(out)
}

/// Keep only edges whose alpha is at most `alpha_t`.
///
/// Edges are scored with [`disparity_filter`] first unless every edge
/// already carries an alpha.
pub fn disparity_filter_alpha_cut(graph: &ConnectomeGraph, alpha_t: f64) -> ThresholdResult<ConnectomeGraph> {
    if !(0.0..=1.0).contains(&alpha_t) {
        return Err(ThresholdError::InvalidParameter { name: "alpha", value: alpha_t });
    }

    let scored = if graph.edges().all(|(_, _, e)| e.alpha.is_some()) {
        graph.clone()
    } else {
        disparity_filter(graph)?
    };

    let mut out = scored.empty_like();
    for (u, v, attr) in scored.edges() {
        if attr.alpha.map_or(false, |a| a <= alpha_t) {
            out.add_edge(u, v, *attr);
        }
    }

    log::debug!(
        "Alpha cut at {} kept {} of {} edges",
        alpha_t,
        out.edge_count(),
        scored.edge_count()
    );

    Ok(out)
}
