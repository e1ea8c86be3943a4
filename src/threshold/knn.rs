//! K-nearest-neighbour graphs

use crate::graph::{ConnectomeGraph, EdgeAttr};
use crate::matrix::WeightedMatrix;

/// Join every node to its `k` strongest neighbours.
///
/// Self-connections, NaN and zero entries are skipped; ties go to the lower
/// index. The directed choices are merged into one undirected graph, keeping
/// the larger weight when both endpoints pick the same pair. `k` above
/// `N - 1` behaves like `N - 1`.
pub fn knn(matrix: &WeightedMatrix, k: usize) -> ConnectomeGraph {
    let n = matrix.node_count();
    let a = matrix.as_array();
    let mut graph = ConnectomeGraph::with_nodes(n);

    for i in 0..n {
        let mut row: Vec<(usize, f64)> = (0..n)
            .filter(|&j| j != i)
            .map(|j| (j, a[[i, j]]))
            .filter(|&(_, w)| !w.is_nan())
            .collect();
        row.sort_by(|x, y| y.1.total_cmp(&x.1));

        for &(j, w) in row.iter().take(k) {
            if w == 0.0 {
                continue;
            }
            let stronger = graph.edge(i, j).map_or(true, |e| w > e.weight);
            if stronger {
                graph.add_edge(i, j, EdgeAttr::new(w));
            }
        }
    }

    log::debug!("{}-nearest-neighbour graph has {} edges", k, graph.edge_count());

    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_nan_diagonal() -> WeightedMatrix {
        WeightedMatrix::from_rows(&[
            vec![f64::NAN, 0.9, 0.1, 0.4],
            vec![0.9, f64::NAN, 0.3, 0.2],
            vec![0.1, 0.3, f64::NAN, 0.8],
            vec![0.4, 0.2, 0.8, f64::NAN],
        ])
        .unwrap()
    }

    #[test]
    fn one_nearest_neighbour() {
        let g = knn(&with_nan_diagonal(), 1);
        // 0<->1 and 2<->3 are mutual nearest neighbours
        assert_eq!(g.edge_count(), 2);
        assert!(g.has_edge(0, 1));
        assert!(g.has_edge(2, 3));
    }

    #[test]
    fn union_of_directed_choices() {
        let g = knn(&with_nan_diagonal(), 2);
        // 0: {1, 3}, 1: {0, 2}, 2: {3, 1}, 3: {2, 0}
        assert_eq!(g.edge_count(), 4);
        assert!(g.has_edge(1, 2));
        assert!(g.has_edge(0, 3));
        assert!(!g.has_edge(0, 2));
        assert_eq!(g.edge(0, 3).map(|e| e.weight), Some(0.4));
    }

    #[test]
    fn large_k_is_complete() {
        let g = knn(&with_nan_diagonal(), 10);
        assert_eq!(g.edge_count(), 6);
        assert_eq!(knn(&with_nan_diagonal(), 0).edge_count(), 0);
    }
}
