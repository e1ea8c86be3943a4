//! Graph algorithms used by thresholding and assembly

use crate::graph::{ConnectomeGraph, EdgeAttr};
use petgraph::algo::{connected_components, min_spanning_tree};
use petgraph::data::Element;

/// Annotate every edge with a distance equal to the reciprocal of its
/// absolute weight.
///
/// Zero-weight edges get an infinite distance instead of a division fault.
pub fn weight_to_distance(graph: &ConnectomeGraph) -> ConnectomeGraph {
    let mut out = graph.clone();
    for attr in out.edge_attrs_mut() {
        attr.distance = Some(length_of(attr.weight));
    }
    out
}

/// Reciprocal length of a connection weight
pub fn length_of(weight: f64) -> f64 {
    let magnitude = weight.abs();
    if magnitude > 0.0 {
        1.0 / magnitude
    } else {
        f64::INFINITY
    }
}

/// Maximum-weight spanning forest, as a graph over the same nodes.
///
/// Computed as the minimum spanning forest over reciprocal-weight distances,
/// so the strongest connections form the backbone. Disconnected inputs give
/// one tree per component.
pub fn maximum_spanning_forest(graph: &ConnectomeGraph) -> ConnectomeGraph {
    let distances = graph
        .inner()
        .map(|_, _| (), |_, attr| attr.distance.unwrap_or_else(|| length_of(attr.weight)));

    let mut forest = graph.empty_like();
    for element in min_spanning_tree(&distances) {
        if let Element::Edge { source, target, .. } = element {
            let attr = graph
                .edge(source, target)
                .copied()
                .unwrap_or_else(|| EdgeAttr::new(0.0));
            forest.add_edge(source, target, attr);
        }
    }

    log::debug!(
        "Spanning forest has {} edges over {} nodes",
        forest.edge_count(),
        forest.node_count()
    );

    forest
}

/// Number of connected components, counting isolated nodes
pub fn component_count(graph: &ConnectomeGraph) -> usize {
    connected_components(graph.inner())
}

/// Whether every node is reachable from every other node
pub fn is_connected(graph: &ConnectomeGraph) -> bool {
    graph.node_count() <= 1 || component_count(graph) == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_with_diagonal() -> ConnectomeGraph {
        let mut g = ConnectomeGraph::with_nodes(4);
        g.add_edge(0, 1, EdgeAttr::new(0.9));
        g.add_edge(1, 2, EdgeAttr::new(0.1));
        g.add_edge(2, 3, EdgeAttr::new(0.8));
        g.add_edge(3, 0, EdgeAttr::new(0.7));
        g.add_edge(0, 2, EdgeAttr::new(0.6));
        g
    }

    #[test]
    fn distances_are_reciprocal_and_zero_safe() {
        let mut g = square_with_diagonal();
        g.add_edge(1, 3, EdgeAttr::new(0.0));

        let d = weight_to_distance(&g);
        assert_eq!(d.edge(0, 1).and_then(|e| e.distance), Some(1.0 / 0.9));
        assert_eq!(d.edge(1, 3).and_then(|e| e.distance), Some(f64::INFINITY));
        assert_eq!(d.edge_count(), g.edge_count());
    }

    #[test]
    fn spanning_forest_keeps_strongest_edges() {
        let forest = maximum_spanning_forest(&square_with_diagonal());
        assert_eq!(forest.edge_count(), 3);
        assert!(forest.has_edge(0, 1));
        assert!(forest.has_edge(2, 3));
        assert!(forest.has_edge(0, 3));
        assert!(!forest.has_edge(1, 2));
        assert!(is_connected(&forest));
    }

    #[test]
    fn forest_of_disconnected_graph() {
        let mut g = ConnectomeGraph::with_nodes(5);
        g.add_edge(0, 1, EdgeAttr::new(1.0));
        g.add_edge(2, 3, EdgeAttr::new(1.0));

        let forest = maximum_spanning_forest(&g);
        assert_eq!(forest.edge_count(), 2);
        assert_eq!(component_count(&forest), 3);
        assert!(!is_connected(&forest));
    }
}
