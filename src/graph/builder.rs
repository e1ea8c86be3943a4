//! Graph construction and assembly of thresholded results

use crate::cluster::{CommunityAffiliation, CommunityDetector};
use crate::config::AssemblyConfig;
use crate::error::{ThresholdError, ThresholdResult};
use crate::graph::algorithms::maximum_spanning_forest;
use crate::graph::{ConnectomeGraph, EdgeAttr};
use crate::matrix::{NodeSet, WeightedMatrix};
use crate::threshold::{disparity_filter, est_density};

/// Builder for incrementally constructing a ConnectomeGraph
pub struct GraphBuilder {
    graph: ConnectomeGraph,
}

impl GraphBuilder {
    /// Start from `node_count` nodes annotated from `nodes`
    pub fn new(node_count: usize, nodes: &NodeSet) -> Self {
        Self {
            graph: ConnectomeGraph::from_node_set(node_count, nodes),
        }
    }

    /// Add one edge per nonzero node pair of `matrix`.
    ///
    /// The upper-triangle entry wins; the lower one is used only when the
    /// upper is zero. NaN entries are skipped.
    pub fn add_matrix(mut self, matrix: &WeightedMatrix) -> Self {
        let a = matrix.as_array();
        let n = matrix.node_count().min(self.graph.node_count());
        for i in 0..n {
            for j in (i + 1)..n {
                let upper = a[[i, j]];
                let weight = if upper != 0.0 && !upper.is_nan() { upper } else { a[[j, i]] };
                if weight != 0.0 && !weight.is_nan() {
                    self.graph.add_edge(i, j, EdgeAttr::new(weight));
                }
            }
        }
        self
    }

    /// Add an edge from one node to another
    pub fn add_edge(&mut self, u: usize, v: usize, weight: f64) {
        self.graph.add_edge(u, v, EdgeAttr::new(weight));
    }

    pub fn build(self) -> ConnectomeGraph {
        self.graph
    }

    /// Unannotated graph of the nonzero entries of `matrix`
    pub fn from_matrix(matrix: &WeightedMatrix) -> ConnectomeGraph {
        Self::new(matrix.node_count(), &NodeSet::default())
            .add_matrix(matrix)
            .build()
    }
}

/// An optional sub-result that was not asked for, or could not be computed
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay<T> {
    Present(T),
    NotRequested,
    Failed(String),
}

impl<T> Overlay<T> {
    pub fn as_option(&self) -> Option<&T> {
        match self {
            Overlay::Present(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Overlay::Present(_))
    }

    fn from_result<E: std::fmt::Display>(result: Result<T, E>, what: &str) -> Self {
        match result {
            Ok(value) => Overlay::Present(value),
            Err(e) => {
                log::warn!("{} overlay failed: {}", what, e);
                Overlay::Failed(e.to_string())
            }
        }
    }
}

/// Final thresholded matrix with its graph and overlays
#[derive(Debug, Clone)]
pub struct ThresholdedGraph {
    pub matrix: WeightedMatrix,
    pub graph: ConnectomeGraph,

    /// Realized density of `matrix`, recomputed after overlays
    pub density: f64,

    /// Spanning forest edges that had to be added back
    pub spanning_edges_added: usize,

    /// Graph with disparity alphas attached
    pub disparity: Overlay<ConnectomeGraph>,

    pub communities: Overlay<CommunityAffiliation>,
}

/// Turn a thresholded matrix into a graph and compute the requested overlays.
///
/// With `mst_overlay` set, maximum spanning forest edges of `source` missing
/// from `thresholded` are added back with their source weights.
pub fn assemble(
    source: &WeightedMatrix,
    thresholded: &WeightedMatrix,
    nodes: &NodeSet,
    options: &AssemblyConfig,
    detector: &dyn CommunityDetector,
) -> ThresholdResult<ThresholdedGraph> {
    let n = source.node_count();
    if thresholded.node_count() != n {
        return Err(ThresholdError::DimensionMismatch {
            expected: n,
            actual: thresholded.node_count(),
        });
    }
    nodes.validate(n)?;

    let mut matrix = thresholded.clone();
    let mut spanning_edges_added = 0;
    if options.mst_overlay {
        let forest = maximum_spanning_forest(&GraphBuilder::from_matrix(source));
        for (u, v, _) in forest.edges() {
            if matrix.get(u, v) == 0.0 && matrix.get(v, u) == 0.0 {
                matrix.set(u, v, source.get(u, v));
                matrix.set(v, u, source.get(v, u));
                spanning_edges_added += 1;
            }
        }
        log::debug!("Spanning forest overlay added {} edges", spanning_edges_added);
    }

    let graph = GraphBuilder::new(n, nodes).add_matrix(&matrix).build();
    let density = est_density(&matrix);

    let disparity = if options.disparity_overlay {
        Overlay::from_result(disparity_filter(&graph), "Disparity")
    } else {
        Overlay::NotRequested
    };

    let communities = if options.detect_communities {
        Overlay::from_result(detector.detect(&graph), "Community")
    } else {
        Overlay::NotRequested
    };

    Ok(ThresholdedGraph {
        matrix,
        graph,
        density,
        spanning_edges_added,
        disparity,
        communities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::detection::ConnectedComponents;
    use crate::graph::algorithms::is_connected;
    use crate::threshold::threshold_proportional;
    use anyhow::anyhow;

    struct Broken;

    impl CommunityDetector for Broken {
        fn detect(&self, _graph: &ConnectomeGraph) -> anyhow::Result<CommunityAffiliation> {
            Err(anyhow!("no partition"))
        }
    }

    fn chain() -> WeightedMatrix {
        WeightedMatrix::from_rows(&[
            vec![0.0, 0.9, 0.1, 0.1],
            vec![0.9, 0.0, 0.5, 0.1],
            vec![0.1, 0.5, 0.0, 0.3],
            vec![0.1, 0.1, 0.3, 0.0],
        ])
        .unwrap()
    }

    #[test]
    fn builder_reads_upper_then_lower() {
        let m = WeightedMatrix::from_rows(&[vec![0.0, 0.0], vec![0.4, 0.0]]).unwrap();
        let nodes = NodeSet::labelled(vec!["L".into(), "R".into()]);
        let g = GraphBuilder::new(2, &nodes).add_matrix(&m).build();
        assert_eq!(g.edge(0, 1).map(|e| e.weight), Some(0.4));
        assert_eq!(g.node(1).label.as_deref(), Some("R"));
    }

    #[test]
    fn mst_overlay_reconnects_graph() {
        let source = chain();
        let sparse = threshold_proportional(&source, 0.2);
        let options = AssemblyConfig {
            mst_overlay: true,
            ..AssemblyConfig::default()
        };

        let plain = assemble(&source, &sparse, &NodeSet::default(), &AssemblyConfig::default(), &ConnectedComponents).unwrap();
        assert!(!is_connected(&plain.graph));

        let result = assemble(&source, &sparse, &NodeSet::default(), &options, &ConnectedComponents).unwrap();
        assert!(is_connected(&result.graph));
        assert_eq!(result.spanning_edges_added, 2);
        assert_eq!(result.density, est_density(&result.matrix));
        assert_eq!(result.communities.as_option().map(|c| c.community_count()), Some(1));
    }

    #[test]
    fn overlays_are_tagged() {
        let source = chain();
        let options = AssemblyConfig {
            disparity_overlay: true,
            ..AssemblyConfig::default()
        };
        let result = assemble(&source, &source, &NodeSet::default(), &options, &Broken).unwrap();
        assert!(result.disparity.is_present());
        assert!(matches!(result.communities, Overlay::Failed(_)));

        let quiet = AssemblyConfig {
            detect_communities: false,
            ..AssemblyConfig::default()
        };
        let result = assemble(&source, &source, &NodeSet::default(), &quiet, &Broken).unwrap();
        assert_eq!(result.communities, Overlay::NotRequested);
        assert!(matches!(result.disparity, Overlay::NotRequested));
    }

    #[test]
    fn empty_result_is_valid() {
        let source = chain();
        let empty = WeightedMatrix::zeros(4);
        let result = assemble(&source, &empty, &NodeSet::default(), &AssemblyConfig::default(), &ConnectedComponents).unwrap();
        assert_eq!(result.density, 0.0);
        assert_eq!(result.graph.edge_count(), 0);

        let wrong = WeightedMatrix::zeros(3);
        assert!(assemble(&source, &wrong, &NodeSet::default(), &AssemblyConfig::default(), &ConnectedComponents).is_err());
    }
}
