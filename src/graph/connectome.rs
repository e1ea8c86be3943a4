//! Undirected weighted connectome graph

use crate::matrix::{Coordinate, NodeSet, WeightedMatrix};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

/// Per-node annotations carried on the graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAttr {
    /// Region-of-interest name
    pub label: Option<String>,

    /// Centroid coordinate
    pub coord: Option<Coordinate>,
}

/// Per-edge attributes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeAttr {
    /// Connectivity strength as found in the matrix
    pub weight: f64,

    /// Path length derived from the weight, set by `weight_to_distance`
    pub distance: Option<f64>,

    /// Disparity significance, set by the disparity filter
    pub alpha: Option<f64>,
}

impl EdgeAttr {
    pub fn new(weight: f64) -> Self {
        Self {
            weight,
            distance: None,
            alpha: None,
        }
    }
}

/// Undirected graph over nodes `0..N`.
///
/// Nodes are never removed, so node `i` always corresponds to matrix row `i`.
/// Self-loops are rejected.
#[derive(Debug, Clone)]
pub struct ConnectomeGraph {
    inner: UnGraph<NodeAttr, EdgeAttr>,
}

impl ConnectomeGraph {
    /// Edgeless graph over `node_count` unannotated nodes
    pub fn with_nodes(node_count: usize) -> Self {
        Self::from_node_set(node_count, &NodeSet::default())
    }

    /// Edgeless graph whose nodes carry the given annotations
    pub fn from_node_set(node_count: usize, nodes: &NodeSet) -> Self {
        let mut inner = UnGraph::with_capacity(node_count, 0);
        for i in 0..node_count {
            inner.add_node(NodeAttr {
                label: nodes.label(i).map(str::to_string),
                coord: nodes.coord(i),
            });
        }
        Self { inner }
    }

    /// Same nodes, no edges
    pub fn empty_like(&self) -> Self {
        Self {
            inner: self.inner.filter_map(|_, n| Some(n.clone()), |_, _| None),
        }
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn node(&self, node: usize) -> &NodeAttr {
        &self.inner[NodeIndex::new(node)]
    }

    /// Insert an edge or overwrite the attributes of an existing one
    pub fn add_edge(&mut self, u: usize, v: usize, attr: EdgeAttr) {
        if u == v {
            return;
        }
        self.inner
            .update_edge(NodeIndex::new(u), NodeIndex::new(v), attr);
    }

    pub fn remove_edge(&mut self, u: usize, v: usize) -> Option<EdgeAttr> {
        let idx = self.inner.find_edge(NodeIndex::new(u), NodeIndex::new(v))?;
        self.inner.remove_edge(idx)
    }

    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        self.edge(u, v).is_some()
    }

    pub fn edge(&self, u: usize, v: usize) -> Option<&EdgeAttr> {
        let idx = self.inner.find_edge(NodeIndex::new(u), NodeIndex::new(v))?;
        self.inner.edge_weight(idx)
    }

    pub fn degree(&self, node: usize) -> usize {
        self.inner.edges(NodeIndex::new(node)).count()
    }

    /// Neighbours of `node` with the connecting edge
    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = (usize, &EdgeAttr)> + '_ {
        let a = NodeIndex::new(node);
        self.inner.edges(a).map(move |e| {
            let other = if e.source() == a { e.target() } else { e.source() };
            (other.index(), e.weight())
        })
    }

    /// All edges as `(u, v, attr)` with `u < v`
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, &EdgeAttr)> + '_ {
        self.inner.edge_references().map(|e| {
            let (a, b) = (e.source().index(), e.target().index());
            (a.min(b), a.max(b), e.weight())
        })
    }

    pub fn edge_attrs_mut(&mut self) -> impl Iterator<Item = &mut EdgeAttr> + '_ {
        self.inner.edge_weights_mut()
    }

    /// Fraction of node pairs joined by an edge
    pub fn density(&self) -> f64 {
        let n = self.node_count();
        if n < 2 {
            return 0.0;
        }
        2.0 * self.edge_count() as f64 / (n * (n - 1)) as f64
    }

    /// Symmetric weight matrix of the graph
    pub fn to_matrix(&self) -> WeightedMatrix {
        let mut matrix = WeightedMatrix::zeros(self.node_count());
        for (u, v, attr) in self.edges() {
            matrix.set(u, v, attr.weight);
            matrix.set(v, u, attr.weight);
        }
        matrix
    }

    /// Access the underlying petgraph graph
    pub fn inner(&self) -> &UnGraph<NodeAttr, EdgeAttr> {
        &self.inner
    }
}
