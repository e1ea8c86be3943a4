//! Community detection over thresholded graphs

use crate::cluster::{CommunityAffiliation, CommunityDetector};
use crate::graph::ConnectomeGraph;
use anyhow::Result;

/// Union-Find structure for connected component analysis
pub struct DisjointSets {
    /// Parent pointers (parent[i] = parent of node i)
    parent: Vec<usize>,

    /// Size of each set (for union by size)
    size: Vec<usize>,
}

impl DisjointSets {
    /// Each node starts in its own set
    pub fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            size: vec![1; size],
        }
    }

    /// Find the root of the set containing x with path compression
    pub fn find(&mut self, x: usize) -> usize {
        let px = self.parent[x];
        if px != x {
            self.parent[x] = self.find(px);
        }
        self.parent[x]
    }

    /// Union the sets containing x and y
    pub fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);

        if root_x == root_y {
            return;
        }

        // Attach smaller tree under root of larger tree
        if self.size[root_x] >= self.size[root_y] {
            self.parent[root_y] = root_x;
            self.size[root_x] += self.size[root_y];
        } else {
            self.parent[root_x] = root_y;
            self.size[root_y] += self.size[root_x];
        }
    }

    /// Get the size of the set containing x
    pub fn set_size(&mut self, x: usize) -> usize {
        let root = self.find(x);
        self.size[root]
    }
}

/// Treats each connected component as a community.
///
/// Community ids follow the lowest node index in each component, so the
/// partition is deterministic for a given graph.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConnectedComponents;

impl CommunityDetector for ConnectedComponents {
    fn detect(&self, graph: &ConnectomeGraph) -> Result<CommunityAffiliation> {
        let node_count = graph.node_count();
        let mut sets = DisjointSets::new(node_count);

        for (u, v, _) in graph.edges() {
            sets.union(u, v);
        }

        // Relabel roots in order of first appearance
        let mut root_to_id = vec![usize::MAX; node_count];
        let mut next_id = 0;
        let mut assignments = Vec::with_capacity(node_count);
        for node in 0..node_count {
            let root = sets.find(node);
            if root_to_id[root] == usize::MAX {
                root_to_id[root] = next_id;
                next_id += 1;
            }
            assignments.push(root_to_id[root]);
        }

        log::debug!("Found {} connected components", next_id);

        Ok(CommunityAffiliation::new(assignments))
    }
}
