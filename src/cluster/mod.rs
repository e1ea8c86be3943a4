//! Community overlays for thresholded graphs

pub mod detection;
pub mod metrics;

use crate::graph::ConnectomeGraph;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Mapping from node index to an integer community id.
///
/// Only used for ordering and rendering, never for thresholding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityAffiliation {
    /// Community id of each node
    pub assignments: Vec<usize>,
}

impl CommunityAffiliation {
    pub fn new(assignments: Vec<usize>) -> Self {
        Self { assignments }
    }

    pub fn node_count(&self) -> usize {
        self.assignments.len()
    }

    /// Number of distinct community ids
    pub fn community_count(&self) -> usize {
        let mut ids = self.assignments.clone();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    /// Members of community `id`, ascending
    pub fn members(&self, id: usize) -> Vec<usize> {
        self.assignments
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c == id)
            .map(|(node, _)| node)
            .collect()
    }

    /// Node order grouping communities together, ties kept in index order
    pub fn ordering(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.assignments.len()).collect();
        order.sort_by_key(|&node| self.assignments[node]);
        order
    }

    /// `(start, size)` of each community block along [`Self::ordering`]
    pub fn blocks(&self) -> Vec<(usize, usize)> {
        let mut sorted = self.assignments.clone();
        sorted.sort_unstable();

        let mut blocks = Vec::new();
        let mut start = 0;
        for group in sorted.chunk_by(|a, b| a == b) {
            blocks.push((start, group.len()));
            start += group.len();
        }
        blocks
    }
}

/// Partitions a graph into communities
pub trait CommunityDetector: Send + Sync {
    fn detect(&self, graph: &ConnectomeGraph) -> Result<CommunityAffiliation>;
}
