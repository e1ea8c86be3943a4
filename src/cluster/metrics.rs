//! Network statistics for thresholded graphs

use crate::cluster::CommunityAffiliation;
use crate::graph::algorithms::component_count;
use crate::graph::ConnectomeGraph;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Number of hub nodes reported in a summary
const HUB_COUNT: usize = 5;

/// Whole-graph statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,

    /// Mean summed absolute weight per node
    pub mean_strength: f64,

    /// Nodes without any edge
    pub isolated_nodes: usize,

    pub component_count: usize,

    /// Highest-degree nodes, ties broken by index
    pub hubs: Vec<usize>,

    /// Per-community statistics, when a partition is available
    pub communities: Vec<CommunitySummary>,
}

/// Statistics for a single community
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunitySummary {
    pub id: usize,
    pub size: usize,

    /// Internal edges / potential internal edges
    pub density: f64,
}

/// Summarize a graph and, optionally, its community partition
pub fn summarize(graph: &ConnectomeGraph, communities: Option<&CommunityAffiliation>) -> GraphSummary {
    let node_count = graph.node_count();

    let mut strength = vec![0.0; node_count];
    for (u, v, attr) in graph.edges() {
        strength[u] += attr.weight.abs();
        strength[v] += attr.weight.abs();
    }
    let mean_strength = if node_count == 0 {
        0.0
    } else {
        strength.iter().sum::<f64>() / node_count as f64
    };

    let degrees: Vec<usize> = (0..node_count).map(|n| graph.degree(n)).collect();
    let isolated_nodes = degrees.iter().filter(|&&d| d == 0).count();

    let mut by_degree: Vec<usize> = (0..node_count).collect();
    by_degree.sort_by(|&a, &b| degrees[b].cmp(&degrees[a]));
    let hubs = by_degree.into_iter().take(HUB_COUNT).collect();

    let communities = communities
        .map(|aff| {
            let mut ids = aff.assignments.clone();
            ids.sort_unstable();
            ids.dedup();
            ids.into_iter()
                .map(|id| {
                    let members = aff.members(id);
                    CommunitySummary {
                        id,
                        size: members.len(),
                        density: community_density(graph, &members),
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    GraphSummary {
        node_count,
        edge_count: graph.edge_count(),
        density: graph.density(),
        mean_strength,
        isolated_nodes,
        component_count: component_count(graph),
        hubs,
        communities,
    }
}

/// Calculate density (actual edges / potential edges) within `members`
pub fn community_density(graph: &ConnectomeGraph, members: &[usize]) -> f64 {
    let n = members.len();
    if n <= 1 {
        return 1.0; // By convention, singleton communities have density 1
    }

    let potential_edges = n * (n - 1) / 2;
    let member_set: HashSet<usize> = members.iter().copied().collect();

    let actual_edges = graph
        .edges()
        .filter(|(u, v, _)| member_set.contains(u) && member_set.contains(v))
        .count();

    actual_edges as f64 / potential_edges as f64
}
