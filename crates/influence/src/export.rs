//! Plot data for a computed ranking
//!
//! Rendering is left to the consumer; this only lays out what a plot draws.

use crate::interaction::{InteractionGraph, RankerKind, Ranking};
use brandlens_common::dataset::UserId;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// A participant as drawn on the plot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: UserId,
    pub name: String,
    pub score: f64,

    /// Whether the node is in the top K of the ranking
    pub highlighted: bool,
}

/// Interactions between two participants collapsed into one edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    /// Post author
    pub source: UserId,
    /// Replier
    pub target: UserId,
    /// Number of replies
    pub weight: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphExport {
    pub kind: RankerKind,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl GraphExport {
    /// Lay out `graph` with the scores of `ranking`, highlighting its top `k`
    pub fn build(graph: &InteractionGraph, ranking: &Ranking, k: usize) -> Self {
        let highlighted: HashSet<usize> = ranking.top_indices(k).into_iter().collect();

        let nodes = graph
            .nodes()
            .iter()
            .enumerate()
            .map(|(idx, &id)| GraphNode {
                id,
                name: graph.name(id),
                score: ranking.score_at(idx),
                highlighted: highlighted.contains(&idx),
            })
            .collect();

        let mut edges: Vec<GraphEdge> = Vec::new();
        let mut slot: HashMap<(UserId, UserId), usize> = HashMap::new();
        for edge in graph.edges() {
            let key = (edge.author, edge.replier);
            match slot.get(&key) {
                Some(&i) => edges[i].weight += 1,
                None => {
                    slot.insert(key, edges.len());
                    edges.push(GraphEdge {
                        source: edge.author,
                        target: edge.replier,
                        weight: 1,
                    });
                }
            }
        }

        Self {
            kind: ranking.kind,
            nodes,
            edges,
        }
    }

    pub fn highlighted(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(|n| n.highlighted)
    }
}
