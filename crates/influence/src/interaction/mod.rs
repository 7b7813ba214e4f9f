//! Interaction graph centrality
//!
//! Builds the reply graph of a channel and ranks participants by reference
//! (PageRank) and by bridging (betweenness).

mod betweenness;
mod graph;
mod pagerank;

pub use betweenness::BetweennessScorer;
pub use graph::{InteractionEdge, InteractionGraph};
pub use pagerank::{PageRankConfig, PageRankScorer};

use brandlens_common::errors::AppError;
use brandlens_common::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Centrality notion used to rank participants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankerKind {
    /// Importance by reference
    PageRank,
    /// Importance by bridging
    Betweenness,
}

impl RankerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankerKind::PageRank => "pagerank",
            RankerKind::Betweenness => "betweenness",
        }
    }
}

impl fmt::Display for RankerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankerKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pagerank" | "reference" => Ok(RankerKind::PageRank),
            "betweenness" | "bridging" => Ok(RankerKind::Betweenness),
            other => Err(AppError::Validation {
                message: format!("unknown ranking '{}', expected pagerank or betweenness", other),
                field: Some("kind".to_string()),
            }),
        }
    }
}

/// Per-node centrality over an interaction graph
pub trait Ranker: Send + Sync {
    fn kind(&self) -> RankerKind;

    /// Scores indexed like `graph.nodes()`
    fn compute(&self, graph: &InteractionGraph) -> Vec<f64>;
}

/// Participant with its centrality score
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedNode {
    pub id: UserId,
    pub score: f64,
}

/// Computed scores for every node of one graph
#[derive(Debug, Clone)]
pub struct Ranking {
    pub kind: RankerKind,
    scores: Vec<f64>,
}

impl Ranking {
    /// Run a ranker once over a graph
    pub fn compute(ranker: &dyn Ranker, graph: &InteractionGraph) -> Self {
        Self {
            kind: ranker.kind(),
            scores: ranker.compute(graph),
        }
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn score_at(&self, idx: usize) -> f64 {
        self.scores.get(idx).copied().unwrap_or(0.0)
    }

    /// Node indices of the `k` best scores
    pub fn top_indices(&self, k: usize) -> Vec<usize> {
        top_k(&self.scores, k)
    }

    /// The `k` best participants, highest first
    pub fn top(&self, graph: &InteractionGraph, k: usize) -> Vec<RankedNode> {
        self.top_indices(k)
            .into_iter()
            .map(|idx| RankedNode {
                id: graph.node(idx),
                score: self.scores[idx],
            })
            .collect()
    }
}

/// Indices of the `k` highest scores, descending; equal scores keep
/// discovery order
pub fn top_k(scores: &[f64], k: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order.truncate(k);
    order
}
