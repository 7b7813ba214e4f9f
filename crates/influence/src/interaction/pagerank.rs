//! PageRank-based reference scoring
//!
//! Damped random walk over the interaction multigraph. Parallel edges weight
//! the transition probabilities; the mass of nodes without successors is
//! spread uniformly so the scores stay a probability distribution.

use super::{InteractionGraph, Ranker, RankerKind};
use brandlens_common::config::RankingSettings;

/// PageRank configuration
#[derive(Debug, Clone)]
pub struct PageRankConfig {
    /// Damping factor (typically 0.85)
    pub damping: f64,

    /// Maximum iterations
    pub max_iterations: usize,

    /// L1 convergence threshold
    pub tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

impl From<&RankingSettings> for PageRankConfig {
    fn from(settings: &RankingSettings) -> Self {
        Self {
            damping: settings.damping,
            max_iterations: settings.max_iterations,
            tolerance: settings.tolerance,
        }
    }
}

/// PageRank scorer for participants
#[derive(Debug, Clone, Default)]
pub struct PageRankScorer {
    config: PageRankConfig,
}

impl PageRankScorer {
    /// Create a new scorer
    pub fn new(config: PageRankConfig) -> Self {
        Self { config }
    }

    /// Compute PageRank scores for all participants, indexed like the graph
    pub fn compute(&self, graph: &InteractionGraph) -> Vec<f64> {
        let n = graph.node_count();
        if n == 0 {
            return Vec::new();
        }

        let n_f64 = n as f64;
        let damping = self.config.damping;
        let teleport = (1.0 - damping) / n_f64;

        let out_degree: Vec<usize> = (0..n).map(|idx| graph.out_degree(idx)).collect();
        let mut scores = vec![1.0 / n_f64; n];

        for iteration in 0..self.config.max_iterations {
            let dangling: f64 = (0..n)
                .filter(|&idx| out_degree[idx] == 0)
                .map(|idx| scores[idx])
                .sum();
            let base = teleport + damping * dangling / n_f64;

            let next: Vec<f64> = (0..n)
                .map(|node| {
                    let inflow: f64 = graph
                        .in_neighbors(node)
                        .iter()
                        .map(|&src| scores[src] / out_degree[src] as f64)
                        .sum();
                    base + damping * inflow
                })
                .collect();

            let change: f64 = next.iter().zip(&scores).map(|(a, b)| (a - b).abs()).sum();
            scores = next;

            if change < self.config.tolerance {
                tracing::trace!(iteration, change, "PageRank converged");
                break;
            }
        }

        scores
    }
}

impl Ranker for PageRankScorer {
    fn kind(&self) -> RankerKind {
        RankerKind::PageRank
    }

    fn compute(&self, graph: &InteractionGraph) -> Vec<f64> {
        PageRankScorer::compute(self, graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::cycle_channel;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn assert_distribution(scores: &[f64]) {
        let total: f64 = scores.iter().sum();
        assert!((total - 1.0).abs() < 1e-6, "scores sum to {}", total);
        assert!(scores.iter().all(|&s| s >= 0.0));
    }

    #[test]
    fn test_pagerank_basic() {
        let mut graph = InteractionGraph::new();

        // A -> B -> C
        //      ^
        //      D
        // B should outrank A (two incoming edges)
        graph.add_edge(1, 2);
        graph.add_edge(2, 3);
        graph.add_edge(4, 2);

        let scores = PageRankScorer::default().compute(&graph);
        let a = graph.index_of(1).unwrap();
        let b = graph.index_of(2).unwrap();

        assert!(scores[b] > scores[a], "B should rank higher than A");
        assert_distribution(&scores);
    }

    #[test]
    fn test_pagerank_empty_graph() {
        let graph = InteractionGraph::new();
        assert!(PageRankScorer::default().compute(&graph).is_empty());
    }

    #[test]
    fn test_cycle_scores_are_equal() {
        let graph = InteractionGraph::from_channel(&cycle_channel());
        let scores = PageRankScorer::default().compute(&graph);

        assert_eq!(scores.len(), 3);
        for score in &scores {
            assert!((score - 1.0 / 3.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_isolated_node_gets_teleport_share() {
        let mut graph = InteractionGraph::new();
        graph.add_node(9);
        let scores = PageRankScorer::default().compute(&graph);
        assert_eq!(scores.len(), 1);
        assert!((scores[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_parallel_edges_weight_transitions() {
        let mut graph = InteractionGraph::new();
        graph.add_edge(1, 2);
        graph.add_edge(1, 2);
        graph.add_edge(1, 3);

        let scores = PageRankScorer::default().compute(&graph);
        assert!(scores[1] > scores[2]);
        assert_distribution(&scores);
    }

    #[test]
    fn test_random_graphs_stay_distributions() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let mut graph = InteractionGraph::new();
            let nodes = rng.gen_range(1..30);
            for id in 0..nodes {
                graph.add_node(id);
            }
            for _ in 0..rng.gen_range(0..80) {
                graph.add_edge(rng.gen_range(0..nodes), rng.gen_range(0..nodes));
            }
            assert_distribution(&PageRankScorer::default().compute(&graph));
        }
    }
}
