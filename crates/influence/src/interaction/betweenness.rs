//! Betweenness centrality: bridging importance
//!
//! ```text
//! C_B(v) = Σ_{s≠v≠t} σ_st(v) / σ_st  /  (n-1)(n-2)
//! ```
//!
//! Computed with Brandes' algorithm: one BFS per source counting shortest
//! paths, then a reverse sweep accumulating dependencies. Paths are counted
//! over distinct node sequences, so parallel edges collapse and self-loops
//! are dropped before the sweep.

use super::{InteractionGraph, Ranker, RankerKind};
use std::collections::VecDeque;

/// Normalized directed betweenness scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct BetweennessScorer;

impl BetweennessScorer {
    pub fn new() -> Self {
        Self
    }

    /// Compute betweenness for all participants, indexed like the graph
    pub fn compute(&self, graph: &InteractionGraph) -> Vec<f64> {
        let n = graph.node_count();
        let mut betweenness = vec![0.0_f64; n];
        if n < 3 {
            return betweenness;
        }

        let adjacency = simple_adjacency(graph);

        for s in 0..n {
            let (sigma, predecessors, order) = shortest_paths(&adjacency, s);

            let mut delta = vec![0.0_f64; n];
            for &w in order.iter().rev() {
                for &v in &predecessors[w] {
                    delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
                }
                if w != s {
                    betweenness[w] += delta[w];
                }
            }
        }

        let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
        for b in &mut betweenness {
            *b *= scale;
        }

        betweenness
    }
}

impl Ranker for BetweennessScorer {
    fn kind(&self) -> RankerKind {
        RankerKind::Betweenness
    }

    fn compute(&self, graph: &InteractionGraph) -> Vec<f64> {
        BetweennessScorer::compute(self, graph)
    }
}

/// Successor lists with parallel edges and self-loops removed
fn simple_adjacency(graph: &InteractionGraph) -> Vec<Vec<usize>> {
    (0..graph.node_count())
        .map(|idx| {
            let mut successors: Vec<usize> = Vec::new();
            for &t in graph.out_neighbors(idx) {
                if t != idx && !successors.contains(&t) {
                    successors.push(t);
                }
            }
            successors
        })
        .collect()
}

/// BFS from `source`: path counts, shortest-path predecessors and visit order
fn shortest_paths(adjacency: &[Vec<usize>], source: usize) -> (Vec<f64>, Vec<Vec<usize>>, Vec<usize>) {
    let n = adjacency.len();
    let mut sigma = vec![0.0_f64; n];
    let mut dist: Vec<Option<usize>> = vec![None; n];
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut order = Vec::with_capacity(n);
    let mut queue = VecDeque::new();

    sigma[source] = 1.0;
    dist[source] = Some(0);
    queue.push_back(source);

    while let Some(v) = queue.pop_front() {
        order.push(v);
        let Some(dv) = dist[v] else {
            continue;
        };
        for &w in &adjacency[v] {
            if dist[w].is_none() {
                dist[w] = Some(dv + 1);
                queue.push_back(w);
            }
            if dist[w] == Some(dv + 1) {
                sigma[w] += sigma[v];
                predecessors[w].push(v);
            }
        }
    }

    (sigma, predecessors, order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::cycle_channel;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_path_middle_node() {
        // A -> B -> C: B is on the only A..C path
        let mut graph = InteractionGraph::new();
        graph.add_edge(1, 2);
        graph.add_edge(2, 3);

        let scores = BetweennessScorer::new().compute(&graph);
        // one pair of six passes through B
        assert!((scores[1] - 0.5).abs() < 1e-12);
        assert_eq!(scores[0], 0.0);
        assert_eq!(scores[2], 0.0);
    }

    #[test]
    fn test_cycle_bridge_is_nonzero() {
        let graph = InteractionGraph::from_channel(&cycle_channel());
        let scores = BetweennessScorer::new().compute(&graph);
        let b = graph.index_of(2).unwrap();
        assert!(scores[b] > 0.0);
    }

    #[test]
    fn test_small_graphs_are_zero() {
        let mut graph = InteractionGraph::new();
        graph.add_edge(1, 2);
        graph.add_edge(2, 1);
        assert_eq!(BetweennessScorer::new().compute(&graph), vec![0.0, 0.0]);
    }

    #[test]
    fn test_parallel_edges_do_not_multiply_paths() {
        let mut single = InteractionGraph::new();
        single.add_edge(1, 2);
        single.add_edge(2, 3);
        single.add_edge(1, 4);
        single.add_edge(4, 3);

        let mut doubled = single.clone();
        doubled.add_edge(1, 2);
        doubled.add_edge(2, 2);

        let a = BetweennessScorer::new().compute(&single);
        let b = BetweennessScorer::new().compute(&doubled);
        assert_eq!(a, b);
    }

    #[test]
    fn test_isolated_node_scores_zero() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let mut graph = InteractionGraph::new();
            let nodes: i64 = rng.gen_range(3..25);
            for _ in 0..rng.gen_range(0..60) {
                graph.add_edge(rng.gen_range(0..nodes), rng.gen_range(0..nodes));
            }
            let isolated = graph.add_node(1_000);

            let scores = BetweennessScorer::new().compute(&graph);
            assert_eq!(scores[isolated], 0.0);
            assert!(scores.iter().all(|&s| (0.0..=1.0 + 1e-12).contains(&s)));
        }
    }
}
