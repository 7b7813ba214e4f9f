//! Interaction graph representation
//!
//! Directed multigraph of "replied-to" interactions: one edge from a post's
//! author to each participant who replied to that post.

use brandlens_common::dataset::{display_name, Channel, Post, UserId};
use serde::Serialize;
use std::collections::HashMap;

/// Edge in the interaction graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InteractionEdge {
    /// Author of the post that was replied to
    pub author: UserId,

    /// Sender of the reply
    pub replier: UserId,
}

impl InteractionEdge {
    pub fn is_self_loop(&self) -> bool {
        self.author == self.replier
    }

    pub fn touches(&self, id: UserId) -> bool {
        self.author == id || self.replier == id
    }
}

/// In-memory interaction graph
///
/// Nodes are stored in discovery order; every per-node score produced by a
/// ranker is a `Vec` indexed the same way.
#[derive(Debug, Clone, Default)]
pub struct InteractionGraph {
    /// Participant ids in discovery order
    nodes: Vec<UserId>,

    /// Participant id -> node index
    index: HashMap<UserId, usize>,

    /// Display names, first sighting wins
    names: HashMap<UserId, String>,

    /// Every interaction, duplicates retained
    edges: Vec<InteractionEdge>,

    /// Adjacency list by node index, one entry per edge
    outgoing: Vec<Vec<usize>>,

    /// Reverse adjacency by node index, one entry per edge
    incoming: Vec<Vec<usize>>,
}

impl InteractionGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for one channel snapshot
    pub fn from_channel(channel: &Channel) -> Self {
        Self::from_posts(&channel.posts)
    }

    /// Build the graph from posts with nested replies
    pub fn from_posts(posts: &[Post]) -> Self {
        let mut graph = Self::new();

        for post in posts {
            let Some(author) = &post.from else {
                continue;
            };
            graph.add_node(author.id);
            for reply in &post.replies {
                graph.add_edge(author.id, reply.sender_id);
            }
        }

        // Authors are named before reply senders, over the whole post list
        for author in posts.iter().filter_map(|p| p.from.as_ref()) {
            if graph.contains(author.id) {
                graph.set_name_if_absent(author.id, author.display_name());
            }
        }
        for reply in posts.iter().flat_map(|p| p.replies.iter()) {
            if graph.contains(reply.sender_id) {
                graph.set_name_if_absent(reply.sender_id, reply.display_name());
            }
        }

        graph
    }

    /// Add a node, returning its index
    pub fn add_node(&mut self, id: UserId) -> usize {
        if let Some(&idx) = self.index.get(&id) {
            return idx;
        }
        let idx = self.nodes.len();
        self.nodes.push(id);
        self.index.insert(id, idx);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        idx
    }

    /// Add an edge to the graph
    pub fn add_edge(&mut self, author: UserId, replier: UserId) {
        let from = self.add_node(author);
        let to = self.add_node(replier);

        self.edges.push(InteractionEdge { author, replier });
        self.outgoing[from].push(to);
        self.incoming[to].push(from);
    }

    /// Record a display name unless one is already known
    pub fn set_name_if_absent(&mut self, id: UserId, name: String) {
        self.names.entry(id).or_insert(name);
    }

    pub fn contains(&self, id: UserId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn index_of(&self, id: UserId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Participant id at a node index
    pub fn node(&self, idx: usize) -> UserId {
        self.nodes[idx]
    }

    /// Get all nodes in discovery order
    pub fn nodes(&self) -> &[UserId] {
        &self.nodes
    }

    /// Get all edges in insertion order
    pub fn edges(&self) -> &[InteractionEdge] {
        &self.edges
    }

    /// Get node count
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get edge count
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Display name for a participant, `id<ID>` when none was recorded
    pub fn name(&self, id: UserId) -> String {
        self.names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| display_name(id, None, None))
    }

    /// Successor indices of a node, repeated per parallel edge
    pub fn out_neighbors(&self, idx: usize) -> &[usize] {
        self.outgoing.get(idx).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Predecessor indices of a node, repeated per parallel edge
    pub fn in_neighbors(&self, idx: usize) -> &[usize] {
        self.incoming.get(idx).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Get outgoing edge count
    pub fn out_degree(&self, idx: usize) -> usize {
        self.out_neighbors(idx).len()
    }

    /// Number of edges touching a participant in either direction; a
    /// self-loop counts once
    pub fn engagement_users(&self, id: UserId) -> usize {
        let Some(idx) = self.index_of(id) else {
            return 0;
        };
        let self_loops = self.outgoing[idx].iter().filter(|&&t| t == idx).count();
        self.outgoing[idx].len() + self.incoming[idx].len() - self_loops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{author, post, reply};

    #[test]
    fn test_graph_construction() {
        let mut graph = InteractionGraph::new();

        // A replied to by B, B replied to by C
        graph.add_edge(1, 2);
        graph.add_edge(2, 3);

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.out_neighbors(0), &[1]);
        assert_eq!(graph.in_neighbors(1), &[0]);
        assert_eq!(graph.out_neighbors(1), &[2]);
    }

    #[test]
    fn test_discovery_order_and_multiplicity() {
        let posts = vec![
            post(1, Some(author(10, "Anna", "Lee")), vec![reply(20, "Bo", "x"), reply(20, "Bo", "y")]),
            post(2, Some(author(30, "Cy", "")), vec![]),
            post(3, Some(author(20, "Bo", "")), vec![reply(10, "Anna", "z")]),
        ];
        let graph = InteractionGraph::from_posts(&posts);

        assert_eq!(graph.nodes(), &[10, 20, 30]);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.out_degree(0), 2);
        assert_eq!(graph.engagement_users(20), 3);
        assert_eq!(graph.engagement_users(30), 0);
    }

    #[test]
    fn test_authorless_posts_add_no_edges() {
        let posts = vec![
            post(1, None, vec![reply(40, "Ghost", "hi")]),
            post(2, Some(author(10, "Anna", "Lee")), vec![reply(20, "Bo", "ok")]),
        ];
        let graph = InteractionGraph::from_posts(&posts);

        assert!(!graph.contains(40));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_author_name_wins_over_reply_name() {
        let posts = vec![
            post(1, Some(author(10, "Anna", "Lee")), vec![reply(20, "Bob", "hi")]),
            post(2, Some(author(20, "Robert", "Smith")), vec![reply(10, "Annie", "yo")]),
        ];
        let graph = InteractionGraph::from_posts(&posts);

        assert_eq!(graph.name(10), "Anna Lee");
        assert_eq!(graph.name(20), "Robert Smith");
        assert_eq!(graph.name(99), "id99");
    }

    #[test]
    fn test_self_loop_counts_once() {
        let posts = vec![post(
            1,
            Some(author(10, "Anna", "Lee")),
            vec![reply(10, "Anna", "me again"), reply(20, "Bo", "hi")],
        )];
        let graph = InteractionGraph::from_posts(&posts);

        assert_eq!(graph.edge_count(), 2);
        assert!(graph.edges()[0].is_self_loop());
        assert_eq!(graph.engagement_users(10), 2);
    }
}
