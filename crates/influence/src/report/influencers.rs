//! Influencer table assembly
//!
//! Joins the top of a centrality ranking with interaction counts and the
//! sentiment of each influencer's own replies.

use crate::interaction::{InteractionGraph, Ranking};
use crate::sentiment::{SentimentAggregator, SentimentCounts};
use brandlens_common::dataset::{Channel, UserId};
use serde::Serialize;
use std::collections::HashMap;

/// One row of an influencer table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfluencerProfile {
    pub id: UserId,
    pub name: String,

    /// Centrality score rounded to 5 decimals
    pub score: f64,

    /// Interactions touching this participant in either direction
    pub engagement_users: usize,

    /// Loyalty over the participant's own replies
    pub loyalty: f64,

    pub sentiment: SentimentCounts,
}

/// Influencer rows keyed by display name, in ranking order
///
/// A row whose name is already present replaces the earlier row in place.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct InfluencerTable {
    rows: Vec<InfluencerProfile>,
}

impl InfluencerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, profile: InfluencerProfile) {
        match self.rows.iter_mut().find(|row| row.name == profile.name) {
            Some(existing) => *existing = profile,
            None => self.rows.push(profile),
        }
    }

    pub fn get(&self, name: &str) -> Option<&InfluencerProfile> {
        self.rows.iter().find(|row| row.name == name)
    }

    pub fn rows(&self) -> &[InfluencerProfile] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<InfluencerProfile> {
        self.rows
    }
}

/// Round to 5 decimal places
pub fn round5(value: f64) -> f64 {
    (value * 1e5).round() / 1e5
}

/// Build the influencer table for the top `k` of a ranking
pub async fn assemble(
    channel: &Channel,
    graph: &InteractionGraph,
    ranking: &Ranking,
    k: usize,
    aggregator: &SentimentAggregator,
) -> InfluencerTable {
    let top = ranking.top(graph, k);
    let slot: HashMap<UserId, usize> = top.iter().enumerate().map(|(i, node)| (node.id, i)).collect();

    // Loyalty covers every reply the influencer wrote, on any post
    let owned = channel.replies().filter_map(|reply| {
        let owner = *slot.get(&reply.sender_id)?;
        Some((owner, reply.classifiable_text()?))
    });
    let sentiment = aggregator.counts_by_owner(owned, top.len()).await;

    let mut table = InfluencerTable::new();
    for (node, counts) in top.into_iter().zip(sentiment) {
        table.insert(InfluencerProfile {
            id: node.id,
            name: graph.name(node.id),
            score: round5(node.score),
            engagement_users: graph.engagement_users(node.id),
            loyalty: counts.loyalty_score(),
            sentiment: counts,
        });
    }
    table
}
