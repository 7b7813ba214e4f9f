//! Replies grouped by the sender's city

use crate::kpi::ratio_percent;
use crate::sentiment::SentimentAggregator;
use brandlens_common::dataset::Channel;
use serde::Serialize;
use std::collections::HashMap;

/// City used for replies without one
pub const UNKNOWN_CITY: &str = "Unknown";

/// Activity and mood of one region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionStats {
    pub city: String,

    /// Replies sent from this city
    pub replies: usize,

    /// Share of all replies, in percent
    pub percent: f64,

    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

/// The `limit` cities with the most replies; ties keep first-seen order
pub async fn top_regions(
    channels: &[Channel],
    aggregator: &SentimentAggregator,
    limit: usize,
) -> Vec<RegionStats> {
    let mut cities: Vec<(&str, usize)> = Vec::new();
    let mut slot: HashMap<&str, usize> = HashMap::new();
    let mut owned: Vec<(usize, &str)> = Vec::new();
    let mut total = 0usize;

    for reply in channels.iter().flat_map(|c| c.replies()) {
        let city = reply
            .city
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNKNOWN_CITY);
        let i = *slot.entry(city).or_insert_with(|| {
            cities.push((city, 0));
            cities.len() - 1
        });
        cities[i].1 += 1;
        total += 1;
        if let Some(text) = reply.classifiable_text() {
            owned.push((i, text));
        }
    }

    let mut order: Vec<usize> = (0..cities.len()).collect();
    order.sort_by(|&a, &b| cities[b].1.cmp(&cities[a].1));
    order.truncate(limit);

    // Only the reported cities are classified
    let rank: HashMap<usize, usize> = order.iter().enumerate().map(|(r, &i)| (i, r)).collect();
    let owned = owned
        .into_iter()
        .filter_map(|(i, text)| rank.get(&i).map(|&r| (r, text)));
    let sentiment = aggregator.counts_by_owner(owned, order.len()).await;

    order
        .into_iter()
        .zip(sentiment)
        .map(|(i, counts)| {
            let (city, replies) = cities[i];
            let share = counts.shares();
            RegionStats {
                city: city.to_string(),
                replies,
                percent: ratio_percent(replies as f64, total as f64),
                positive: share.positive,
                negative: share.negative,
                neutral: share.neutral,
            }
        })
        .collect()
}
