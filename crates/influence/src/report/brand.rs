//! Brand rating
//!
//! Three channel scores, each in percent, and their weighted mean. The
//! weakness is the lowest score among those with a positive weight.

use crate::kpi::ratio_percent;
use crate::sentiment::SentimentAggregator;
use brandlens_common::dataset::{Channel, Reply};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Most discussed posts scored by `trending_content_sentiment_ratio`
pub const TRENDING_POSTS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrandMetric {
    UserEngagementRatio,
    BrandResponsiveness,
    TrendingContentSentimentRatio,
}

impl BrandMetric {
    pub const ALL: [BrandMetric; 3] = [
        BrandMetric::UserEngagementRatio,
        BrandMetric::BrandResponsiveness,
        BrandMetric::TrendingContentSentimentRatio,
    ];
}

/// Relative weight of each score in the rating
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrandWeights {
    pub user_engagement_ratio: f64,
    pub brand_responsiveness: f64,
    pub trending_content_sentiment_ratio: f64,
}

impl Default for BrandWeights {
    fn default() -> Self {
        Self::from([1.0; 3])
    }
}

/// Weights in `BrandMetric::ALL` order
impl From<[f64; 3]> for BrandWeights {
    fn from([engagement, responsiveness, trending]: [f64; 3]) -> Self {
        Self {
            user_engagement_ratio: engagement,
            brand_responsiveness: responsiveness,
            trending_content_sentiment_ratio: trending,
        }
    }
}

impl BrandWeights {
    /// Weight of `metric`; negative weights count as 0
    pub fn of(&self, metric: BrandMetric) -> f64 {
        let weight = match metric {
            BrandMetric::UserEngagementRatio => self.user_engagement_ratio,
            BrandMetric::BrandResponsiveness => self.brand_responsiveness,
            BrandMetric::TrendingContentSentimentRatio => self.trending_content_sentiment_ratio,
        };
        weight.max(0.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BrandMetrics {
    pub user_engagement_ratio: f64,
    pub brand_responsiveness: f64,
    pub trending_content_sentiment_ratio: f64,
}

impl BrandMetrics {
    pub fn get(&self, metric: BrandMetric) -> f64 {
        match metric {
            BrandMetric::UserEngagementRatio => self.user_engagement_ratio,
            BrandMetric::BrandResponsiveness => self.brand_responsiveness,
            BrandMetric::TrendingContentSentimentRatio => self.trending_content_sentiment_ratio,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandRating {
    /// Weighted mean of the scores, 0 when every weight is 0
    pub rating: f64,

    /// Lowest weighted score; ties keep `BrandMetric::ALL` order
    pub weakness: Option<BrandMetric>,

    pub metrics: BrandMetrics,
}

impl BrandRating {
    pub fn combine(metrics: BrandMetrics, weights: &BrandWeights) -> Self {
        let total_weight: f64 = BrandMetric::ALL.iter().map(|&m| weights.of(m)).sum();
        let weighted: f64 = BrandMetric::ALL
            .iter()
            .map(|&m| weights.of(m) * metrics.get(m))
            .sum();
        let rating = if total_weight > 0.0 {
            weighted / total_weight
        } else {
            0.0
        };

        let weakness = BrandMetric::ALL
            .into_iter()
            .filter(|&m| weights.of(m) > 0.0)
            .fold(None, |lowest: Option<BrandMetric>, m| match lowest {
                Some(low) if metrics.get(low) <= metrics.get(m) => Some(low),
                _ => Some(m),
            });

        Self {
            rating,
            weakness,
            metrics,
        }
    }
}

/// Mean over posts of commenters / (commenters + forwards + likes)
///
/// A post with no interactions scores 0 and still counts toward the mean.
pub fn user_engagement_ratio(channel: &Channel) -> f64 {
    if channel.posts.is_empty() {
        return 0.0;
    }

    let total: f64 = channel
        .posts
        .iter()
        .map(|post| {
            let commenters = post
                .replies
                .iter()
                .map(|r| r.sender_id)
                .collect::<HashSet<_>>()
                .len() as u64;
            let interactions = commenters
                .saturating_add(post.forwards)
                .saturating_add(post.likes());
            ratio_percent(commenters as f64, interactions as f64)
        })
        .sum();
    total / channel.posts.len() as f64
}

/// Whether a reply was written by the community itself
///
/// Communities reply under a negative id; otherwise a non-blank first or
/// last name contained in the community name counts.
pub fn is_brand_reply(channel: &Channel, reply: &Reply) -> bool {
    if reply.sender_id < 0 {
        return true;
    }
    let Some(group) = channel.group_name.as_deref().map(str::to_lowercase) else {
        return false;
    };

    [reply.sender_name.as_deref(), reply.last_name.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .any(|name| group.contains(&name.to_lowercase()))
}

/// Share of posts the brand answered at least once
pub fn brand_responsiveness(channel: &Channel) -> f64 {
    let answered = channel
        .posts
        .iter()
        .filter(|post| post.replies.iter().any(|r| is_brand_reply(channel, r)))
        .count();
    ratio_percent(answered as f64, channel.posts.len() as f64)
}

/// Mean loyalty over the `top` most replied posts
///
/// Only posts with replies are candidates; ties keep post order. A post whose
/// replies are all neutral or unclassified scores 0.
pub async fn trending_content_sentiment_ratio(
    channel: &Channel,
    aggregator: &SentimentAggregator,
    top: usize,
) -> f64 {
    let mut discussed: Vec<_> = channel.posts.iter().filter(|p| !p.replies.is_empty()).collect();
    discussed.sort_by(|a, b| b.replies.len().cmp(&a.replies.len()));
    discussed.truncate(top);
    if discussed.is_empty() {
        return 0.0;
    }

    let owned = discussed.iter().enumerate().flat_map(|(i, post)| {
        post.replies
            .iter()
            .filter_map(move |reply| reply.classifiable_text().map(|text| (i, text)))
    });
    let sentiment = aggregator.counts_by_owner(owned, discussed.len()).await;

    let total: f64 = sentiment.iter().map(|counts| counts.loyalty_score()).sum();
    total / discussed.len() as f64
}

pub async fn brand_metrics(channel: &Channel, aggregator: &SentimentAggregator) -> BrandMetrics {
    BrandMetrics {
        user_engagement_ratio: user_engagement_ratio(channel),
        brand_responsiveness: brand_responsiveness(channel),
        trending_content_sentiment_ratio: trending_content_sentiment_ratio(
            channel,
            aggregator,
            TRENDING_POSTS,
        )
        .await,
    }
}
