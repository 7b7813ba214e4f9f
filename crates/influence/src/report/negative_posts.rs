//! Posts ranked by negative reply sentiment

use crate::kpi::ratio_percent;
use crate::sentiment::SentimentAggregator;
use brandlens_common::dataset::Channel;
use serde::Serialize;

/// A post with its reply sentiment split and engagement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NegativePost {
    pub post_id: i64,

    /// Author display name
    pub name: String,

    /// Post text, empty when the post has none
    pub text: String,

    /// (likes + replies + forwards) / followers * 100
    pub engagement_rate: f64,

    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,

    /// Every reply, classified or not
    pub reply_count: usize,
}

/// Engagement of a single post relative to the channel's followers
///
/// Counters saturate at `u64::MAX` instead of wrapping.
pub fn post_engagement_rate(likes: u64, replies: usize, forwards: u64, followers: u64) -> f64 {
    let interactions = likes
        .saturating_add(replies as u64)
        .saturating_add(forwards);
    ratio_percent(interactions as f64, followers as f64)
}

/// The `n` authored posts with the highest share of negative replies
pub async fn rank_negative_posts(
    channel: &Channel,
    aggregator: &SentimentAggregator,
    n: usize,
) -> Vec<NegativePost> {
    let posts: Vec<_> = channel.authored_posts().collect();

    let owned = posts.iter().enumerate().flat_map(|(i, (post, _))| {
        post.replies
            .iter()
            .filter_map(move |reply| reply.classifiable_text().map(|text| (i, text)))
    });
    let sentiment = aggregator.counts_by_owner(owned, posts.len()).await;

    let mut ranked: Vec<NegativePost> = posts
        .iter()
        .zip(sentiment)
        .map(|((post, author), counts)| {
            let share = counts.shares();
            NegativePost {
                post_id: post.id,
                name: author.display_name(),
                text: post.text.clone().unwrap_or_default(),
                engagement_rate: post_engagement_rate(
                    post.likes(),
                    post.reply_count(),
                    post.forwards,
                    channel.members_count,
                ),
                positive: share.positive,
                negative: share.negative,
                neutral: share.neutral,
                reply_count: post.reply_count(),
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.negative.total_cmp(&a.negative));
    ranked.truncate(n);
    ranked
}
