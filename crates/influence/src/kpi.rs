//! Per-channel engagement KPIs
//!
//! Plain arithmetic over post and reply counters, plus the reply sentiment
//! NPS. Every ratio is 0 when its denominator is 0. Views are summed only
//! over posts that report them. Counter sums saturate.

use crate::sentiment::SentimentAggregator;
use brandlens_common::dataset::{Channel, Post, WINDOW_DATE_FORMAT};
use chrono::{DateTime, Duration, NaiveDate};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Reaction names counted as "love"
const LOVE_EMOJI: &[&str] = &["❤", "❤️", "like"];

/// `numerator / denominator * 100`, 0 when the denominator is 0
pub fn ratio_percent(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator * 100.0
    }
}

/// Reaction or mention total for one emoji
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmojiCount {
    pub emoji: String,
    pub count: u64,
}

/// Reply density for one day of the crawl window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyDiscussion {
    /// dd/mm/YYYY
    pub date: String,
    pub value: f64,
}

/// KPI block for the post involvement dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelKpis {
    pub love_rate: f64,
    pub engagement_rate: f64,
    pub engagement_rate_by_reach: f64,
    pub channel_citation_index: f64,
    pub audience_coverage: u64,
    pub discussion_rate: Vec<DailyDiscussion>,

    /// (positive - negative) / classified * 100 over every reply
    pub net_promoter_score: f64,

    /// Most used post reactions
    pub top_emoji: Vec<EmojiCount>,

    /// Emojis most often written in reply text
    pub top_reply_emoji: Vec<EmojiCount>,
}

impl ChannelKpis {
    pub async fn compute(
        channels: &[Channel],
        emoji_top: usize,
        aggregator: &SentimentAggregator,
    ) -> Self {
        Self {
            love_rate: love_rate(channels),
            engagement_rate: engagement_rate(channels),
            engagement_rate_by_reach: engagement_rate_by_reach(channels),
            channel_citation_index: channel_citation_index(channels),
            audience_coverage: audience_coverage(channels),
            discussion_rate: discussion_rate(channels),
            net_promoter_score: net_promoter_score(channels, aggregator).await,
            top_emoji: top_emoji(channels, emoji_top),
            top_reply_emoji: top_reply_emoji(channels, emoji_top),
        }
    }
}

fn saturating_sum(values: impl Iterator<Item = u64>) -> u64 {
    values.fold(0, u64::saturating_add)
}

fn posts(channels: &[Channel]) -> impl Iterator<Item = &Post> {
    channels.iter().flat_map(|c| c.posts.iter())
}

fn total_views(channels: &[Channel]) -> u64 {
    saturating_sum(posts(channels).filter_map(|p| p.views))
}

fn total_forwards(channels: &[Channel]) -> u64 {
    saturating_sum(posts(channels).map(|p| p.forwards))
}

fn total_post_reactions(channels: &[Channel]) -> u64 {
    saturating_sum(posts(channels).map(Post::total_reactions))
}

/// Distinct reply senders, counted per channel and summed
fn unique_commenters(channels: &[Channel]) -> u64 {
    channels
        .iter()
        .map(|c| c.replies().map(|r| r.sender_id).collect::<HashSet<_>>().len() as u64)
        .sum()
}

/// Post reactions + unique commenters + forwards
fn interactions(channels: &[Channel]) -> u64 {
    total_post_reactions(channels)
        .saturating_add(unique_commenters(channels))
        .saturating_add(total_forwards(channels))
}

/// Love reactions on viewed posts over total views
pub fn love_rate(channels: &[Channel]) -> f64 {
    let loves = saturating_sum(
        posts(channels)
            .filter(|p| p.views.is_some())
            .flat_map(|p| p.reactions.iter())
            .filter(|r| r.emoji.as_deref().is_some_and(|e| LOVE_EMOJI.contains(&e)))
            .map(|r| r.count),
    );
    ratio_percent(loves as f64, total_views(channels) as f64)
}

/// Interactions over followers
pub fn engagement_rate(channels: &[Channel]) -> f64 {
    let followers: u64 = channels.iter().map(|c| c.members_count).sum();
    ratio_percent(interactions(channels) as f64, followers as f64)
}

/// Interactions over total views
pub fn engagement_rate_by_reach(channels: &[Channel]) -> f64 {
    ratio_percent(interactions(channels) as f64, total_views(channels) as f64)
}

/// Forwards over total views
pub fn channel_citation_index(channels: &[Channel]) -> f64 {
    ratio_percent(total_forwards(channels) as f64, total_views(channels) as f64)
}

/// Daily reach: every interaction plus views, over the crawl window length
pub fn audience_coverage(channels: &[Channel]) -> u64 {
    let reply_reactions = saturating_sum(
        channels
            .iter()
            .flat_map(|c| c.replies())
            .flat_map(|r| r.reactions.iter())
            .map(|r| r.count),
    );
    let total = interactions(channels)
        .saturating_add(reply_reactions)
        .saturating_add(total_views(channels));

    let days: i64 = channels
        .iter()
        .filter_map(Channel::window_days)
        .filter(|&d| d > 0)
        .sum();
    if days <= 0 {
        return 0;
    }
    total / days as u64
}

/// Replies per distinct replier for each day of every channel's window
///
/// A post belongs to the UTC day of its timestamp. A day with one replier
/// scores 1, a day without replies scores 0.
pub fn discussion_rate(channels: &[Channel]) -> Vec<DailyDiscussion> {
    let mut result = Vec::new();

    for channel in channels {
        let Some((start, end)) = window(channel) else {
            continue;
        };

        let mut by_day: HashMap<NaiveDate, Vec<i64>> = HashMap::new();
        for post in &channel.posts {
            let Some(day) = post.date.and_then(|ts| DateTime::from_timestamp(ts, 0)) else {
                continue;
            };
            by_day
                .entry(day.date_naive())
                .or_default()
                .extend(post.replies.iter().map(|r| r.sender_id));
        }

        let mut day = start;
        while day <= end {
            let senders = by_day.get(&day).map(|v| v.as_slice()).unwrap_or(&[]);
            let unique = senders.iter().collect::<HashSet<_>>().len();
            let value = match unique {
                0 => 0.0,
                1 => 1.0,
                _ => senders.len() as f64 / unique as f64,
            };
            result.push(DailyDiscussion {
                date: day.format(WINDOW_DATE_FORMAT).to_string(),
                value,
            });
            day += Duration::days(1);
        }
    }

    result
}

fn window(channel: &Channel) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::parse_from_str(channel.from.as_deref()?, WINDOW_DATE_FORMAT).ok()?;
    let end = NaiveDate::parse_from_str(channel.to.as_deref()?, WINDOW_DATE_FORMAT).ok()?;
    Some((start, end))
}

/// Net promoter score over the text of every reply in the network
pub async fn net_promoter_score(channels: &[Channel], aggregator: &SentimentAggregator) -> f64 {
    let texts = channels
        .iter()
        .flat_map(|c| c.replies())
        .filter_map(|r| r.classifiable_text());
    aggregator.counts(texts).await.net_promoter_score()
}

/// The `n` most used post reactions; ties keep first-seen order
pub fn top_emoji(channels: &[Channel], n: usize) -> Vec<EmojiCount> {
    let reactions = posts(channels)
        .flat_map(|p| p.reactions.iter())
        .filter_map(|r| r.emoji.as_deref().map(|e| (e.to_string(), r.count)));
    most_common(reactions, n)
}

/// The `n` emojis written most often in reply text; ties keep first-seen order
///
/// Every emoji character counts once per occurrence, so a skin tone
/// modifier or a flag half is its own entry.
pub fn top_reply_emoji(channels: &[Channel], n: usize) -> Vec<EmojiCount> {
    let mentions = channels
        .iter()
        .flat_map(|c| c.replies())
        .filter_map(|r| r.text.as_deref())
        .flat_map(|text| text.chars().filter(|&c| is_emoji(c)))
        .map(|c| (c.to_string(), 1));
    most_common(mentions, n)
}

fn most_common(items: impl Iterator<Item = (String, u64)>, n: usize) -> Vec<EmojiCount> {
    let mut totals: Vec<EmojiCount> = Vec::new();
    let mut slot: HashMap<String, usize> = HashMap::new();

    for (emoji, count) in items {
        match slot.get(&emoji) {
            Some(&i) => totals[i].count = totals[i].count.saturating_add(count),
            None => {
                slot.insert(emoji.clone(), totals.len());
                totals.push(EmojiCount { emoji, count });
            }
        }
    }

    totals.sort_by(|a, b| b.count.cmp(&a.count));
    totals.truncate(n);
    totals
}

/// Pictographic characters that render as emoji on their own
pub fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x1F000..=0x1FAFF
            | 0x2600..=0x27BF
            | 0x2300..=0x23FF
            | 0x2B05..=0x2B07
            | 0x2B1B..=0x2B1C
            | 0x2B50
            | 0x2B55
            | 0x203C
            | 0x2049
            | 0x2122
            | 0x2139
            | 0x2194..=0x2199
            | 0x21A9..=0x21AA
            | 0x3030
            | 0x303D
            | 0x3297
            | 0x3299
            | 0x00A9
            | 0x00AE
    )
}
