//! Reply sentiment by comment length
//!
//! Replies are bucketed by character count and each bucket's labels are
//! weighted by classifier confidence, so a bucket's three shares sum to 100
//! whenever anything in it was classified.

use crate::sentiment::SentimentAggregator;
use brandlens_common::dataset::Channel;
use brandlens_common::sentiment::SentimentLabel;
use serde::Serialize;

/// Bucket labels with their inclusive upper bound in characters
pub const LENGTH_BUCKETS: &[(&str, Option<usize>)] = &[
    ("0-10", Some(10)),
    ("11-50", Some(50)),
    ("51-100", Some(100)),
    ("101-200", Some(200)),
    ("201+", None),
];

/// Score-weighted sentiment distribution of one length bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LengthBucket {
    pub range: &'static str,

    /// Replies that fell into the bucket
    pub comments: usize,

    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

/// Index of the bucket a text of `chars` characters falls into
pub fn bucket_of(chars: usize) -> usize {
    LENGTH_BUCKETS
        .iter()
        .position(|(_, max)| max.map_or(true, |m| chars <= m))
        .unwrap_or(LENGTH_BUCKETS.len() - 1)
}

/// Sentiment distribution per length bucket over every reply in `channels`
pub async fn sentiment_by_length(
    channels: &[Channel],
    aggregator: &SentimentAggregator,
) -> Vec<LengthBucket> {
    let (buckets, texts): (Vec<usize>, Vec<String>) = channels
        .iter()
        .flat_map(|c| c.replies())
        .filter_map(|r| r.classifiable_text())
        .map(|text| (bucket_of(text.chars().count()), text.to_string()))
        .unzip();

    let classified = aggregator.classify_all(&texts).await;

    let mut comments = vec![0usize; LENGTH_BUCKETS.len()];
    let mut weights = vec![[0.0_f64; 3]; LENGTH_BUCKETS.len()];
    for (bucket, result) in buckets.into_iter().zip(classified) {
        comments[bucket] += 1;
        if let Some(c) = result {
            let slot = match c.label {
                SentimentLabel::Positive => 0,
                SentimentLabel::Negative => 1,
                SentimentLabel::Neutral => 2,
            };
            weights[bucket][slot] += f64::from(c.score);
        }
    }

    LENGTH_BUCKETS
        .iter()
        .enumerate()
        .map(|(i, (range, _))| {
            let [positive, negative, neutral] = weights[i];
            let total = positive + negative + neutral;
            let share = |w: f64| if total == 0.0 { 0.0 } else { w / total * 100.0 };
            LengthBucket {
                range: *range,
                comments: comments[i],
                positive: share(positive),
                negative: share(negative),
                neutral: share(neutral),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{author, channel, keyword_aggregator, post, reply};

    #[test]
    fn test_bucket_bounds() {
        assert_eq!(bucket_of(0), 0);
        assert_eq!(bucket_of(10), 0);
        assert_eq!(bucket_of(11), 1);
        assert_eq!(bucket_of(50), 1);
        assert_eq!(bucket_of(100), 2);
        assert_eq!(bucket_of(101), 3);
        assert_eq!(bucket_of(201), 4);
        assert_eq!(bucket_of(10_000), 4);
    }

    #[tokio::test]
    async fn test_distribution_per_bucket() {
        let long_praise = format!("great {}", "x".repeat(60));
        let replies = vec![
            reply(1, "A", "bad"),
            reply(2, "B", "good"),
            reply(3, "C", &long_praise),
            reply(4, "D", "привет"),
        ];
        let channels = vec![channel(1, vec![post(1, Some(author(9, "Z", "")), replies)])];

        let buckets = sentiment_by_length(&channels, &keyword_aggregator()).await;
        assert_eq!(buckets.len(), 5);

        let short = &buckets[0];
        assert_eq!(short.range, "0-10");
        assert_eq!(short.comments, 3);
        let sum = short.positive + short.negative + short.neutral;
        assert!((sum - 100.0).abs() < 1e-9);
        assert!((short.positive - short.negative).abs() < 1e-9);

        assert_eq!(buckets[2].comments, 1);
        assert!((buckets[2].positive - 100.0).abs() < 1e-9);

        assert_eq!(buckets[4].comments, 0);
        assert_eq!(buckets[4].positive, 0.0);
    }
}
