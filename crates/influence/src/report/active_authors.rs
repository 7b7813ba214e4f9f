//! Most active authors by number of posts

use super::negative_posts::post_engagement_rate;
use crate::sentiment::{SentimentAggregator, SentimentCounts};
use brandlens_common::dataset::{Channel, UserId};
use serde::Serialize;
use std::collections::HashMap;

/// One row of the most-active-authors table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveAuthor {
    pub id: UserId,
    pub name: String,

    /// Posts authored in the channel
    pub posts: usize,

    /// (likes + forwards + replies) / followers * 100
    pub engagement_rate: f64,

    /// Net-promoter-style loyalty over replies to the author's posts
    pub loyalty: f64,

    pub sentiment: SentimentCounts,
}

#[derive(Default)]
struct Tally<'a> {
    id: UserId,
    name: String,
    posts: usize,
    likes: u64,
    forwards: u64,
    replies: usize,
    texts: Vec<&'a str>,
}

/// The `n` authors with the most posts; ties keep discovery order
pub async fn most_active_authors(
    channel: &Channel,
    aggregator: &SentimentAggregator,
    n: usize,
) -> Vec<ActiveAuthor> {
    let mut tallies: Vec<Tally<'_>> = Vec::new();
    let mut slot: HashMap<UserId, usize> = HashMap::new();

    for (post, author) in channel.authored_posts() {
        let i = *slot.entry(author.id).or_insert_with(|| {
            tallies.push(Tally {
                id: author.id,
                name: author.display_name(),
                ..Tally::default()
            });
            tallies.len() - 1
        });
        let tally = &mut tallies[i];
        tally.posts += 1;
        tally.likes = tally.likes.saturating_add(post.likes());
        tally.forwards = tally.forwards.saturating_add(post.forwards);
        tally.replies = tally.replies.saturating_add(post.reply_count());
        tally
            .texts
            .extend(post.replies.iter().filter_map(|r| r.classifiable_text()));
    }

    tallies.sort_by(|a, b| b.posts.cmp(&a.posts));
    tallies.truncate(n);

    let owned = tallies
        .iter()
        .enumerate()
        .flat_map(|(i, t)| t.texts.iter().map(move |text| (i, *text)));
    let sentiment = aggregator.counts_by_owner(owned, tallies.len()).await;

    tallies
        .into_iter()
        .zip(sentiment)
        .map(|(t, counts)| ActiveAuthor {
            id: t.id,
            name: t.name,
            posts: t.posts,
            engagement_rate: post_engagement_rate(
                t.likes,
                t.replies,
                t.forwards,
                channel.members_count,
            ),
            loyalty: counts.net_promoter_score(),
            sentiment: counts,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{author, channel, keyword_aggregator, post, reaction, reply};

    #[tokio::test]
    async fn test_ranks_by_post_count() {
        let mut first = post(1, Some(author(1, "Ann", "A")), vec![reply(9, "Z", "great")]);
        first.reactions = vec![reaction("like", 8)];
        let posts = vec![
            first,
            post(2, Some(author(2, "Ben", "B")), vec![reply(9, "Z", "awful")]),
            post(3, Some(author(2, "Ben", "B")), vec![reply(9, "Z", "nice"), reply(8, "Y", "hmm")]),
            post(4, Some(author(3, "Cat", "C")), vec![]),
            post(5, None, vec![reply(9, "Z", "bad")]),
        ];
        let authors = most_active_authors(&channel(100, posts), &keyword_aggregator(), 5).await;

        assert_eq!(authors.iter().map(|a| a.id).collect::<Vec<_>>(), vec![2, 1, 3]);
        let ben = &authors[0];
        assert_eq!(ben.posts, 2);
        assert!((ben.engagement_rate - 3.0).abs() < 1e-9);
        // one positive, one negative, one neutral
        assert_eq!(ben.loyalty, 0.0);

        let ann = &authors[1];
        assert!((ann.engagement_rate - 9.0).abs() < 1e-9);
        assert_eq!(ann.loyalty, 100.0);

        assert_eq!(authors[2].sentiment.total(), 0);
    }

    #[tokio::test]
    async fn test_truncates_to_n() {
        let posts = (1..=8)
            .map(|id| post(id, Some(author(id, "P", "")), vec![]))
            .collect();
        let authors = most_active_authors(&channel(0, posts), &keyword_aggregator(), 5).await;
        assert_eq!(authors.len(), 5);
        assert_eq!(authors[0].id, 1);
        assert_eq!(authors[0].engagement_rate, 0.0);
    }

    #[tokio::test]
    async fn test_huge_counters_do_not_overflow() {
        let mut loud = post(1, Some(author(1, "Ann", "A")), vec![reply(9, "Z", "hi")]);
        loud.reactions = vec![reaction("like", u64::MAX)];
        loud.forwards = u64::MAX;
        let mut again = loud.clone();
        again.id = 2;

        let authors =
            most_active_authors(&channel(10, vec![loud, again]), &keyword_aggregator(), 5).await;

        assert_eq!(authors[0].posts, 2);
        assert!(authors[0].engagement_rate.is_finite());
        let expected = u64::MAX as f64 * 10.0;
        assert!((authors[0].engagement_rate - expected).abs() / expected < 1e-9);
    }
}
