//! Crawl dataset schema
//!
//! The crawler stores one JSON blob per crawling run. It is parsed once into
//! these types; everything downstream works with plain fields and never
//! probes for missing keys.

use crate::errors::{AppError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Participant identity as assigned by the source network
pub type UserId = i64;

/// Date format used by the crawler for channel windows
pub const WINDOW_DATE_FORMAT: &str = "%d/%m/%Y";

/// Social network a channel was crawled from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Vk,
    Tg,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Vk => f.write_str("vk"),
            Network::Tg => f.write_str("tg"),
        }
    }
}

impl FromStr for Network {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "vk" => Ok(Network::Vk),
            "tg" | "telegram" => Ok(Network::Tg),
            other => Err(AppError::Validation {
                message: format!("unknown network '{}', expected vk or tg", other),
                field: Some("network".to_string()),
            }),
        }
    }
}

/// One crawling run: channels grouped by network
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlCase {
    #[serde(default, deserialize_with = "null_as_default")]
    pub vk: Vec<Channel>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub tg: Vec<Channel>,
}

impl CrawlCase {
    /// Parse a crawl blob
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| AppError::InvalidFormat {
            message: format!("crawl case does not match schema: {}", e),
        })
    }

    /// Channels for a network
    pub fn channels(&self, network: Network) -> &[Channel] {
        match network {
            Network::Vk => &self.vk,
            Network::Tg => &self.tg,
        }
    }

    /// Select one channel snapshot
    pub fn channel(&self, network: Network, index: usize) -> Result<&Channel> {
        self.channels(network)
            .get(index)
            .ok_or_else(|| AppError::ChannelNotFound {
                network: network.to_string(),
                index,
            })
    }
}

/// A brand channel (community) snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    /// Follower count of the community at crawl time
    #[serde(default, deserialize_with = "null_as_default")]
    pub members_count: u64,

    /// Crawl window start (dd/mm/YYYY)
    #[serde(default)]
    pub from: Option<String>,

    /// Crawl window end (dd/mm/YYYY)
    #[serde(default)]
    pub to: Option<String>,

    /// Community name as shown on the network
    #[serde(default)]
    pub group_name: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub posts: Vec<Post>,
}

impl Channel {
    /// Number of days in the crawl window, if both ends parse
    pub fn window_days(&self) -> Option<i64> {
        let start = NaiveDate::parse_from_str(self.from.as_deref()?, WINDOW_DATE_FORMAT).ok()?;
        let end = NaiveDate::parse_from_str(self.to.as_deref()?, WINDOW_DATE_FORMAT).ok()?;
        Some((end - start).num_days())
    }

    /// Posts whose author is known
    pub fn authored_posts(&self) -> impl Iterator<Item = (&Post, &Author)> {
        self.posts
            .iter()
            .filter_map(|post| post.from.as_ref().map(|author| (post, author)))
    }

    /// Every reply in the channel, in post then reply order
    pub fn replies(&self) -> impl Iterator<Item = &Reply> {
        self.posts.iter().flat_map(|post| post.replies.iter())
    }
}

/// Post author
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: UserId,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,

    #[serde(default)]
    pub is_member: Option<bool>,
}

impl Author {
    pub fn display_name(&self) -> String {
        display_name(self.id, self.first_name.as_deref(), self.last_name.as_deref())
    }
}

/// Reaction counter attached to a post or reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    #[serde(default)]
    pub emoji: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub count: u64,
}

/// A post in a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,

    /// Author; absent for deleted or unknown senders
    #[serde(default)]
    pub from: Option<Author>,

    /// Unix timestamp
    #[serde(default)]
    pub date: Option<i64>,

    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub views: Option<u64>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub forwards: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub reactions: Vec<Reaction>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub replies: Vec<Reply>,
}

impl Post {
    /// Like counter: the first reaction slot, 0 when there are no reactions
    pub fn likes(&self) -> u64 {
        self.reactions.first().map(|r| r.count).unwrap_or(0)
    }

    /// Sum over every reaction counter, saturating
    pub fn total_reactions(&self) -> u64 {
        self.reactions.iter().fold(0, |sum, r| sum.saturating_add(r.count))
    }

    pub fn reply_count(&self) -> usize {
        self.replies.len()
    }
}

/// A reply (comment) to a post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub sender_id: UserId,

    #[serde(default)]
    pub sender_name: Option<String>,

    #[serde(default)]
    pub last_name: Option<String>,

    #[serde(default)]
    pub text: Option<String>,

    #[serde(default)]
    pub city: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub reactions: Vec<Reaction>,
}

impl Reply {
    pub fn display_name(&self) -> String {
        display_name(
            self.sender_id,
            self.sender_name.as_deref(),
            self.last_name.as_deref(),
        )
    }

    /// Text worth classifying: present and not blank
    pub fn classifiable_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Join first and last name; falls back to `id<ID>` when both are blank
pub fn display_name(id: UserId, first: Option<&str>, last: Option<&str>) -> String {
    let parts: Vec<&str> = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if parts.is_empty() {
        format!("id{}", id)
    } else {
        parts.join(" ")
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
