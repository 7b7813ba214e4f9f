//! Report tables built from a channel
//!
//! - Influencer tables joined from a centrality ranking
//! - Posts ranked by negative reply sentiment
//! - Most active authors
//! - Reply regions and sentiment by comment length
//! - The weighted brand rating

mod active_authors;
mod brand;
mod influencers;
mod length;
mod negative_posts;
mod regions;

pub use active_authors::{most_active_authors, ActiveAuthor};
pub use brand::{
    brand_metrics, brand_responsiveness, is_brand_reply, trending_content_sentiment_ratio,
    user_engagement_ratio, BrandMetric, BrandMetrics, BrandRating, BrandWeights, TRENDING_POSTS,
};
pub use influencers::{assemble, round5, InfluencerProfile, InfluencerTable};
pub use length::{bucket_of, sentiment_by_length, LengthBucket, LENGTH_BUCKETS};
pub use negative_posts::{post_engagement_rate, rank_negative_posts, NegativePost};
pub use regions::{top_regions, RegionStats, UNKNOWN_CITY};
