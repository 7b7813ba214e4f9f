//! Brandlens influence engine
//!
//! Ranks the participants of a crawled channel by how they interact:
//! - Interaction graph with PageRank and betweenness rankers
//! - Sentiment aggregation over the shared classifier
//! - Influencer, negative post and active author tables
//! - Channel KPIs, regions and sentiment by comment length
//! - Graph export for plotting

pub mod engine;
pub mod export;
pub mod interaction;
pub mod kpi;
pub mod report;
pub mod sentiment;

#[cfg(test)]
mod fixtures;

pub use engine::{InfluenceEngine, InfluencersAnalysis, RankingConfig};
pub use export::GraphExport;
pub use interaction::{InteractionGraph, Ranker, RankerKind, Ranking};
pub use sentiment::{AggregatorLimits, SentimentAggregator, SentimentCounts};
