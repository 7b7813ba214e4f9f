//! Influence engine
//!
//! Entry point for every analysis over a crawled channel. Each call builds the
//! interaction graph once, computes the requested ranking once on the
//! blocking pool, and runs the sentiment work through the shared classifier.

use crate::export::GraphExport;
use crate::interaction::{
    BetweennessScorer, InteractionGraph, PageRankConfig, PageRankScorer, Ranker, RankerKind, Ranking,
};
use crate::kpi::ChannelKpis;
use crate::report::{
    self, ActiveAuthor, BrandRating, BrandWeights, InfluencerTable, LengthBucket, NegativePost,
    RegionStats,
};
use crate::sentiment::{AggregatorLimits, SentimentAggregator};
use brandlens_common::config::{ClassifierConfig, RankingSettings};
use brandlens_common::dataset::Channel;
use brandlens_common::errors::{AppError, Result};
use brandlens_common::metrics;
use brandlens_common::sentiment::Classifier;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Number of regions reported by default
pub const DEFAULT_REGIONS: usize = 20;

/// Engine parameters
#[derive(Debug, Clone)]
pub struct RankingConfig {
    pub pagerank: PageRankConfig,

    /// K for influencer tables when the caller gives none
    pub default_top_k: usize,

    /// N for the negative post ranking
    pub negative_posts: usize,

    /// N for the most active authors table
    pub active_authors: usize,

    /// N for the top emoji list
    pub emoji_top: usize,

    /// Cities in the regions report
    pub regions: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self::from(&RankingSettings::default())
    }
}

impl From<&RankingSettings> for RankingConfig {
    fn from(settings: &RankingSettings) -> Self {
        Self {
            pagerank: PageRankConfig::from(settings),
            default_top_k: settings.default_top_k,
            negative_posts: settings.negative_posts,
            active_authors: settings.active_authors,
            emoji_top: settings.emoji_top,
            regions: DEFAULT_REGIONS,
        }
    }
}

/// The combined influencer analysis of one channel
#[derive(Debug, Clone, Serialize)]
pub struct InfluencersAnalysis {
    pub most_messages: Vec<ActiveAuthor>,
    pub page_rank: InfluencerTable,
    pub bcr_rank: InfluencerTable,
    pub high_negative: Vec<NegativePost>,
}

/// Runs rankings and reports over channels
#[derive(Clone)]
pub struct InfluenceEngine {
    aggregator: SentimentAggregator,
    pagerank: PageRankScorer,
    betweenness: BetweennessScorer,
    config: RankingConfig,
}

impl InfluenceEngine {
    /// Create an engine around the shared classifier
    pub fn new(
        classifier: Arc<dyn Classifier>,
        classifier_config: &ClassifierConfig,
        config: RankingConfig,
    ) -> Self {
        let aggregator =
            SentimentAggregator::new(classifier, AggregatorLimits::from(classifier_config));
        Self::with_aggregator(aggregator, config)
    }

    pub fn with_aggregator(aggregator: SentimentAggregator, config: RankingConfig) -> Self {
        info!(
            model = aggregator.classifier().model_name(),
            damping = config.pagerank.damping,
            default_top_k = config.default_top_k,
            "Influence engine ready"
        );
        Self {
            aggregator,
            pagerank: PageRankScorer::new(config.pagerank.clone()),
            betweenness: BetweennessScorer::new(),
            config,
        }
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    pub fn aggregator(&self) -> &SentimentAggregator {
        &self.aggregator
    }

    fn ranker(&self, kind: RankerKind) -> Box<dyn Ranker> {
        match kind {
            RankerKind::PageRank => Box::new(self.pagerank.clone()),
            RankerKind::Betweenness => Box::new(self.betweenness),
        }
    }

    /// Compute one ranking over a graph on the blocking pool and record its
    /// duration
    pub async fn rank(&self, graph: Arc<InteractionGraph>, kind: RankerKind) -> Result<Ranking> {
        let ranker = self.ranker(kind);
        let (nodes, edges) = (graph.node_count(), graph.edge_count());

        let (ranking, elapsed) = tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let ranking = Ranking::compute(ranker.as_ref(), &graph);
            (ranking, start.elapsed())
        })
        .await
        .map_err(|e| {
            error!(ranker = %kind, nodes, error = %e, "Ranking task failed");
            AppError::Internal {
                message: format!("{} ranking task failed: {}", kind, e),
            }
        })?;

        metrics::record_ranking(elapsed.as_secs_f64(), kind.as_str(), nodes);
        debug!(
            ranker = %kind,
            nodes,
            edges,
            elapsed_ms = elapsed.as_millis() as u64,
            "Ranking computed"
        );
        Ok(ranking)
    }

    /// Influencer table for the top `k` (or the configured default) by `kind`
    #[instrument(skip(self, channel), fields(run_id = %Uuid::new_v4(), ranker = %kind))]
    pub async fn influencers(
        &self,
        channel: &Channel,
        kind: RankerKind,
        k: Option<usize>,
    ) -> Result<InfluencerTable> {
        let graph = Arc::new(InteractionGraph::from_channel(channel));
        let ranking = self.rank(graph.clone(), kind).await?;
        let k = k.unwrap_or(self.config.default_top_k);
        Ok(report::assemble(channel, &graph, &ranking, k, &self.aggregator).await)
    }

    /// Top participants by reference (PageRank)
    pub async fn top_by_reference(
        &self,
        channel: &Channel,
        k: Option<usize>,
    ) -> Result<InfluencerTable> {
        self.influencers(channel, RankerKind::PageRank, k).await
    }

    /// Top participants by bridging (betweenness)
    pub async fn top_by_bridging(
        &self,
        channel: &Channel,
        k: Option<usize>,
    ) -> Result<InfluencerTable> {
        self.influencers(channel, RankerKind::Betweenness, k).await
    }

    #[instrument(skip(self, channel), fields(run_id = %Uuid::new_v4()))]
    pub async fn negative_posts(&self, channel: &Channel, n: Option<usize>) -> Vec<NegativePost> {
        let n = n.unwrap_or(self.config.negative_posts);
        report::rank_negative_posts(channel, &self.aggregator, n).await
    }

    #[instrument(skip(self, channel), fields(run_id = %Uuid::new_v4()))]
    pub async fn active_authors(&self, channel: &Channel, n: Option<usize>) -> Vec<ActiveAuthor> {
        let n = n.unwrap_or(self.config.active_authors);
        report::most_active_authors(channel, &self.aggregator, n).await
    }

    /// Active authors, both influencer tables and negative posts in one run
    ///
    /// The graph is built once and shared by both rankings, which run side by
    /// side; the four reports classify concurrently.
    #[instrument(skip(self, channel), fields(run_id = %Uuid::new_v4()))]
    pub async fn influencers_analysis(
        &self,
        channel: &Channel,
        k: Option<usize>,
    ) -> Result<InfluencersAnalysis> {
        let graph = Arc::new(InteractionGraph::from_channel(channel));
        let (reference, bridging) = tokio::try_join!(
            self.rank(graph.clone(), RankerKind::PageRank),
            self.rank(graph.clone(), RankerKind::Betweenness),
        )?;
        let k = k.unwrap_or(self.config.default_top_k);

        let (most_messages, page_rank, bcr_rank, high_negative) = tokio::join!(
            report::most_active_authors(channel, &self.aggregator, self.config.active_authors),
            report::assemble(channel, &graph, &reference, k, &self.aggregator),
            report::assemble(channel, &graph, &bridging, k, &self.aggregator),
            report::rank_negative_posts(channel, &self.aggregator, self.config.negative_posts),
        );

        Ok(InfluencersAnalysis {
            most_messages,
            page_rank,
            bcr_rank,
            high_negative,
        })
    }

    /// Engagement KPIs over every channel of a network
    #[instrument(skip(self, channels), fields(run_id = %Uuid::new_v4(), channels = channels.len()))]
    pub async fn channel_kpis(&self, channels: &[Channel]) -> ChannelKpis {
        ChannelKpis::compute(channels, self.config.emoji_top, &self.aggregator).await
    }

    /// Weighted brand rating of one channel
    #[instrument(skip(self, channel, weights), fields(run_id = %Uuid::new_v4()))]
    pub async fn brand_rating(&self, channel: &Channel, weights: &BrandWeights) -> BrandRating {
        let scores = report::brand_metrics(channel, &self.aggregator).await;
        let rating = BrandRating::combine(scores, weights);
        debug!(rating = rating.rating, weakness = ?rating.weakness, "Brand rated");
        rating
    }

    #[instrument(skip(self, channels), fields(run_id = %Uuid::new_v4(), channels = channels.len()))]
    pub async fn sentiment_by_length(&self, channels: &[Channel]) -> Vec<LengthBucket> {
        report::sentiment_by_length(channels, &self.aggregator).await
    }

    #[instrument(skip(self, channels), fields(run_id = %Uuid::new_v4(), channels = channels.len()))]
    pub async fn top_regions(&self, channels: &[Channel], limit: Option<usize>) -> Vec<RegionStats> {
        let limit = limit.unwrap_or(self.config.regions);
        report::top_regions(channels, &self.aggregator, limit).await
    }

    /// Plot data for a ranking, highlighting its top `k`
    #[instrument(skip(self, channel), fields(run_id = %Uuid::new_v4(), ranker = %kind))]
    pub async fn graph_export(
        &self,
        channel: &Channel,
        kind: RankerKind,
        k: Option<usize>,
    ) -> Result<GraphExport> {
        let graph = Arc::new(InteractionGraph::from_channel(channel));
        let ranking = self.rank(graph.clone(), kind).await?;
        Ok(GraphExport::build(
            &graph,
            &ranking,
            k.unwrap_or(self.config.default_top_k),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{author, channel, cycle_channel, keyword_aggregator, post, reply};
    use crate::report::BrandMetric;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn engine() -> InfluenceEngine {
        InfluenceEngine::with_aggregator(keyword_aggregator(), RankingConfig::default())
    }

    #[test]
    fn test_config_from_settings() {
        let settings = RankingSettings {
            damping: 0.9,
            default_top_k: 3,
            ..RankingSettings::default()
        };
        let config = RankingConfig::from(&settings);
        assert_eq!(config.pagerank.damping, 0.9);
        assert_eq!(config.default_top_k, 3);
        assert_eq!(config.active_authors, 5);
        assert_eq!(config.regions, DEFAULT_REGIONS);
    }

    #[tokio::test]
    async fn test_reference_and_bridging_tables() {
        let engine = engine();
        let channel = cycle_channel();

        let reference = engine.top_by_reference(&channel, None).await.unwrap();
        assert_eq!(reference.len(), 3);
        assert!(reference.rows().iter().all(|row| row.score == 0.33333));

        let bridging = engine.top_by_bridging(&channel, Some(1)).await.unwrap();
        assert_eq!(bridging.len(), 1);
        assert!(bridging.rows()[0].score > 0.0);
    }

    #[tokio::test]
    async fn test_empty_channel() {
        let engine = engine();
        let empty = channel(0, vec![]);

        assert!(engine.top_by_reference(&empty, None).await.unwrap().is_empty());
        assert!(engine.top_by_bridging(&empty, None).await.unwrap().is_empty());
        assert!(engine.negative_posts(&empty, None).await.is_empty());
        let export = engine.graph_export(&empty, RankerKind::PageRank, None).await.unwrap();
        assert!(export.nodes.is_empty());
    }

    #[tokio::test]
    async fn test_influencers_analysis() {
        let engine = engine();
        let analysis = engine
            .influencers_analysis(&cycle_channel(), Some(2))
            .await
            .unwrap();

        assert_eq!(analysis.most_messages.len(), 3);
        assert_eq!(analysis.page_rank.len(), 2);
        assert_eq!(analysis.bcr_rank.len(), 2);
        assert_eq!(analysis.high_negative.len(), 3);
        // Bob's post got "terrible idea"
        assert_eq!(analysis.high_negative[0].name, "Bob B");

        let json = serde_json::to_value(&analysis).unwrap();
        for key in ["most_messages", "page_rank", "bcr_rank", "high_negative"] {
            assert!(json.get(key).is_some_and(|v| v.is_array()), "{key}");
        }
    }

    #[tokio::test]
    async fn test_channel_reports() {
        let engine = engine();
        let posts = vec![post(
            1,
            Some(author(1, "A", "")),
            vec![reply(2, "B", "great"), reply(3, "C", "awful")],
        )];
        let channels = vec![channel(10, posts)];

        let kpis = engine.channel_kpis(&channels).await;
        // 2 commenters over 10 followers
        assert!((kpis.engagement_rate - 20.0).abs() < 1e-9);
        assert_eq!(kpis.net_promoter_score, 0.0);

        let buckets = engine.sentiment_by_length(&channels).await;
        assert_eq!(buckets[0].comments, 2);

        let regions = engine.top_regions(&channels, None).await;
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].replies, 2);
    }

    #[tokio::test]
    async fn test_graph_export_uses_requested_ranking() {
        let export = engine()
            .graph_export(&cycle_channel(), RankerKind::Betweenness, Some(2))
            .await
            .unwrap();
        assert_eq!(export.kind, RankerKind::Betweenness);
        assert_eq!(export.highlighted().count(), 2);
    }

    /// One author, `n` repliers each answered by the next
    fn chain_channel(n: i64) -> Channel {
        let posts = (1..n)
            .map(|id| post(id, Some(author(id, "P", "")), vec![reply(id + 1, "Q", "hi")]))
            .collect();
        channel(10, posts)
    }

    #[tokio::test]
    async fn test_ranking_leaves_the_runtime_free() {
        let engine = engine();
        let graph = Arc::new(InteractionGraph::from_channel(&chain_channel(400)));

        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = {
            let ticks = ticks.clone();
            tokio::spawn(async move {
                loop {
                    ticks.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                }
            })
        };

        // The test runtime has one thread; the ticker only runs if the
        // ranking yields it
        let ranking = engine.rank(graph, RankerKind::Betweenness).await.unwrap();
        ticker.abort();

        assert_eq!(ranking.scores().len(), 400);
        assert!(ticks.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn test_brand_rating() {
        let engine = engine();
        let mut answered = post(
            1,
            Some(author(1, "A", "")),
            vec![reply(5, "R", "great"), reply(-1, "Shop", "thanks")],
        );
        answered.forwards = 1;
        let unanswered = post(2, Some(author(1, "A", "")), vec![reply(6, "S", "awful")]);
        let mut c = channel(10, vec![answered, unanswered]);
        c.group_name = Some("Shop".into());

        let rating = engine.brand_rating(&c, &BrandWeights::default()).await;
        // 2 of 3 and 1 of 1 commenters over interactions
        assert!((rating.metrics.user_engagement_ratio - (200.0 / 3.0 + 100.0) / 2.0).abs() < 1e-9);
        assert!((rating.metrics.brand_responsiveness - 50.0).abs() < 1e-9);
        // "great" on the first post, "awful" on the second
        assert!((rating.metrics.trending_content_sentiment_ratio - 50.0).abs() < 1e-9);
        assert_eq!(rating.weakness, Some(BrandMetric::BrandResponsiveness));
        assert!(rating.rating > 50.0 && rating.rating < 100.0);
    }
}
