//! Sentiment aggregation
//!
//! Classifies text units through the shared classifier and reduces the labels
//! to per-entity counts. Batches run concurrently with a bounded number of
//! requests in flight; a failed or timed-out text is logged and left out of
//! the counts without affecting the rest of the run.

use crate::kpi::ratio_percent as percent;
use brandlens_common::config::ClassifierConfig;
use brandlens_common::metrics::{self, ClassifierOutcome};
use brandlens_common::sentiment::{Classification, Classifier, SentimentLabel};
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Label counts for one entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

/// Label shares in percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SentimentShare {
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
}

impl SentimentCounts {
    pub fn add(&mut self, label: SentimentLabel) {
        match label {
            SentimentLabel::Positive => self.positive += 1,
            SentimentLabel::Negative => self.negative += 1,
            SentimentLabel::Neutral => self.neutral += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }

    /// positive / (positive + negative) * 100
    pub fn loyalty_score(&self) -> f64 {
        percent(self.positive as f64, (self.positive + self.negative) as f64)
    }

    /// (positive - negative) / total * 100, neutral included in total
    pub fn net_promoter_score(&self) -> f64 {
        percent(
            self.positive as f64 - self.negative as f64,
            self.total() as f64,
        )
    }

    /// Each label as a percentage of everything classified
    pub fn shares(&self) -> SentimentShare {
        let total = self.total() as f64;
        SentimentShare {
            positive: percent(self.positive as f64, total),
            negative: percent(self.negative as f64, total),
            neutral: percent(self.neutral as f64, total),
        }
    }
}

impl FromIterator<SentimentLabel> for SentimentCounts {
    fn from_iter<I: IntoIterator<Item = SentimentLabel>>(iter: I) -> Self {
        let mut counts = SentimentCounts::default();
        for label in iter {
            counts.add(label);
        }
        counts
    }
}

/// Batch and concurrency limits for classification
#[derive(Debug, Clone)]
pub struct AggregatorLimits {
    pub batch_size: usize,
    pub concurrency: usize,
    pub call_timeout: Duration,
}

impl Default for AggregatorLimits {
    fn default() -> Self {
        Self::from(&ClassifierConfig::default())
    }
}

impl From<&ClassifierConfig> for AggregatorLimits {
    fn from(config: &ClassifierConfig) -> Self {
        // The client retries internally; the outer deadline covers every attempt
        let attempts = u64::from(config.max_retries.max(1));
        Self {
            batch_size: config.batch_size.max(1),
            concurrency: config.concurrency.max(1),
            call_timeout: Duration::from_secs(config.timeout_secs.max(1) * attempts),
        }
    }
}

/// Classifies text units and reduces them to counts
#[derive(Clone)]
pub struct SentimentAggregator {
    classifier: Arc<dyn Classifier>,
    limits: AggregatorLimits,
}

impl SentimentAggregator {
    pub fn new(classifier: Arc<dyn Classifier>, limits: AggregatorLimits) -> Self {
        Self { classifier, limits }
    }

    pub fn classifier(&self) -> &Arc<dyn Classifier> {
        &self.classifier
    }

    /// Classify texts, preserving order; `None` marks a text that failed
    pub fn classify_all<'s>(
        &'s self,
        texts: &'s [String],
    ) -> BoxFuture<'s, Vec<Option<Classification>>> {
        async move {
            if texts.is_empty() {
                return Vec::new();
            }

            let mut batches: Vec<(usize, Vec<Option<Classification>>)> = stream::iter(
                texts.chunks(self.limits.batch_size).enumerate(),
            )
            .map(|(i, chunk)| async move { (i, self.classify_chunk(chunk).await) })
            .buffer_unordered(self.limits.concurrency)
            .collect::<Vec<_>>()
            .boxed()
            .await;

            batches.sort_by_key(|(i, _)| *i);
            let results: Vec<Option<Classification>> =
                batches.into_iter().flat_map(|(_, batch)| batch).collect();

            let skipped = results.iter().filter(|r| r.is_none()).count();
            if skipped > 0 {
                metrics::record_skipped_texts(skipped);
                warn!(skipped, total = texts.len(), "Texts left unclassified");
            }
            debug!(total = texts.len(), skipped, "Classification finished");

            results
        }
        .boxed()
    }

    /// Classify the non-blank texts and count labels
    pub fn counts<'a, I>(&self, texts: I) -> impl Future<Output = SentimentCounts> + Send + '_
    where
        I: IntoIterator<Item = &'a str>,
    {
        let texts = classifiable(texts);
        async move {
            self.classify_all(&texts)
                .await
                .into_iter()
                .flatten()
                .map(|c| c.label)
                .collect()
        }
    }

    /// Classify texts owned by several entities in one pass and count labels
    /// per entity. Entities with no classifiable text get empty counts.
    pub fn counts_by_owner<'a, I>(
        &self,
        owned: I,
        owners: usize,
    ) -> impl Future<Output = Vec<SentimentCounts>> + Send + '_
    where
        I: IntoIterator<Item = (usize, &'a str)>,
    {
        let (owner_of, texts): (Vec<usize>, Vec<String>) = owned
            .into_iter()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(owner, text)| (owner, text.to_string()))
            .unzip();

        async move {
            let mut counts = vec![SentimentCounts::default(); owners];
            for (owner, result) in owner_of.into_iter().zip(self.classify_all(&texts).await) {
                if let (Some(slot), Some(classification)) = (counts.get_mut(owner), result) {
                    slot.add(classification.label);
                }
            }
            counts
        }
    }

    async fn classify_chunk(&self, chunk: &[String]) -> Vec<Option<Classification>> {
        let start = Instant::now();
        let outcome =
            tokio::time::timeout(self.limits.call_timeout, self.classifier.classify_batch(chunk)).await;

        match outcome {
            Ok(Ok(predictions)) if predictions.len() == chunk.len() => {
                metrics::record_classifier(
                    start.elapsed().as_secs_f64(),
                    chunk.len(),
                    ClassifierOutcome::Success,
                );
                predictions.into_iter().map(Some).collect()
            }
            Ok(Ok(predictions)) => {
                warn!(
                    expected = chunk.len(),
                    got = predictions.len(),
                    "Classifier returned a short batch, retrying texts one by one"
                );
                metrics::record_batch_fallback(chunk.len(), ClassifierOutcome::Error);
                self.classify_each(chunk).await
            }
            Ok(Err(e)) => {
                warn!(error = %e, batch = chunk.len(), "Batch classification failed, retrying texts one by one");
                metrics::record_batch_fallback(chunk.len(), ClassifierOutcome::Error);
                self.classify_each(chunk).await
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.limits.call_timeout.as_millis() as u64,
                    batch = chunk.len(),
                    "Batch classification timed out, retrying texts one by one"
                );
                metrics::record_batch_fallback(chunk.len(), ClassifierOutcome::Timeout);
                self.classify_each(chunk).await
            }
        }
    }

    /// Retry a chunk text by text, in order, under the same concurrency bound
    fn classify_each<'s>(&'s self, chunk: &'s [String]) -> BoxFuture<'s, Vec<Option<Classification>>> {
        stream::iter(chunk)
            .map(|text| self.classify_one(text))
            .buffered(self.limits.concurrency)
            .collect()
            .boxed()
    }

    async fn classify_one(&self, text: &str) -> Option<Classification> {
        let start = Instant::now();
        match tokio::time::timeout(self.limits.call_timeout, self.classifier.classify(text)).await {
            Ok(Ok(classification)) => {
                metrics::record_classifier(start.elapsed().as_secs_f64(), 1, ClassifierOutcome::Success);
                Some(classification)
            }
            Ok(Err(e)) => {
                warn!(error = %e, chars = text.chars().count(), "Text classification failed, skipping");
                metrics::record_classifier(0.0, 1, ClassifierOutcome::Error);
                None
            }
            Err(_) => {
                warn!(chars = text.chars().count(), "Text classification timed out, skipping");
                metrics::record_classifier(0.0, 1, ClassifierOutcome::Timeout);
                None
            }
        }
    }
}

/// Keep the non-blank texts
pub fn classifiable<'a, I>(texts: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    texts
        .into_iter()
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
        .collect()
}
