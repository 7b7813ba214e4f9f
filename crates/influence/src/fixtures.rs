//! Builders and test classifiers shared by the unit tests

use crate::sentiment::{AggregatorLimits, SentimentAggregator};
use async_trait::async_trait;
use brandlens_common::dataset::{Author, Channel, Post, Reaction, Reply, UserId};
use brandlens_common::errors::{AppError, Result};
use brandlens_common::sentiment::{Classification, Classifier, KeywordClassifier};
use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn author(id: UserId, first: &str, last: &str) -> Author {
    Author {
        id,
        first_name: Some(first.to_string()),
        last_name: Some(last.to_string()),
        is_member: Some(true),
    }
}

pub fn reply(sender_id: UserId, name: &str, text: &str) -> Reply {
    Reply {
        sender_id,
        sender_name: Some(name.to_string()),
        last_name: None,
        text: Some(text.to_string()),
        city: None,
        reactions: Vec::new(),
    }
}

pub fn post(id: i64, from: Option<Author>, replies: Vec<Reply>) -> Post {
    Post {
        id,
        from,
        date: None,
        text: Some(format!("post {}", id)),
        views: None,
        forwards: 0,
        reactions: Vec::new(),
        replies,
    }
}

pub fn reaction(emoji: &str, count: u64) -> Reaction {
    Reaction {
        emoji: Some(emoji.to_string()),
        count,
    }
}

pub fn channel(members_count: u64, posts: Vec<Post>) -> Channel {
    Channel {
        members_count,
        from: None,
        to: None,
        group_name: None,
        posts,
    }
}

/// A -> B -> C -> A: each participant authors one post replied to by the next
pub fn cycle_channel() -> Channel {
    channel(
        100,
        vec![
            post(1, Some(author(1, "Alice", "A")), vec![reply(2, "Bob", "great post")]),
            post(2, Some(author(2, "Bob", "B")), vec![reply(3, "Carol", "terrible idea")]),
            post(3, Some(author(3, "Carol", "C")), vec![reply(1, "Alice", "ok")]),
        ],
    )
}

pub fn keyword_aggregator() -> SentimentAggregator {
    SentimentAggregator::new(Arc::new(KeywordClassifier::new()), AggregatorLimits::default())
}

/// Fails any call that includes a text containing the trigger
pub struct FailingClassifier {
    trigger: String,
}

impl FailingClassifier {
    pub fn on(trigger: &str) -> Self {
        Self {
            trigger: trigger.to_string(),
        }
    }

    fn check(&self, text: &str) -> Result<()> {
        if text.contains(&self.trigger) {
            Err(AppError::ClassifierError {
                message: format!("cannot classify '{}'", text),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Classifier for FailingClassifier {
    async fn classify(&self, text: &str) -> Result<Classification> {
        self.check(text)?;
        Ok(KeywordClassifier::label(text))
    }

    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<Classification>> {
        for text in texts {
            self.check(text)?;
        }
        Ok(texts.iter().map(|t| KeywordClassifier::label(t)).collect())
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Hangs on any call that includes a text containing the trigger
pub struct SlowClassifier {
    trigger: String,
}

impl SlowClassifier {
    pub fn on(trigger: &str) -> Self {
        Self {
            trigger: trigger.to_string(),
        }
    }

    async fn stall(&self, text: &str) {
        if text.contains(&self.trigger) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    }
}

#[async_trait]
impl Classifier for SlowClassifier {
    async fn classify(&self, text: &str) -> Result<Classification> {
        self.stall(text).await;
        Ok(KeywordClassifier::label(text))
    }

    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<Classification>> {
        for text in texts {
            self.stall(text).await;
        }
        Ok(texts.iter().map(|t| KeywordClassifier::label(t)).collect())
    }

    fn model_name(&self) -> &str {
        "slow"
    }
}

/// Rejects every batch; single calls sleep and record how many overlap
pub struct GaugedClassifier {
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl GaugedClassifier {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn single_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for GaugedClassifier {
    async fn classify(&self, text: &str) -> Result<Classification> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(KeywordClassifier::label(text))
    }

    async fn classify_batch(&self, _texts: &[String]) -> Result<Vec<Classification>> {
        Err(AppError::ClassifierError {
            message: "batches disabled".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "gauged"
    }
}

/// Metrics recorder that sums every counter by name, ignoring labels
#[derive(Default)]
pub struct CounterTotals {
    counters: Mutex<HashMap<String, Arc<AtomicU64>>>,
}

impl CounterTotals {
    pub fn get(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .unwrap()
            .get(name)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

impl Recorder for CounterTotals {
    fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
        let cell = self
            .counters
            .lock()
            .unwrap()
            .entry(key.name().to_string())
            .or_default()
            .clone();
        Counter::from_arc(cell)
    }

    fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}
