//! Sentiment classifier abstraction
//!
//! The model itself runs outside this process. This module provides:
//! - The `Classifier` seam (single text and order-preserving batches)
//! - An HTTP client for the classification service, with retries
//! - A deterministic keyword classifier for tests and offline runs
//! - The process-wide classifier instance
//!
//! # Lifecycle
//!
//! Binaries call [`init_shared`] once during startup, before serving
//! requests, and hand the returned `Arc` to the engine. The instance lives
//! for the rest of the process. Calls are stateless and reentrant, so one
//! instance is shared by every concurrent run.

use crate::config::ClassifierConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use backoff::{future::retry, ExponentialBackoff};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Sentiment of one text unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SentimentLabel {
    #[serde(alias = "positive", alias = "Positive")]
    Positive,
    #[serde(alias = "negative", alias = "Negative")]
    Negative,
    #[serde(alias = "neutral", alias = "Neutral")]
    Neutral,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "POSITIVE",
            SentimentLabel::Negative => "NEGATIVE",
            SentimentLabel::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "POSITIVE" => Ok(SentimentLabel::Positive),
            "NEGATIVE" => Ok(SentimentLabel::Negative),
            "NEUTRAL" => Ok(SentimentLabel::Neutral),
            other => Err(AppError::ClassifierError {
                message: format!("unknown sentiment label '{}'", other),
            }),
        }
    }
}

/// Classifier output for one text
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: SentimentLabel,
    pub score: f32,
}

/// Trait for sentiment classification
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify a single text
    async fn classify(&self, text: &str) -> Result<Classification>;

    /// Classify several texts; output order matches input order
    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<Classification>>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Client for the external classification service
pub struct HttpClassifier {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
    max_retries: u32,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    inputs: &'a [String],
    model: &'a str,
}

/// The service answers either one prediction per input or, when asked for
/// all scores, a list of candidates per input.
#[derive(Deserialize)]
#[serde(untagged)]
enum ClassifyResponse {
    Single(Vec<Classification>),
    Candidates(Vec<Vec<Classification>>),
}

impl ClassifyResponse {
    fn into_predictions(self) -> Result<Vec<Classification>> {
        match self {
            ClassifyResponse::Single(predictions) => Ok(predictions),
            ClassifyResponse::Candidates(candidates) => candidates
                .into_iter()
                .map(|c| {
                    c.into_iter()
                        .max_by(|a, b| a.score.total_cmp(&b.score))
                        .ok_or_else(|| AppError::ClassifierError {
                            message: "empty candidate list".to_string(),
                        })
                })
                .collect(),
        }
    }
}

impl HttpClassifier {
    /// Create a new HTTP classifier
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_retries: config.max_retries.max(1),
            timeout_ms: config.timeout_secs * 1000,
        })
    }

    /// Make request with retry
    async fn request_with_retry(&self, texts: &[String]) -> Result<Vec<Classification>> {
        let policy = ExponentialBackoff {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(2),
            max_elapsed_time: None,
            ..ExponentialBackoff::default()
        };
        let attempts = AtomicU32::new(0);
        let max_retries = self.max_retries;

        retry(policy, || {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            async move {
                match self.make_request(texts).await {
                    Ok(predictions) => Ok(predictions),
                    Err(backoff::Error::Transient { err, .. }) if attempt < max_retries => {
                        tracing::warn!(
                            attempt,
                            max_retries,
                            error = %err,
                            "Classification request failed, retrying"
                        );
                        Err(backoff::Error::transient(err))
                    }
                    Err(backoff::Error::Transient { err, .. })
                    | Err(backoff::Error::Permanent(err)) => Err(backoff::Error::permanent(err)),
                }
            }
        })
        .await
    }

    async fn make_request(
        &self,
        texts: &[String],
    ) -> std::result::Result<Vec<Classification>, backoff::Error<AppError>> {
        let url = format!("{}/classify", self.api_base);
        let request = ClassifyRequest {
            inputs: texts,
            model: &self.model,
        };

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            backoff::Error::transient(if e.is_timeout() {
                AppError::ClassifierTimeout {
                    timeout_ms: self.timeout_ms,
                }
            } else {
                AppError::ClassifierError {
                    message: format!("Request failed: {}", e),
                }
            })
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = AppError::ClassifierError {
                message: format!("API error {}: {}", status, body),
            };
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                backoff::Error::transient(err)
            } else {
                backoff::Error::permanent(err)
            });
        }

        let parsed: ClassifyResponse = response.json().await.map_err(|e| {
            backoff::Error::permanent(AppError::ClassifierError {
                message: format!("Failed to parse response: {}", e),
            })
        })?;

        let predictions = parsed.into_predictions().map_err(backoff::Error::permanent)?;
        if predictions.len() != texts.len() {
            return Err(backoff::Error::permanent(AppError::ClassifierError {
                message: format!(
                    "expected {} predictions, got {}",
                    texts.len(),
                    predictions.len()
                ),
            }));
        }

        Ok(predictions)
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<Classification> {
        let predictions = self.request_with_retry(&[text.to_string()]).await?;
        predictions
            .into_iter()
            .next()
            .ok_or_else(|| AppError::ClassifierError {
                message: "Empty response".to_string(),
            })
    }

    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<Classification>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request_with_retry(texts).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

const POSITIVE_STEMS: &[&str] = &[
    "good", "great", "love", "excellent", "awesome", "thank", "best", "nice", "perfect",
    "delicious", "хорош", "отлич", "супер", "класс", "люблю", "спасибо", "вкусн", "прекрасн",
    "лучш", "молодц",
];

const NEGATIVE_STEMS: &[&str] = &[
    "bad", "terrible", "hate", "awful", "worst", "horrible", "disgust", "disappoint", "плох",
    "ужас", "отврат", "невкусн", "хуж", "разочар", "кошмар", "жаль", "обман",
];

/// Deterministic keyword classifier
///
/// Counts positive and negative word stems; the larger side wins, ties are
/// neutral. Negative stems are checked first so negated forms ("невкусно")
/// are not read as positive.
#[derive(Debug, Default, Clone)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn label(text: &str) -> Classification {
        let lowered = text.to_lowercase();
        let (mut positive, mut negative) = (0u32, 0u32);

        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            if NEGATIVE_STEMS.iter().any(|stem| token.starts_with(stem)) {
                negative += 1;
            } else if POSITIVE_STEMS.iter().any(|stem| token.starts_with(stem)) {
                positive += 1;
            }
        }

        let hits = positive + negative;
        let (label, winner) = match positive.cmp(&negative) {
            std::cmp::Ordering::Greater => (SentimentLabel::Positive, positive),
            std::cmp::Ordering::Less => (SentimentLabel::Negative, negative),
            std::cmp::Ordering::Equal => (SentimentLabel::Neutral, hits),
        };

        let score = if hits == 0 {
            1.0
        } else if label == SentimentLabel::Neutral {
            0.5
        } else {
            winner as f32 / hits as f32
        };

        Classification { label, score }
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> Result<Classification> {
        Ok(Self::label(text))
    }

    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<Classification>> {
        Ok(texts.iter().map(|t| Self::label(t)).collect())
    }

    fn model_name(&self) -> &str {
        "keyword"
    }
}

/// Create a classifier based on configuration
pub fn create_classifier(config: &ClassifierConfig) -> Result<Arc<dyn Classifier>> {
    match config.provider.as_str() {
        "http" => Ok(Arc::new(HttpClassifier::new(config)?)),
        "keyword" => Ok(Arc::new(KeywordClassifier::new())),
        other => {
            tracing::warn!(provider = other, "Unknown classifier provider, using keyword");
            Ok(Arc::new(KeywordClassifier::new()))
        }
    }
}

static SHARED: OnceCell<Arc<dyn Classifier>> = OnceCell::new();

/// Initialize the process-wide classifier, or return the existing one
pub fn init_shared(config: &ClassifierConfig) -> Result<Arc<dyn Classifier>> {
    SHARED
        .get_or_try_init(|| {
            let classifier = create_classifier(config)?;
            tracing::info!(model = classifier.model_name(), "Sentiment classifier initialized");
            Ok(classifier)
        })
        .cloned()
}

/// The process-wide classifier, if initialized
pub fn shared() -> Option<Arc<dyn Classifier>> {
    SHARED.get().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parsing_is_case_insensitive() {
        assert_eq!("positive".parse::<SentimentLabel>().unwrap(), SentimentLabel::Positive);
        assert_eq!(" NEUTRAL ".parse::<SentimentLabel>().unwrap(), SentimentLabel::Neutral);
        assert!("LABEL_3".parse::<SentimentLabel>().is_err());
    }

    #[test]
    fn test_response_shapes() {
        let single: ClassifyResponse =
            serde_json::from_str(r#"[{"label": "NEGATIVE", "score": 0.9}]"#).unwrap();
        let predictions = single.into_predictions().unwrap();
        assert_eq!(predictions[0].label, SentimentLabel::Negative);

        let candidates: ClassifyResponse = serde_json::from_str(
            r#"[[{"label": "neutral", "score": 0.2}, {"label": "positive", "score": 0.7}]]"#,
        )
        .unwrap();
        let predictions = candidates.into_predictions().unwrap();
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0].label, SentimentLabel::Positive);
    }

    #[tokio::test]
    async fn test_keyword_classifier() {
        let classifier = KeywordClassifier::new();
        let positive = classifier.classify("Очень вкусно, спасибо!").await.unwrap();
        assert_eq!(positive.label, SentimentLabel::Positive);

        let negative = classifier.classify("Невкусно и плохо").await.unwrap();
        assert_eq!(negative.label, SentimentLabel::Negative);

        let neutral = classifier.classify("Во сколько открытие?").await.unwrap();
        assert_eq!(neutral.label, SentimentLabel::Neutral);
    }

    #[test]
    fn test_keyword_batch_preserves_order() {
        let classifier = KeywordClassifier::new();
        let texts = vec![
            "terrible service".to_string(),
            "ok".to_string(),
            "great coffee".to_string(),
        ];
        let labels: Vec<_> = tokio_test::block_on(classifier.classify_batch(&texts))
            .unwrap()
            .into_iter()
            .map(|c| c.label)
            .collect();
        assert_eq!(
            labels,
            vec![SentimentLabel::Negative, SentimentLabel::Neutral, SentimentLabel::Positive]
        );
    }

    #[test]
    fn test_shared_instance_is_reused() {
        let config = ClassifierConfig {
            provider: "keyword".to_string(),
            ..ClassifierConfig::default()
        };
        let first = init_shared(&config).unwrap();
        let second = init_shared(&config).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(shared().is_some());
    }

    #[test]
    fn test_http_classifier_builds() {
        let config = ClassifierConfig {
            api_base: "http://classifier:8501/".to_string(),
            ..ClassifierConfig::default()
        };
        let classifier = HttpClassifier::new(&config).unwrap();
        assert_eq!(classifier.api_base, "http://classifier:8501");
        assert_eq!(classifier.model_name(), crate::DEFAULT_SENTIMENT_MODEL);
    }
}
