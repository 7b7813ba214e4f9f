//! Brandlens Common Library
//!
//! Shared code for the Brandlens services including:
//! - Crawl dataset schema (validated at the ingestion boundary)
//! - Dataset store abstraction (Redis-backed lookup by crawling id)
//! - Sentiment classifier abstraction and the process-wide instance
//! - Error types and handling
//! - Configuration management
//! - Tracing setup and metrics

pub mod cache;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod metrics;
pub mod sentiment;
pub mod telemetry;

// Re-export commonly used types
pub use cache::DatasetStore;
pub use config::AppConfig;
pub use dataset::{Channel, CrawlCase, Network, Post, Reply, UserId};
pub use errors::{AppError, Result};
pub use sentiment::{Classifier, SentimentLabel};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default sentiment model served by the classification endpoint
pub const DEFAULT_SENTIMENT_MODEL: &str = "blanchefort/rubert-base-cased-sentiment";
