//! Configuration management for Brandlens services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Redis configuration (dataset lookup)
    #[serde(default)]
    pub redis: RedisConfig,

    /// Sentiment classifier configuration
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Ranking parameters
    #[serde(default)]
    pub ranking: RankingSettings,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shutdown timeout in seconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    /// Redis URL
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Key prefix; empty means crawl blobs live under the bare crawling id
    #[serde(default)]
    pub key_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClassifierConfig {
    /// Classifier provider: http, keyword
    #[serde(default = "default_classifier_provider")]
    pub provider: String,

    /// Base URL of the classification service
    #[serde(default = "default_classifier_api_base")]
    pub api_base: String,

    /// Optional bearer token
    pub api_key: Option<String>,

    /// Model to request
    #[serde(default = "default_classifier_model")]
    pub model: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_classifier_timeout")]
    pub timeout_secs: u64,

    /// Maximum attempts per request
    #[serde(default = "default_classifier_retries")]
    pub max_retries: u32,

    /// Texts per classification request
    #[serde(default = "default_classifier_batch_size")]
    pub batch_size: usize,

    /// Concurrent classification requests per run
    #[serde(default = "default_classifier_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RankingSettings {
    /// PageRank damping factor
    #[serde(default = "default_damping")]
    pub damping: f64,

    /// PageRank iteration cap
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// PageRank L1 convergence tolerance
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Default K for influencer tables
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Default N for the negative post ranking
    #[serde(default = "default_negative_posts")]
    pub negative_posts: usize,

    /// Default N for the most active authors table
    #[serde(default = "default_active_authors")]
    pub active_authors: usize,

    /// Default N for the top emoji report
    #[serde(default = "default_emoji_top")]
    pub emoji_top: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error) or a full EnvFilter directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Requests per second
    #[serde(default = "default_rate_limit")]
    pub requests_per_second: u32,

    /// Burst capacity
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5003 }
fn default_request_timeout() -> u64 { 120 }
fn default_shutdown_timeout() -> u64 { 30 }
fn default_redis_url() -> String { "redis://localhost:6379".to_string() }
fn default_classifier_provider() -> String { "http".to_string() }
fn default_classifier_api_base() -> String { "http://localhost:8501".to_string() }
fn default_classifier_model() -> String { crate::DEFAULT_SENTIMENT_MODEL.to_string() }
fn default_classifier_timeout() -> u64 { 10 }
fn default_classifier_retries() -> u32 { 3 }
fn default_classifier_batch_size() -> usize { 32 }
fn default_classifier_concurrency() -> usize { 4 }
fn default_damping() -> f64 { 0.85 }
fn default_max_iterations() -> usize { 100 }
fn default_tolerance() -> f64 { 1e-6 }
fn default_top_k() -> usize { 10 }
fn default_negative_posts() -> usize { 10 }
fn default_active_authors() -> usize { 5 }
fn default_emoji_top() -> usize { 5 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "brandlens".to_string() }
fn default_rate_limit() -> u32 { 20 }
fn default_burst() -> u32 { 40 }
fn default_enabled() -> bool { true }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: String::new(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: default_classifier_provider(),
            api_base: default_classifier_api_base(),
            api_key: None,
            model: default_classifier_model(),
            timeout_secs: default_classifier_timeout(),
            max_retries: default_classifier_retries(),
            batch_size: default_classifier_batch_size(),
            concurrency: default_classifier_concurrency(),
        }
    }
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            damping: default_damping(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            default_top_k: default_top_k(),
            negative_posts: default_negative_posts(),
            active_authors: default_active_authors(),
            emoji_top: default_emoji_top(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rate_limit(),
            burst: default_burst(),
            enabled: default_enabled(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            redis: RedisConfig::default(),
            classifier: ClassifierConfig::default(),
            ranking: RankingSettings::default(),
            observability: ObservabilityConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__SERVER__PORT=8081
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific file, still honoring `APP__` overrides
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }
}
