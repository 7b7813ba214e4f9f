//! Dataset store
//!
//! Crawl results are written to Redis by the crawler, one JSON blob per
//! crawling id. This module only reads them.
//!
//! Provides:
//! - The `DatasetStore` seam used by the engine and the gateway
//! - A Redis-backed store over a multiplexed connection
//! - An in-memory store for tests and the offline CLI

use crate::dataset::CrawlCase;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, warn};

/// Read access to crawl results by crawling id
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Fetch and parse the crawl case stored under `crawling_id`
    async fn get(&self, crawling_id: &str) -> Result<CrawlCase>;

    /// Check that the backing store answers
    async fn ping(&self) -> Result<()>;

    /// Store name for logs and health output
    fn name(&self) -> &'static str;
}

/// Redis-backed dataset store
pub struct RedisStore {
    connection: MultiplexedConnection,
    key_prefix: String,
}

impl RedisStore {
    /// Connect to Redis
    ///
    /// A malformed URL is a configuration error; a server that cannot be
    /// reached is `ServiceUnavailable`.
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self> {
        let client = Client::open(url).map_err(|e| AppError::Configuration {
            message: format!("Invalid Redis URL: {}", e),
        })?;

        let connection = client.get_multiplexed_async_connection().await.map_err(|e| {
            warn!(error = %e, "Failed to connect to Redis");
            AppError::from(e)
        })?;

        Ok(Self {
            connection,
            key_prefix: key_prefix.into(),
        })
    }

    fn key(&self, crawling_id: &str) -> String {
        keys::crawl_case(&self.key_prefix, crawling_id)
    }
}

#[async_trait]
impl DatasetStore for RedisStore {
    async fn get(&self, crawling_id: &str) -> Result<CrawlCase> {
        let full_key = self.key(crawling_id);
        let mut conn = self.connection.clone();

        let value: Option<String> = conn.get(&full_key).await.map_err(|e| {
            warn!(key = %full_key, error = %e, "Dataset read failed");
            AppError::from(e)
        })?;

        crate::metrics::record_dataset_lookup(value.is_some());

        match value {
            Some(json) => {
                debug!(key = %full_key, bytes = json.len(), "Dataset hit");
                CrawlCase::from_json(&json)
            }
            None => {
                debug!(key = %full_key, "Dataset miss");
                Err(AppError::DatasetNotFound {
                    crawling_id: crawling_id.to_string(),
                })
            }
        }
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

/// In-memory dataset store holding raw blobs
#[derive(Default)]
pub struct MemoryStore {
    blobs: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw JSON blob under a crawling id
    pub fn insert(&self, crawling_id: impl Into<String>, raw: impl Into<String>) {
        if let Ok(mut blobs) = self.blobs.write() {
            blobs.insert(crawling_id.into(), raw.into());
        }
    }
}

#[async_trait]
impl DatasetStore for MemoryStore {
    async fn get(&self, crawling_id: &str) -> Result<CrawlCase> {
        let raw = self
            .blobs
            .read()
            .map_err(|_| AppError::Internal {
                message: "memory store lock poisoned".to_string(),
            })?
            .get(crawling_id)
            .cloned();

        crate::metrics::record_dataset_lookup(raw.is_some());

        match raw {
            Some(json) => CrawlCase::from_json(&json),
            None => Err(AppError::DatasetNotFound {
                crawling_id: crawling_id.to_string(),
            }),
        }
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Key builder helpers
pub mod keys {
    /// Key holding a crawl blob
    pub fn crawl_case(prefix: &str, crawling_id: &str) -> String {
        if prefix.is_empty() {
            crawling_id.to_string()
        } else {
            format!("{}:{}", prefix, crawling_id)
        }
    }
}
