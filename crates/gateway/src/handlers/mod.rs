//! API handlers module

pub mod brand;
pub mod graph;
pub mod health;
pub mod influencers;
pub mod posts;
pub mod reports;

use crate::AppState;
use brandlens_common::dataset::{CrawlCase, Network};
use brandlens_common::errors::{AppError, Result};
use serde::Deserialize;
use validator::Validate;

/// Body shared by every analysis endpoint
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    /// Key of the crawl blob in the dataset store
    #[validate(length(min = 1, max = 256))]
    pub crawling_id: String,

    /// Caller's own group reference, echoed into logs only
    pub group_id: Option<String>,

    #[serde(default)]
    pub network: Network,

    /// Channel index within the network
    #[serde(default)]
    pub channel: usize,

    #[validate(range(min = 1, max = 100))]
    pub top_k: Option<usize>,
}

impl AnalysisRequest {
    pub fn validated(self) -> Result<Self> {
        self.validate().map_err(|e| AppError::Validation {
            message: e.to_string(),
            field: e.field_errors().keys().next().map(|f| f.to_string()),
        })?;
        Ok(self)
    }
}

/// Validate the request and fetch its crawl case
pub async fn load_case(state: &AppState, request: AnalysisRequest) -> Result<(AnalysisRequest, CrawlCase)> {
    let request = request.validated()?;
    let case = state.store.get(&request.crawling_id).await?;

    tracing::debug!(
        crawling_id = %request.crawling_id,
        group_id = request.group_id.as_deref().unwrap_or(""),
        network = %request.network,
        channel = request.channel,
        "Crawl case loaded"
    );
    Ok((request, case))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(top_k: Option<usize>) -> AnalysisRequest {
        AnalysisRequest {
            crawling_id: "crawl-1".to_string(),
            group_id: None,
            network: Network::Vk,
            channel: 0,
            top_k,
        }
    }

    #[test]
    fn test_camel_case_body() {
        let request: AnalysisRequest = serde_json::from_str(
            r#"{"crawlingId": "abc", "groupId": "g1", "network": "tg", "topK": 5}"#,
        )
        .unwrap();
        assert_eq!(request.crawling_id, "abc");
        assert_eq!(request.network, Network::Tg);
        assert_eq!(request.channel, 0);
        assert_eq!(request.top_k, Some(5));
    }

    #[test]
    fn test_top_k_bounds() {
        assert!(request(Some(1)).validated().is_ok());
        assert!(request(Some(100)).validated().is_ok());
        assert!(request(None).validated().is_ok());

        let err = request(Some(0)).validated().unwrap_err();
        assert!(matches!(err, AppError::Validation { field: Some(ref f), .. } if f == "top_k"));
        assert!(request(Some(101)).validated().is_err());
    }

    #[test]
    fn test_empty_crawling_id_rejected() {
        let mut r = request(None);
        r.crawling_id = String::new();
        assert!(r.validated().is_err());
    }
}
