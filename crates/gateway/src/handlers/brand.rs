//! Brand rating handler

use axum::{extract::State, Json};
use brandlens_common::errors::{AppError, Result};
use brandlens_influence::report::{BrandRating, BrandWeights};
use serde::Deserialize;
use validator::Validate;

use super::{load_case, AnalysisRequest};
use crate::AppState;

/// Analysis body plus optional weights
#[derive(Debug, Deserialize, Validate)]
pub struct BrandRatingRequest {
    #[serde(flatten)]
    pub analysis: AnalysisRequest,

    /// User engagement, responsiveness and trending sentiment weights, in
    /// that order; equal when absent
    #[validate(length(equal = 3))]
    pub weights: Option<Vec<f64>>,
}

impl BrandRatingRequest {
    /// Check the weights and turn them into `BrandWeights`
    pub fn weights(&self) -> Result<BrandWeights> {
        let invalid = |message: String| AppError::Validation {
            message,
            field: Some("weights".to_string()),
        };

        self.validate().map_err(|e| invalid(e.to_string()))?;
        let Some(weights) = self.weights.as_deref() else {
            return Ok(BrandWeights::default());
        };
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(invalid("weights must be finite and non-negative".to_string()));
        }
        match weights {
            &[engagement, responsiveness, trending] => {
                Ok(BrandWeights::from([engagement, responsiveness, trending]))
            }
            _ => Err(invalid(format!("expected 3 weights, got {}", weights.len()))),
        }
    }
}

/// Weighted brand rating and its weakest score
pub async fn rating(
    State(state): State<AppState>,
    Json(request): Json<BrandRatingRequest>,
) -> Result<Json<BrandRating>> {
    let weights = request.weights()?;
    let (analysis, case) = load_case(&state, request.analysis).await?;
    let channel = case.channel(analysis.network, analysis.channel)?;

    let rating = state.engine.brand_rating(channel, &weights).await;
    tracing::info!(
        crawling_id = %analysis.crawling_id,
        rating = rating.rating,
        weakness = ?rating.weakness,
        "Brand rating built"
    );
    Ok(Json(rating))
}
