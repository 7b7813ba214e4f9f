//! Network-wide report handlers
//!
//! These cover every channel of the requested network; `channel` is ignored.

use axum::{extract::State, Json};
use brandlens_common::errors::Result;
use brandlens_influence::kpi::ChannelKpis;
use brandlens_influence::report::{LengthBucket, RegionStats};

use super::{load_case, AnalysisRequest};
use crate::AppState;

/// Engagement KPIs of the post involvement dashboard
pub async fn post_involvement(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<ChannelKpis>> {
    let (request, case) = load_case(&state, request).await?;
    Ok(Json(state.engine.channel_kpis(case.channels(request.network)).await))
}

/// Reply sentiment by comment length
pub async fn sentiment_by_length(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<Vec<LengthBucket>>> {
    let (request, case) = load_case(&state, request).await?;
    Ok(Json(state.engine.sentiment_by_length(case.channels(request.network)).await))
}

/// Replies grouped by sender city
pub async fn regions(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<Vec<RegionStats>>> {
    let (request, case) = load_case(&state, request).await?;
    Ok(Json(
        state
            .engine
            .top_regions(case.channels(request.network), request.top_k)
            .await,
    ))
}
