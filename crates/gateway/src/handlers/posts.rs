//! Post ranking handlers

use axum::{extract::State, Json};
use brandlens_common::errors::Result;
use brandlens_influence::report::NegativePost;

use super::{load_case, AnalysisRequest};
use crate::AppState;

/// Posts with the highest share of negative replies
pub async fn negative(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<Vec<NegativePost>>> {
    let (request, case) = load_case(&state, request).await?;
    let channel = case.channel(request.network, request.channel)?;

    let posts = state.engine.negative_posts(channel, request.top_k).await;
    tracing::info!(
        crawling_id = %request.crawling_id,
        posts = posts.len(),
        "Negative posts ranked"
    );
    Ok(Json(posts))
}
