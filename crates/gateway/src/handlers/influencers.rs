//! Influencer ranking handlers

use axum::{extract::State, Json};
use brandlens_common::errors::Result;
use brandlens_influence::engine::InfluencersAnalysis;
use brandlens_influence::report::{ActiveAuthor, InfluencerTable};
use brandlens_influence::RankerKind;

use super::{load_case, AnalysisRequest};
use crate::AppState;

/// Top participants by reference (PageRank)
pub async fn reference(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<InfluencerTable>> {
    ranked(state, request, RankerKind::PageRank).await
}

/// Top participants by bridging (betweenness)
pub async fn bridging(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<InfluencerTable>> {
    ranked(state, request, RankerKind::Betweenness).await
}

async fn ranked(state: AppState, request: AnalysisRequest, kind: RankerKind) -> Result<Json<InfluencerTable>> {
    let (request, case) = load_case(&state, request).await?;
    let channel = case.channel(request.network, request.channel)?;

    let table = state.engine.influencers(channel, kind, request.top_k).await?;
    tracing::info!(
        crawling_id = %request.crawling_id,
        ranker = %kind,
        rows = table.len(),
        "Influencer table built"
    );
    Ok(Json(table))
}

/// Authors with the most posts
pub async fn active(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<Vec<ActiveAuthor>>> {
    let (request, case) = load_case(&state, request).await?;
    let channel = case.channel(request.network, request.channel)?;

    Ok(Json(state.engine.active_authors(channel, request.top_k).await))
}

/// Active authors, both rankings and negative posts in one response
pub async fn analysis(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<InfluencersAnalysis>> {
    let (request, case) = load_case(&state, request).await?;
    let channel = case.channel(request.network, request.channel)?;

    let analysis = state.engine.influencers_analysis(channel, request.top_k).await?;
    tracing::info!(
        crawling_id = %request.crawling_id,
        page_rank = analysis.page_rank.len(),
        bcr_rank = analysis.bcr_rank.len(),
        "Influencers analysis built"
    );
    Ok(Json(analysis))
}
