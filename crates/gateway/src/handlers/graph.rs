//! Graph export handler

use axum::{
    extract::{Path, State},
    Json,
};
use brandlens_common::errors::Result;
use brandlens_influence::{GraphExport, RankerKind};

use super::{load_case, AnalysisRequest};
use crate::AppState;

/// Nodes and edges of a ranking, top K highlighted
pub async fn export(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Json<GraphExport>> {
    let kind: RankerKind = kind.parse()?;
    let (request, case) = load_case(&state, request).await?;
    let channel = case.channel(request.network, request.channel)?;

    let export = state.engine.graph_export(channel, kind, request.top_k).await?;
    Ok(Json(export))
}
