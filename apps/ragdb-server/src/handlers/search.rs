use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use ragdb_core::types::SearchHit;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub top_k: Option<usize>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SearchHit>>, ApiError> {
    let top_k = params.top_k.unwrap_or(state.settings.index.default_top_k);
    if top_k == 0 {
        return Err(ApiError::BadRequest("top_k must be at least 1".into()));
    }
    let hits = state
        .store
        .search(&params.q, top_k)
        .await
        .map_err(|e| ApiError::Internal(format!("{e:#}")))?;
    Ok(Json(hits))
}
