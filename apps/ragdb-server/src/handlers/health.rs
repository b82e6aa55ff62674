use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let indexed_chunks = state.store.count().await.map_err(ApiError::internal)?;
    Ok(Json(json!({
        "status": "ok",
        "indexed_chunks": indexed_chunks
    })))
}
