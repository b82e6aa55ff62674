use std::path::Path;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    pub num_chunks_indexed: usize,
    pub first_chunk_id: Option<String>,
}

/// Multipart field `file`: ingest, then index.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .and_then(|name| Path::new(name).file_name())
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("field 'file' has no filename".into()))?;
        let bytes = field.bytes().await.map_err(|e| ApiError::BadRequest(e.to_string()))?;
        upload = Some((filename, bytes));
        break;
    }
    let (filename, bytes) = upload.ok_or_else(|| ApiError::BadRequest("missing multipart field 'file'".into()))?;

    let pipeline = state.pipeline.clone();
    let name = filename.clone();
    let chunks = tokio::task::spawn_blocking(move || pipeline.ingest(&bytes, &name))
        .await
        .map_err(ApiError::internal)??;

    state.store.upsert(&chunks).await.map_err(ApiError::indexing)?;
    tracing::info!(filename = %filename, chunks = chunks.len(), "upload indexed");

    Ok(Json(UploadResponse {
        filename,
        num_chunks_indexed: chunks.len(),
        first_chunk_id: chunks.first().map(|c| c.chunk_id.clone()),
    }))
}
