use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{chat, health, search, upload};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.settings.server.max_upload_bytes;
    Router::new()
        .route("/health", get(health::health))
        .route("/upload", post(upload::upload))
        .route("/search", get(search::search))
        .route("/chat", post(chat::chat))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
