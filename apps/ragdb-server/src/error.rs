use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use ragdb_core::error::describe_extension;
use ragdb_vector::IndexError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unsupported format: {}", describe_extension(.0))]
    UnsupportedFormat(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("ingestion failed: {0}")]
    Ingestion(String),
    #[error("indexing failed: {0}")]
    Indexing(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }

    /// Index failures arrive through the store trait as `anyhow`; fatal ones
    /// are logged at error level since retrying cannot help.
    pub fn indexing(err: anyhow::Error) -> Self {
        match err.downcast_ref::<IndexError>() {
            Some(index_err) if index_err.is_fatal() => {
                tracing::error!(error = %index_err, "fatal index error");
            }
            _ => tracing::error!("indexing failed: {err:#}"),
        }
        ApiError::Indexing(format!("{err:#}"))
    }

    fn phase(&self) -> Option<&'static str> {
        match self {
            ApiError::Ingestion(_) => Some("ingestion"),
            ApiError::Indexing(_) => Some("indexing"),
            _ => None,
        }
    }
}

impl From<ragdb_core::Error> for ApiError {
    fn from(err: ragdb_core::Error) -> Self {
        match err {
            ragdb_core::Error::UnsupportedFormat { extension } => ApiError::UnsupportedFormat(extension),
            other => {
                tracing::error!(error = %other, "ingestion failed");
                ApiError::Ingestion(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ApiError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Ingestion(_) | ApiError::Indexing(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({ "error": self.to_string(), "phase": self.phase() }));
        (status, body).into_response()
    }
}
