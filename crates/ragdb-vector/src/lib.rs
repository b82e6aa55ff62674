//! Persistent vector index over chunks, stored in a LanceDB table.
//!
//! Distances are squared L2 (`_distance`); lower is closer.
use arrow_schema::ArrowError;
use thiserror::Error;

pub mod index;
pub mod schema;
pub mod table;

pub use index::{LanceIndex, EMBED_BATCH};

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("embedding dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding failed: {0:#}")]
    Embedding(anyhow::Error),

    #[error("storage error: {0}")]
    Storage(#[from] lancedb::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error(transparent)]
    Record(#[from] ragdb_core::Error),
}

impl IndexError {
    /// A mismatch means the configured model and the persisted index disagree;
    /// retrying cannot succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, IndexError::DimensionMismatch { .. })
    }
}
