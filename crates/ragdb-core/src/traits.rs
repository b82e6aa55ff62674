use async_trait::async_trait;

use crate::types::{Chunk, SearchHit};

/// Text to fixed-dimensionality vector. Implementations must return vectors of
/// `dim()` length for every input.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Persistent similarity index over chunks.
///
/// `upsert` is append-only: the same `chunk_id` upserted twice yields two
/// entries. `search` orders hits by ascending distance. Backends keep their
/// own error types and surface them through `anyhow` so callers can downcast.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, chunks: &[Chunk]) -> anyhow::Result<()>;
    async fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<SearchHit>>;
    async fn count(&self) -> anyhow::Result<usize>;
}
