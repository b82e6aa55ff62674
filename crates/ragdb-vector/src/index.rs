use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use ragdb_core::traits::{Embedder, VectorStore};
use ragdb_core::types::{Chunk, SearchHit};

use crate::schema::{batch_to_hits, build_chunk_schema, chunks_to_batch, vector_dim};
use crate::table::{create_table, open_db, open_table, table_exists};
use crate::IndexError;

/// Text embedded once at creation to learn the vector width.
const PROBE_TEXT: &str = "test";

/// Chunks handed to the embedder per call during `upsert`. Every batch of one
/// upsert still lands in a single table version.
pub const EMBED_BATCH: usize = 64;

/// Chunk index backed by one LanceDB table.
///
/// Writers are serialized by `writer`; each `add` commits a new table version
/// atomically, so searches never see a half-written batch and need no lock.
pub struct LanceIndex {
    table: Table,
    embedder: Arc<dyn Embedder>,
    dim: usize,
    writer: Mutex<()>,
}

impl LanceIndex {
    /// Load the table under `dir`, or create it after probing the embedder.
    pub async fn open(dir: &Path, table_name: &str, embedder: Arc<dyn Embedder>) -> Result<Self, IndexError> {
        let conn = open_db(&dir.to_string_lossy()).await?;
        let (table, dim) = if table_exists(&conn, table_name).await? {
            let table = open_table(&conn, table_name).await?;
            let schema = table.schema().await?;
            let dim = vector_dim(&schema).ok_or_else(|| {
                IndexError::Record(ragdb_core::Error::CorruptRecord(format!(
                    "table '{table_name}' has no fixed-size vector column"
                )))
            })?;
            ensure_same_dim(dim, embedder.dim())?;
            info!(table = table_name, dim, rows = table.count_rows(None).await?, "loaded vector index");
            (table, dim)
        } else {
            let probe = embed_blocking(embedder.clone(), vec![PROBE_TEXT.to_string()]).await?;
            let dim = probe.first().map(Vec::len).unwrap_or(0);
            if dim == 0 {
                return Err(IndexError::Embedding(anyhow::anyhow!("probe embedding was empty")));
            }
            ensure_same_dim(dim, embedder.dim())?;
            let table = create_table(&conn, table_name, build_chunk_schema(dim)).await?;
            info!(table = table_name, dim, "created vector index");
            (table, dim)
        };
        Ok(Self { table, embedder, dim, writer: Mutex::new(()) })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embed and append. Same `chunk_id` twice means two entries.
    pub async fn upsert(&self, chunks: &[Chunk]) -> Result<(), IndexError> {
        if chunks.is_empty() {
            return Ok(());
        }
        let _guard = self.writer.lock().await;

        let mut vectors = Vec::with_capacity(chunks.len());
        for slice in chunks.chunks(EMBED_BATCH) {
            let texts: Vec<String> = slice.iter().map(|c| c.text.clone()).collect();
            let embedded = embed_blocking(self.embedder.clone(), texts).await?;
            if embedded.len() != slice.len() {
                return Err(IndexError::Embedding(anyhow::anyhow!(
                    "embedder returned {} vectors for {} chunks",
                    embedded.len(),
                    slice.len()
                )));
            }
            for v in &embedded {
                ensure_same_dim(self.dim, v.len())?;
            }
            vectors.extend(embedded);
            debug!(embedded = vectors.len(), total = chunks.len(), "embedded batch");
        }

        let batch = chunks_to_batch(chunks, &vectors, self.dim)?;
        let schema = batch.schema();
        let reader = arrow_array::RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema);
        self.table.add(Box::new(reader)).execute().await?;
        info!(chunks = chunks.len(), "indexed chunks");
        Ok(())
    }

    /// At most `top_k` hits ordered by ascending distance.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if top_k == 0 || self.count().await? == 0 {
            return Ok(Vec::new());
        }
        let query_vec = embed_blocking(self.embedder.clone(), vec![query.to_string()])
            .await?
            .pop()
            .ok_or_else(|| IndexError::Embedding(anyhow::anyhow!("no query vector")))?;
        ensure_same_dim(self.dim, query_vec.len())?;

        let mut stream = self
            .table
            .vector_search(query_vec)?
            .distance_type(DistanceType::L2)
            .limit(top_k)
            .execute()
            .await?;
        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            hits.extend(batch_to_hits(&batch)?);
        }
        hits.sort_by(|a, b| a.score.total_cmp(&b.score));
        hits.truncate(top_k);
        debug!(top_k, hits = hits.len(), "vector search");
        Ok(hits)
    }

    pub async fn count(&self) -> Result<usize, IndexError> {
        Ok(self.table.count_rows(None).await?)
    }

}

/// A persisted index only accepts vectors of the width it was created with.
fn ensure_same_dim(expected: usize, actual: usize) -> Result<(), IndexError> {
    if actual == expected {
        return Ok(());
    }
    let err = IndexError::DimensionMismatch { expected, actual };
    error!(%err, "embedding model does not match the persisted index");
    Err(err)
}

async fn embed_blocking(embedder: Arc<dyn Embedder>, texts: Vec<String>) -> Result<Vec<Vec<f32>>, IndexError> {
    tokio::task::spawn_blocking(move || embedder.embed_batch(&texts))
        .await
        .map_err(|e| IndexError::Embedding(anyhow::anyhow!("embedding task failed: {e}")))?
        .map_err(IndexError::Embedding)
}

#[async_trait]
impl VectorStore for LanceIndex {
    async fn upsert(&self, chunks: &[Chunk]) -> anyhow::Result<()> {
        Ok(LanceIndex::upsert(self, chunks).await?)
    }

    async fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<SearchHit>> {
        Ok(LanceIndex::search(self, query, top_k).await?)
    }

    async fn count(&self) -> anyhow::Result<usize> {
        Ok(LanceIndex::count(self).await?)
    }
}
