use std::sync::Arc;

use anyhow::Context;

use ragdb_core::{Chunker, IngestPipeline, LoaderRegistry, Settings, VectorStore};
use ragdb_embed::get_default_embedder;
use ragdb_vector::LanceIndex;

use crate::chat::{ChatBackend, EchoChat};

/// Everything a request handler needs, built once at startup.
pub struct AppState {
    pub settings: Settings,
    pub pipeline: IngestPipeline,
    pub store: Arc<dyn VectorStore>,
    pub chat: Arc<dyn ChatBackend>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        pipeline: IngestPipeline,
        store: Arc<dyn VectorStore>,
        chat: Arc<dyn ChatBackend>,
    ) -> Self {
        Self { settings, pipeline, store, chat }
    }

    /// Open the index (probing the embedder when it is new) and wire the
    /// default loaders, chunker and echo chat backend.
    pub async fn initialize(settings: Settings) -> anyhow::Result<Arc<Self>> {
        let pipeline = build_pipeline(&settings)?;
        let index = open_index(&settings).await?;
        let chat = Arc::new(EchoChat::new(&settings.chat));
        Ok(Arc::new(Self::new(settings, pipeline, index, chat)))
    }
}

pub fn build_pipeline(settings: &Settings) -> anyhow::Result<IngestPipeline> {
    let chunker = Chunker::new(settings.chunking).context("invalid chunking settings")?;
    Ok(IngestPipeline::new(LoaderRegistry::with_defaults(), chunker))
}

pub async fn open_index(settings: &Settings) -> anyhow::Result<Arc<LanceIndex>> {
    settings.paths.ensure_dirs().context("creating data directories")?;
    let embedder = get_default_embedder(&settings.embedding, &settings.paths.model_path())?;
    let index_dir = settings.paths.index_path();
    let index = LanceIndex::open(&index_dir, &settings.index.table, embedder)
        .await
        .with_context(|| format!("opening vector index at {}", index_dir.display()))?;
    Ok(Arc::new(index))
}
