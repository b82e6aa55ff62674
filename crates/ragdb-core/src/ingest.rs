//! Upload ingestion: bytes + filename in, chunks out.
//!
//! The extension is checked against the registry before anything touches the
//! disk. Loaders then read a scoped temp file that is removed on every exit
//! path. Indexing is the caller's job.
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::chunker::Chunker;
use crate::error::Result;
use crate::loaders::LoaderRegistry;
use crate::types::Chunk;

#[derive(Clone)]
pub struct IngestPipeline {
    registry: LoaderRegistry,
    chunker: Chunker,
    staging_dir: Option<PathBuf>,
}

impl IngestPipeline {
    pub fn new(registry: LoaderRegistry, chunker: Chunker) -> Self {
        Self { registry, chunker, staging_dir: None }
    }

    /// Stage uploads under `dir` instead of the system temp directory.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    pub fn registry(&self) -> &LoaderRegistry {
        &self.registry
    }

    pub fn ingest(&self, bytes: &[u8], filename: &str) -> Result<Vec<Chunk>> {
        let extension = extension_of(filename);
        let loader = self.registry.get(&extension)?;

        let suffix = format!(".{extension}");
        let mut builder = tempfile::Builder::new();
        builder.prefix("ragdb-upload-").suffix(&suffix);
        let mut tmp = match &self.staging_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        tmp.write_all(bytes)?;
        tmp.flush()?;
        debug!(filename, path = %tmp.path().display(), bytes = bytes.len(), "staged upload");

        let documents = loader.load_path(tmp.path())?;
        let chunks = self.chunker.split(&documents, filename, &extension);
        info!(filename, documents = documents.len(), chunks = chunks.len(), "ingested");
        Ok(chunks)
    }

    /// Ingest a file already on disk, tagging chunks with `source`.
    pub fn ingest_path(&self, path: &Path, source: &str) -> Result<Vec<Chunk>> {
        let extension = extension_of(source);
        let loader = self.registry.get(&extension)?;
        let documents = loader.load_path(path)?;
        Ok(self.chunker.split(&documents, source, &extension))
    }
}

/// Lower-cased extension without the dot; empty when the name has none.
pub fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_lowercased() {
        assert_eq!(extension_of("Notes.TXT"), "txt");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of("README"), "");
    }
}
