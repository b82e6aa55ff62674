#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod chunker;
pub mod config;
pub mod error;
pub mod ingest;
pub mod loaders;
pub mod traits;
pub mod types;

pub use chunker::{Chunker, ChunkingConfig};
pub use config::{expand_path, Settings};
pub use error::{Error, Result};
pub use ingest::IngestPipeline;
pub use loaders::{DocumentLoader, LoaderRegistry};
pub use traits::{Embedder, VectorStore};
pub use types::{Chunk, ChunkId, LoadedDocument, Metadata, SearchHit};
