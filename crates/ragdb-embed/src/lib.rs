use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;
use twox_hash::XxHash64;

use ragdb_core::config::{EmbeddingBackend, EmbeddingSettings};
use ragdb_core::traits::Embedder;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use pool::masked_mean_l2;

/// Sentence-transformer (BERT family, e.g. all-MiniLM-L6-v2) with mean pooling.
///
/// Expects `config.json`, `tokenizer.json` and `model.safetensors` in the
/// model directory.
pub struct MiniLmEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
}

impl MiniLmEmbedder {
    pub fn new(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = device::select_device();
        tracing::info!(dir = %model_dir.display(), "loading sentence-transformer");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("failed to load tokenizer from {}: {e}", tokenizer_path.display()))?;

        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(
            &std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?,
        )?;

        let weights_path = model_dir.join("model.safetensors");
        if !weights_path.exists() {
            return Err(anyhow!("model weights not found at {}", weights_path.display()));
        }
        // SAFETY: the weights file is not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)? };
        let model = BertModel::load(vb, &config)?;

        tracing::info!(dim = config.hidden_size, max_len, "sentence-transformer ready");
        Ok(Self { model, tokenizer, device, dim: config.hidden_size, max_len })
    }

    fn forward(&self, texts: &[String]) -> Result<Tensor> {
        let batch = tokenize::tokenize_batch(&self.tokenizer, texts, self.max_len, &self.device)?;
        let hidden = self
            .model
            .forward(&batch.input_ids, &batch.token_type_ids, Some(&batch.attention_mask))?;
        masked_mean_l2(&hidden, &batch.attention_mask)
    }
}

impl Embedder for MiniLmEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        self.max_len
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let start = Instant::now();
        let vectors: Vec<Vec<f32>> = self.forward(texts)?.to_device(&Device::Cpu)?.to_vec2()?;
        tracing::debug!(batch = texts.len(), ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(vectors)
    }
}

/// Deterministic bag-of-words hashing embedder. Unit-norm vectors; texts
/// sharing words land close together. No model weights required.
pub struct FakeEmbedder {
    dim: usize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in text.split_whitespace() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            v[idx] += 0.5 + ((h >> 32) as u32) as f32 / u32::MAX as f32;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        } else {
            v[0] = 1.0;
        }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        usize::MAX
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// Build the embedder selected by `settings.backend`; local weights are read
/// from `model_dir/<settings.model>`.
pub fn get_default_embedder(settings: &EmbeddingSettings, model_dir: &Path) -> Result<Arc<dyn Embedder>> {
    match settings.backend {
        EmbeddingBackend::Fake => {
            tracing::info!(dim = settings.fake_dim, "using fake embedder");
            Ok(Arc::new(FakeEmbedder::new(settings.fake_dim)))
        }
        EmbeddingBackend::Local => {
            let dir = model_dir.join(&settings.model);
            let model = MiniLmEmbedder::new(&dir, settings.max_len)
                .with_context(|| format!("loading embedding model '{}'", settings.model))?;
            Ok(Arc::new(model))
        }
    }
}
