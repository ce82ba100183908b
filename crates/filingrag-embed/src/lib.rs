//! Local embedding backend for the filing-QA pipeline.
//!
//! Wraps a BGE-M3 (XLM-Roberta) encoder through candle, producing masked
//! mean-pooled, L2-normalized vectors. A deterministic hash-based fake is
//! available for tests via `APP_USE_FAKE_EMBEDDINGS=1` so nothing model- or
//! network-shaped runs in CI.

use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;

use filingrag_core::traits::Embedder;

mod device;
mod pool;
mod tokenize;

pub use device::select_device;

/// Texts per forward pass. Bounds peak tensor memory during ingestion.
const FORWARD_BATCH: usize = 16;

pub struct EmbeddingModel {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
}

impl EmbeddingModel {
    pub fn new() -> Result<Self> {
        Self::from_dir(&resolve_model_dir()?)
    }

    pub fn from_dir(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        tracing::info!("loading embedding model from {}", model_dir.display());

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e)
        })?;

        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig =
            serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        let dim = config.hidden_size;

        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: std::collections::HashMap<String, Tensor> =
            weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        tracing::info!("embedding model ready (dim {})", dim);

        Ok(Self { model, tokenizer, device, dim, max_len: 256 })
    }

    fn forward_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let (input_ids, attention_mask) =
            tokenize::tokenize_batch_on_device(&self.tokenizer, texts, self.max_len, &self.device)?;
        let token_type_ids =
            Tensor::zeros((texts.len(), self.max_len), DType::I64, &self.device)?;
        let hidden =
            self.model
                .forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = pool::masked_mean_l2(&hidden, &attention_mask)?;
        let vectors = pooled.to_device(&Device::Cpu)?.to_vec2::<f32>()?;
        Ok(vectors)
    }
}

impl Embedder for EmbeddingModel {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for sub in texts.chunks(FORWARD_BATCH) {
            out.extend(self.forward_batch(sub)?);
        }
        Ok(out)
    }
}

/// Deterministic hashing embedder for tests. Same text always maps to the
/// same unit vector; word overlap produces nonzero similarity.
pub struct FakeEmbedder {
    dim: usize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;

        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            let mut v = vec![0f32; self.dim];
            for (i, token) in text.split_whitespace().enumerate() {
                let mut hasher = XxHash64::with_seed(0);
                token.hash(&mut hasher);
                let h = hasher.finish();
                let idx = (h as usize) % self.dim;
                let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
                v[idx] += val + (i as f32 % 3.0) * 0.01;
            }
            let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
            for x in &mut v {
                *x /= norm;
            }
            vectors.push(v);
        }
        Ok(vectors)
    }
}

/// Builds the embedding backend, honoring `APP_USE_FAKE_EMBEDDINGS`. With
/// `model_dir` unset the directory is resolved from the environment.
pub fn get_embedder(model_dir: Option<&Path>) -> Result<Box<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake {
        tracing::info!("using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(384)));
    }
    match model_dir {
        Some(dir) => Ok(Box::new(EmbeddingModel::from_dir(dir)?)),
        None => Ok(Box::new(EmbeddingModel::new()?)),
    }
}

pub fn get_default_embedder() -> Result<Box<dyn Embedder>> {
    get_embedder(None)
}

fn resolve_model_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("APP_EMBED_MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() {
            return Ok(p);
        }
    }
    if let Ok(dir) = std::env::var("MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() {
            return Ok(p);
        }
    }
    let local = Path::new("models/bge-m3");
    if local.exists() {
        return Ok(local.to_path_buf());
    }
    Err(anyhow!("Could not locate an embedding model directory; set APP_EMBED_MODEL_DIR"))
}
