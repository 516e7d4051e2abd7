use std::hash::{Hash, Hasher};

use tracing::info;
use twox_hash::XxHash64;

use coachkb_core::config::EmbeddingSettings;
use coachkb_core::error::{Error, Result};
use coachkb_core::traits::Embedder;

pub mod normalize;
pub mod openai;

pub use normalize::{dot, l2_normalize, l2_normalized};
pub use openai::OpenAiEmbedder;

pub const FAKE_DIM: usize = 256;

/// Deterministic bag-of-tokens embedder for offline runs and tests.
///
/// Each lowercase alphanumeric token is hashed into one of `dim` buckets, so
/// texts sharing words land close together. Output is L2-normalized.
pub struct FakeEmbedder { dim: usize, id: String }

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim, id: format!("fake:xxh64:d{dim}") } }

    pub fn dim(&self) -> usize { self.dim }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let lowered = text.to_lowercase();
        let tokens = lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty());
        for (i, token) in tokens.enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += 0.5 + val + (i as f32 % 3.0) * 0.01;
        }
        l2_normalized(v)
    }
}

impl Default for FakeEmbedder {
    fn default() -> Self { Self::new(FAKE_DIM) }
}

impl Embedder for FakeEmbedder {
    fn model_id(&self) -> &str { &self.id }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Picks the embedder described by `settings`.
///
/// With fake embeddings enabled this is a [`FakeEmbedder`]; otherwise an
/// [`OpenAiEmbedder`], which may be unconfigured when no key is set.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    if settings.use_fake {
        info!("using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::default()));
    }
    Ok(Box::new(OpenAiEmbedder::from_settings(settings)?))
}

/// Like [`get_default_embedder`] but fails with [`Error::Unavailable`] when no
/// credential is configured.
pub fn require_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    if !settings.use_fake && !settings.has_credential() {
        return Err(Error::Unavailable("OpenAI client not configured for embeddings".to_string()));
    }
    get_default_embedder(settings)
}
