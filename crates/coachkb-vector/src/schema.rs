//! JSON sidecar stored next to the flat index.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use coachkb_core::types::Metadata;

pub const ENGINE: &str = "vector";
pub const SIDECAR_VERSION: u64 = 1;

/// A stored document; `docs[i]` owns row `i` of the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorDoc {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Sidecar {
    #[serde(default)]
    pub dim: usize,
    #[serde(default)]
    pub docs: Vec<VectorDoc>,
}

#[derive(Serialize)]
pub(crate) struct SidecarRef<'a> {
    pub meta: &'a Metadata,
    pub dim: usize,
    pub docs: &'a [VectorDoc],
}

pub fn sidecar_meta(embedding_model: &str) -> Metadata {
    let mut meta = Metadata::new();
    meta.insert("engine".to_string(), Value::from(ENGINE));
    meta.insert("version".to_string(), Value::from(SIDECAR_VERSION));
    meta.insert("embedding_model".to_string(), Value::from(embedding_model));
    meta
}
