//! Domain types shared by the lexical and vector engines.

use serde::{Deserialize, Serialize};

pub type DocId = String;

/// Free-form chunk metadata. Importer-produced chunks always carry `source`.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A unit of text plus metadata destined for indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Chunk {
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self { text: text.into(), metadata }
    }
}

/// Indicates which engine produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Vector,
    Lexical,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Vector => "vector",
            SourceKind::Lexical => "lexical",
        }
    }
}

/// The surface returned by every engine.
///
/// `id` is the stored document id (`d1`, `d2`, ...). `score` is cosine
/// similarity for both engines, so higher is always better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: DocId,
    pub text: String,
    pub metadata: Metadata,
    pub score: f32,
    pub source: SourceKind,
}

/// Summary statistics, tagged by engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "engine", rename_all = "lowercase")]
pub enum StoreStats {
    Lexical {
        docs: usize,
        path: String,
        vocab_size: usize,
    },
    Vector {
        docs: usize,
        path: String,
        meta_path: String,
        dim: usize,
        model: String,
    },
}

impl StoreStats {
    pub fn docs(&self) -> usize {
        match self {
            StoreStats::Lexical { docs, .. } | StoreStats::Vector { docs, .. } => *docs,
        }
    }

    pub fn engine(&self) -> SourceKind {
        match self {
            StoreStats::Lexical { .. } => SourceKind::Lexical,
            StoreStats::Vector { .. } => SourceKind::Vector,
        }
    }
}

/// Builds a `{source: <path>}` metadata map.
pub fn source_metadata(source: &str) -> Metadata {
    let mut meta = Metadata::new();
    meta.insert("source".to_string(), serde_json::Value::String(source.to_string()));
    meta
}
