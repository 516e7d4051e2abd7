use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::importer::{collect_import_files, load_file_chunks};
use crate::types::{Metadata, SearchHit, StoreStats};

/// Produces embedding vectors for a batch of texts.
///
/// Implementations return one vector per input, in order. Vectors need not be
/// normalized; the vector store normalizes them.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model behind this embedder.
    fn model_id(&self) -> &str;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// The uniform interface both ranking backends expose to callers.
pub trait KnowledgeStore: Send {
    /// Appends texts with optional parallel metadata and returns the number added.
    ///
    /// Missing metadata entries default to an empty map; extra entries are ignored.
    fn add_texts(&mut self, texts: &[String], metadatas: Option<&[Metadata]>) -> Result<usize>;

    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>>;

    fn clear(&mut self) -> Result<()>;

    fn stats(&self) -> StoreStats;

    /// Imports every supported file under `path`, one `add_texts` call per file.
    fn import_path(&mut self, path: &Path) -> Result<usize> {
        let files = collect_import_files(path)?;
        info!(root = %path.display(), files = files.len(), "importing");
        let mut total = 0usize;
        for file in files {
            if let Some((texts, metas)) = load_file_chunks(&file) {
                total += self.add_texts(&texts, Some(&metas))?;
            }
        }
        Ok(total)
    }
}

/// Returns the metadata for item `i`, defaulting to an empty map.
pub fn metadata_at(metadatas: Option<&[Metadata]>, i: usize) -> Metadata {
    metadatas.and_then(|m| m.get(i)).cloned().unwrap_or_default()
}
