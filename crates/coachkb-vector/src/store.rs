use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use coachkb_core::error::{Error, Result};
use coachkb_core::paths::{ensure_parent_dir, StorePaths};
use coachkb_core::traits::{metadata_at, Embedder, KnowledgeStore};
use coachkb_core::types::{Metadata, SearchHit, SourceKind, StoreStats};
use coachkb_embed::l2_normalized;

use crate::index::FlatIndex;
use crate::migrate::read_legacy_lexical_json;
use crate::schema::{sidecar_meta, Sidecar, SidecarRef, VectorDoc};

/// Maximum number of texts sent to the embedder in one request.
pub const EMBED_BATCH_SIZE: usize = 64;

/// Embedding-backed store: an exact flat index plus a JSON sidecar holding
/// the documents. `docs[i]` corresponds to row `i` of `index`.
pub struct VectorStore {
    index_path: PathBuf,
    meta_path: PathBuf,
    embedder: Box<dyn Embedder>,
    docs: Vec<VectorDoc>,
    /// Fixed by the first embedding and kept until `clear`.
    dim: Option<usize>,
    index: FlatIndex,
}

impl VectorStore {
    /// Opens the store at `index_path`/`meta_path`.
    ///
    /// When nothing usable is on disk and `legacy_json` names a non-empty
    /// lexical snapshot, its documents are re-embedded into the new store. A
    /// failed migration is returned and leaves no files behind.
    pub fn open(
        index_path: impl Into<PathBuf>,
        meta_path: impl Into<PathBuf>,
        embedder: Box<dyn Embedder>,
        legacy_json: Option<&Path>,
    ) -> Result<Self> {
        let mut store = Self {
            index_path: index_path.into(),
            meta_path: meta_path.into(),
            embedder,
            docs: Vec::new(),
            dim: None,
            index: FlatIndex::new(0),
        };
        if store.index_path.exists() && store.meta_path.exists() {
            match store.load() {
                Ok(()) => {
                    debug!(path = %store.index_path.display(), docs = store.docs.len(), "loaded vector store");
                    return Ok(store);
                }
                Err(e) => {
                    error!(path = %store.index_path.display(), error = %e, "unreadable vector store; starting empty");
                    store.reset();
                }
            }
        }
        if let Some(legacy) = legacy_json.filter(|p| p.is_file()) {
            store.migrate_from(legacy)?;
        }
        Ok(store)
    }

    /// Opens the vector files derived from `paths`, migrating from the anchor.
    pub fn open_at(paths: &StorePaths, embedder: Box<dyn Embedder>) -> Result<Self> {
        Self::open(&paths.index, &paths.meta, embedder, Some(paths.legacy_json()))
    }

    fn load(&mut self) -> Result<()> {
        let sidecar: Sidecar = serde_json::from_slice(&fs::read(&self.meta_path)?)?;
        let index = FlatIndex::read_from(&self.index_path)?;
        if index.len() != sidecar.docs.len() {
            return Err(Error::Operation(format!(
                "index has {} rows but sidecar lists {} docs",
                index.len(),
                sidecar.docs.len()
            )));
        }
        if !index.is_empty() && index.dim() != sidecar.dim {
            return Err(Error::DimensionMismatch { expected: sidecar.dim, actual: index.dim() });
        }
        self.dim = (!index.is_empty()).then_some(index.dim());
        self.docs = sidecar.docs;
        self.index = index;
        Ok(())
    }

    fn migrate_from(&mut self, legacy: &Path) -> Result<()> {
        let (texts, metas) = match read_legacy_lexical_json(legacy) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(path = %legacy.display(), error = %e, "legacy lexical snapshot unreadable; not migrating");
                return Ok(());
            }
        };
        if texts.is_empty() {
            return Ok(());
        }
        info!(path = %legacy.display(), docs = texts.len(), "migrating lexical snapshot into vector store");
        self.add_texts(&texts, Some(&metas))?;
        Ok(())
    }

    fn reset(&mut self) {
        self.docs.clear();
        self.dim = None;
        self.index = FlatIndex::new(0);
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn meta_path(&self) -> &Path {
        &self.meta_path
    }

    pub fn docs(&self) -> &[VectorDoc] {
        &self.docs
    }

    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    pub fn model_id(&self) -> &str {
        self.embedder.model_id()
    }

    /// Embeds `texts` and L2-normalizes every vector, checking count and width.
    fn embed_normalized(&self, texts: &[String], expected_dim: Option<usize>) -> Result<Vec<Vec<f32>>> {
        let vectors = self.embedder.embed_batch(texts)?;
        if vectors.len() != texts.len() {
            return Err(Error::Embedding(format!("expected {} embeddings, got {}", texts.len(), vectors.len())));
        }
        let width = expected_dim.or_else(|| vectors.first().map(Vec::len)).unwrap_or(0);
        if width == 0 {
            return Err(Error::Embedding("embedder returned empty vectors".to_string()));
        }
        vectors
            .into_iter()
            .map(|v| {
                if v.len() != width {
                    return Err(Error::DimensionMismatch { expected: width, actual: v.len() });
                }
                Ok(l2_normalized(v))
            })
            .collect()
    }

    pub fn add_texts(&mut self, texts: &[String], metadatas: Option<&[Metadata]>) -> Result<usize> {
        if texts.is_empty() {
            return Ok(0);
        }
        let start = self.docs.len();
        let start_dim = self.dim;
        if let Err(e) = self.append_batches(texts, metadatas).and_then(|()| self.save()) {
            self.docs.truncate(start);
            self.index.truncate(start);
            self.dim = start_dim;
            if start_dim.is_none() {
                self.index = FlatIndex::new(0);
            }
            return Err(e);
        }
        info!(added = texts.len(), total = self.docs.len(), "vector add_texts");
        Ok(texts.len())
    }

    fn append_batches(&mut self, texts: &[String], metadatas: Option<&[Metadata]>) -> Result<()> {
        for (batch_no, batch) in texts.chunks(EMBED_BATCH_SIZE).enumerate() {
            let vectors = self.embed_normalized(batch, self.dim)?;
            if self.dim.is_none() {
                let width = vectors.first().map(Vec::len).unwrap_or(0);
                self.dim = Some(width);
                self.index = FlatIndex::new(width);
            }
            let offset = batch_no * EMBED_BATCH_SIZE;
            for (i, (text, vector)) in batch.iter().zip(vectors.iter()).enumerate() {
                self.index.add(vector)?;
                let id = format!("d{}", self.docs.len() + 1);
                self.docs.push(VectorDoc { id, text: text.clone(), metadata: metadata_at(metadatas, offset + i) });
            }
            debug!(batch = batch_no, size = batch.len(), "embedded batch");
        }
        Ok(())
    }

    pub fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() || self.docs.is_empty() {
            return Ok(vec![]);
        }
        let mut vectors = self.embed_normalized(&[query.to_string()], self.dim)?;
        let Some(q) = vectors.pop() else { return Ok(vec![]) };
        let hits = self
            .index
            .search(&q, k.max(1))?
            .into_iter()
            .filter_map(|(row, score)| {
                let doc = self.docs.get(row)?;
                Some(SearchHit {
                    id: doc.id.clone(),
                    text: doc.text.clone(),
                    metadata: doc.metadata.clone(),
                    score: score.clamp(-1.0, 1.0),
                    source: SourceKind::Vector,
                })
            })
            .collect();
        Ok(hits)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.reset();
        self.save()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats::Vector {
            docs: self.docs.len(),
            path: self.index_path.display().to_string(),
            meta_path: self.meta_path.display().to_string(),
            dim: self.dim.unwrap_or(0),
            model: self.embedder.model_id().to_string(),
        }
    }

    /// Writes the index and then the sidecar.
    pub fn save(&self) -> Result<()> {
        ensure_parent_dir(&self.index_path)?;
        ensure_parent_dir(&self.meta_path)?;
        self.index.write_to(&self.index_path)?;
        let meta = sidecar_meta(self.embedder.model_id());
        let sidecar = SidecarRef { meta: &meta, dim: self.dim.unwrap_or(0), docs: &self.docs };
        fs::write(&self.meta_path, serde_json::to_vec(&sidecar)?)?;
        Ok(())
    }
}

impl KnowledgeStore for VectorStore {
    fn add_texts(&mut self, texts: &[String], metadatas: Option<&[Metadata]>) -> Result<usize> {
        VectorStore::add_texts(self, texts, metadatas)
    }

    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        VectorStore::search(self, query, k)
    }

    fn clear(&mut self) -> Result<()> {
        VectorStore::clear(self)
    }

    fn stats(&self) -> StoreStats {
        VectorStore::stats(self)
    }
}
