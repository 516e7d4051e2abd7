//! Picks the backend for a corpus: the vector store when embeddings are
//! available, otherwise the lexical store at the same anchor.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use coachkb_core::config::{EmbeddingSettings, StoreSettings};
use coachkb_core::error::Result;
use coachkb_core::importer::{collect_import_files, load_file_chunks};
use coachkb_core::paths::StorePaths;
use coachkb_core::traits::{Embedder, KnowledgeStore};
use coachkb_core::types::{Metadata, SearchHit, SourceKind, StoreStats};
use coachkb_embed::require_embedder;
use coachkb_text::LexicalStore;
use coachkb_vector::VectorStore;

/// A store opened by [`StoreSelector::resolve`].
pub enum ResolvedStore {
    Vector(VectorStore),
    Lexical(LexicalStore),
}

impl ResolvedStore {
    pub fn engine(&self) -> SourceKind {
        match self {
            ResolvedStore::Vector(_) => SourceKind::Vector,
            ResolvedStore::Lexical(_) => SourceKind::Lexical,
        }
    }

    fn inner(&self) -> &dyn KnowledgeStore {
        match self {
            ResolvedStore::Vector(s) => s,
            ResolvedStore::Lexical(s) => s,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn KnowledgeStore {
        match self {
            ResolvedStore::Vector(s) => s,
            ResolvedStore::Lexical(s) => s,
        }
    }
}

impl KnowledgeStore for ResolvedStore {
    fn add_texts(&mut self, texts: &[String], metadatas: Option<&[Metadata]>) -> Result<usize> {
        self.inner_mut().add_texts(texts, metadatas)
    }

    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        self.inner().search(query, k)
    }

    fn clear(&mut self) -> Result<()> {
        self.inner_mut().clear()
    }

    fn stats(&self) -> StoreStats {
        self.inner().stats()
    }

    fn import_path(&mut self, path: &Path) -> Result<usize> {
        self.inner_mut().import_path(path)
    }
}

/// Builds the embedder for a vector store from the embedding settings.
pub type EmbedderFactory = Arc<dyn Fn(&EmbeddingSettings) -> Result<Box<dyn Embedder>> + Send + Sync>;

/// Result of importing a list of files through the selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub added: usize,
    pub files: usize,
    /// The backend that received the last file.
    pub engine: SourceKind,
}

/// Caller-owned handle for one corpus anchor.
///
/// Nothing is cached between calls: each operation resolves the backend again,
/// so a credential that appears later is picked up on the next call.
#[derive(Clone)]
pub struct StoreSelector {
    paths: StorePaths,
    embedding: EmbeddingSettings,
    make_embedder: EmbedderFactory,
}

impl fmt::Debug for StoreSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSelector")
            .field("paths", &self.paths)
            .field("embedding", &self.embedding)
            .finish_non_exhaustive()
    }
}

impl StoreSelector {
    pub fn new(anchor: impl Into<PathBuf>, embedding: EmbeddingSettings) -> Self {
        let anchor: PathBuf = anchor.into();
        Self { paths: StorePaths::for_anchor(&anchor), embedding, make_embedder: Arc::new(require_embedder) }
    }

    pub fn from_settings(settings: StoreSettings) -> Self {
        Self::new(settings.anchor, settings.embedding)
    }

    /// Replaces [`require_embedder`] as the way vector stores get an embedder.
    #[must_use]
    pub fn with_embedder_factory(
        mut self,
        factory: impl Fn(&EmbeddingSettings) -> Result<Box<dyn Embedder>> + Send + Sync + 'static,
    ) -> Self {
        self.make_embedder = Arc::new(factory);
        self
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    pub fn open_lexical(&self) -> LexicalStore {
        LexicalStore::open(&self.paths.lexical)
    }

    pub fn open_vector(&self) -> Result<VectorStore> {
        let embedder = (self.make_embedder)(&self.embedding)?;
        VectorStore::open_at(&self.paths, embedder)
    }

    /// Opens the vector store, or the lexical store when embeddings are
    /// unavailable. Other errors are returned.
    pub fn resolve(&self) -> Result<ResolvedStore> {
        match self.open_vector() {
            Ok(store) => {
                debug!(anchor = %self.paths.anchor.display(), "using vector store");
                Ok(ResolvedStore::Vector(store))
            }
            Err(e) if e.is_unavailable() => {
                warn!(anchor = %self.paths.anchor.display(), error = %e, "embeddings unavailable; using lexical store");
                Ok(ResolvedStore::Lexical(self.open_lexical()))
            }
            Err(e) => Err(e),
        }
    }

    /// Imports `files` into one resolved store, calling `on_file` after each.
    ///
    /// If the vector store reports embeddings unavailable partway through, the
    /// failing file and everything after it go to the lexical store; files
    /// already imported stay where they are.
    pub fn import_files(&self, files: &[PathBuf], mut on_file: impl FnMut(&Path)) -> Result<ImportSummary> {
        let mut store = self.resolve()?;
        let mut added = 0usize;
        for file in files {
            added += self.import_file(&mut store, file)?;
            on_file(file);
        }
        info!(anchor = %self.paths.anchor.display(), files = files.len(), added, engine = store.engine().as_str(), "import finished");
        Ok(ImportSummary { added, files: files.len(), engine: store.engine() })
    }

    fn import_file(&self, store: &mut ResolvedStore, file: &Path) -> Result<usize> {
        let Some((texts, metas)) = load_file_chunks(file) else { return Ok(0) };
        match store.add_texts(&texts, Some(&metas)) {
            Err(e) if e.is_unavailable() && store.engine() == SourceKind::Vector => {
                warn!(file = %file.display(), error = %e, "embeddings unavailable; continuing import on lexical store");
                *store = ResolvedStore::Lexical(self.open_lexical());
                store.add_texts(&texts, Some(&metas))
            }
            other => other,
        }
    }

    /// Runs `op` on a freshly resolved store, retrying once on the lexical
    /// store when the vector backend reports embeddings unavailable.
    fn with_fallback<T>(&self, op: impl Fn(&mut dyn KnowledgeStore) -> Result<T>) -> Result<T> {
        let mut store = self.resolve()?;
        match op(store.inner_mut()) {
            Err(e) if e.is_unavailable() && store.engine() == SourceKind::Vector => {
                warn!(anchor = %self.paths.anchor.display(), error = %e, "vector store failed; retrying on lexical store");
                op(&mut self.open_lexical())
            }
            other => other,
        }
    }
}

impl KnowledgeStore for StoreSelector {
    fn add_texts(&mut self, texts: &[String], metadatas: Option<&[Metadata]>) -> Result<usize> {
        self.with_fallback(|store| store.add_texts(texts, metadatas))
    }

    fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        self.with_fallback(|store| store.search(query, k))
    }

    fn clear(&mut self) -> Result<()> {
        self.with_fallback(|store| store.clear())
    }

    fn stats(&self) -> StoreStats {
        match self.resolve() {
            Ok(store) => store.stats(),
            Err(e) => {
                warn!(anchor = %self.paths.anchor.display(), error = %e, "could not open vector store; reporting lexical stats");
                self.open_lexical().stats()
            }
        }
    }

    fn import_path(&mut self, path: &Path) -> Result<usize> {
        let files = collect_import_files(path)?;
        Ok(self.import_files(&files, |_| {})?.added)
    }
}
