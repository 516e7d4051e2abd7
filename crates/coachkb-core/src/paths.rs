use std::path::{Path, PathBuf};

pub const DEFAULT_ANCHOR: &str = "knowledge_store/work_history.json";
pub const INDEX_EXTENSION: &str = "index";
pub const META_SUFFIX: &str = "_meta.json";

/// On-disk locations derived from one corpus anchor path.
///
/// The lexical snapshot lives at the anchor itself; the vector index and its
/// metadata sidecar sit next to it, named after the anchor's stem. The anchor
/// doubles as the legacy lexical file offered to the vector store for migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub anchor: PathBuf,
    pub lexical: PathBuf,
    pub index: PathBuf,
    pub meta: PathBuf,
}

impl StorePaths {
    #[must_use]
    pub fn for_anchor(anchor: &Path) -> Self {
        let dir = anchor.parent().map(Path::to_path_buf).unwrap_or_default();
        let stem = anchor
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "store".to_string());
        Self {
            anchor: anchor.to_path_buf(),
            lexical: anchor.to_path_buf(),
            index: dir.join(format!("{stem}.{INDEX_EXTENSION}")),
            meta: dir.join(format!("{stem}{META_SUFFIX}")),
        }
    }

    pub fn legacy_json(&self) -> &Path {
        &self.lexical
    }
}

/// Creates the parent directory of `path`.
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
