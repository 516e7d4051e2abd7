//! coachkb-core
//!
//! Shared domain types, the error taxonomy, the store and embedder traits,
//! configuration, corpus path derivation and the chunk importer used by both
//! ranking backends.

pub mod config;
pub mod error;
pub mod importer;
pub mod paths;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{Embedder, KnowledgeStore};
pub use types::{Chunk, Metadata, SearchHit, SourceKind, StoreStats};
