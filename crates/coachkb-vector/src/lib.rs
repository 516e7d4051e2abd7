//! Embedding-backed knowledge store: an exact flat inner-product index over
//! L2-normalized vectors plus a JSON sidecar with the documents.

pub mod index;
pub mod migrate;
pub mod schema;
pub mod store;

pub use index::FlatIndex;
pub use schema::VectorDoc;
pub use store::{VectorStore, EMBED_BATCH_SIZE};
