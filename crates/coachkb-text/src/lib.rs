//! coachkb-text
//!
//! File-backed lexical store: TF-IDF weights with augmented term frequency,
//! ranked by sparse cosine similarity. No external index engine; the whole
//! corpus lives in one JSON snapshot.

pub mod tokenize;
pub mod index;
pub mod search;

pub use index::{LexicalDoc, LexicalStore};
pub use search::QueryVector;
