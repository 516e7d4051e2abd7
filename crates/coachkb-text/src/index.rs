use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use coachkb_core::error::Result;
use coachkb_core::paths::ensure_parent_dir;
use coachkb_core::traits::{metadata_at, KnowledgeStore};
use coachkb_core::types::{Metadata, SearchHit, StoreStats};

use crate::tokenize::{term_counts, unique_terms};

pub const ENGINE: &str = "lexical";
pub const SNAPSHOT_VERSION: u64 = 1;

/// Stored lexical chunk with precomputed TF-IDF weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexicalDoc {
	pub id: String,
	#[serde(default)]
	pub text: String,
	#[serde(default)]
	pub metadata: Metadata,
	#[serde(default)]
	pub tfidf: BTreeMap<String, f64>,
	/// L2 norm of `tfidf`; zero for a document without terms.
	#[serde(default)]
	pub length: f64,
}

#[derive(Debug, Default, Deserialize)]
struct Snapshot {
	#[serde(default)]
	meta: Metadata,
	#[serde(default)]
	doc_count: usize,
	#[serde(default)]
	df: BTreeMap<String, u64>,
	#[serde(default)]
	docs: Vec<LexicalDoc>,
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
	meta: &'a Metadata,
	doc_count: usize,
	df: &'a BTreeMap<String, u64>,
	docs: &'a [LexicalDoc],
}

/// TF-IDF store persisted as a single JSON file.
///
/// Every `add_texts` call updates document frequencies and then recomputes the
/// weights of all documents, so each vector always reflects the current corpus.
/// That is O(total tokens) per call, which is fine for hundreds to low thousands
/// of chunks.
pub struct LexicalStore {
	pub(crate) path: PathBuf,
	pub(crate) meta: Metadata,
	pub(crate) docs: Vec<LexicalDoc>,
	pub(crate) df: BTreeMap<String, u64>,
	pub(crate) doc_count: usize,
}

/// Smoothed inverse document frequency; positive whenever `df <= doc_count`.
pub fn idf(doc_count: usize, df: u64) -> f64 {
	let n = doc_count.max(1) as f64;
	((1.0 + n) / (1.0 + df as f64)).ln() + 1.0
}

/// Augmented-TF x IDF weights and their L2 norm. Terms missing from `idf` weigh 1.0.
pub(crate) fn weigh(counts: &BTreeMap<String, u32>, idf: &HashMap<&str, f64>) -> (BTreeMap<String, f64>, f64) {
	let Some(max_tf) = counts.values().copied().max() else { return (BTreeMap::new(), 0.0) };
	let weights: BTreeMap<String, f64> = counts
		.iter()
		.map(|(term, &tf)| {
			let aug_tf = 0.5 + 0.5 * (f64::from(tf) / f64::from(max_tf));
			(term.clone(), aug_tf * idf.get(term.as_str()).copied().unwrap_or(1.0))
		})
		.collect();
	let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
	(weights, norm)
}

fn default_meta() -> Metadata {
	let mut meta = Metadata::new();
	meta.insert("engine".to_string(), Value::from(ENGINE));
	meta.insert("version".to_string(), Value::from(SNAPSHOT_VERSION));
	meta
}

fn load_snapshot(path: &Path) -> Result<Snapshot> {
	let bytes = fs::read(path)?;
	Ok(serde_json::from_slice(&bytes)?)
}

impl LexicalStore {
	/// Opens the store at `path`, loading the snapshot when one exists.
	///
	/// An unreadable snapshot is logged and the store starts empty.
	pub fn open(path: impl Into<PathBuf>) -> Self {
		let path = path.into();
		let mut store = Self { path, meta: default_meta(), docs: Vec::new(), df: BTreeMap::new(), doc_count: 0 };
		if store.path.exists() {
			match load_snapshot(&store.path) {
				Ok(snapshot) => {
					if !snapshot.meta.is_empty() { store.meta = snapshot.meta; }
					store.doc_count = snapshot.doc_count;
					store.df = snapshot.df;
					store.docs = snapshot.docs;
					debug!(path = %store.path.display(), docs = store.doc_count, "loaded lexical snapshot");
				}
				Err(e) => error!(path = %store.path.display(), error = %e, "failed to load lexical store; starting fresh"),
			}
		}
		store
	}

	pub fn path(&self) -> &Path { &self.path }

	pub fn docs(&self) -> &[LexicalDoc] { &self.docs }

	pub fn doc_count(&self) -> usize { self.doc_count }

	pub fn document_frequency(&self, term: &str) -> u64 { self.df.get(term).copied().unwrap_or(0) }

	pub fn vocab_size(&self) -> usize { self.df.len() }

	pub fn add_texts(&mut self, texts: &[String], metadatas: Option<&[Metadata]>) -> Result<usize> {
		for (i, text) in texts.iter().enumerate() {
			let id = format!("d{}", self.doc_count + i + 1);
			for term in unique_terms(text) { *self.df.entry(term).or_insert(0) += 1; }
			self.docs.push(LexicalDoc { id, text: text.clone(), metadata: metadata_at(metadatas, i), tfidf: BTreeMap::new(), length: 0.0 });
		}
		self.doc_count += texts.len();
		self.recompute_tfidf();
		self.save()?;
		debug!(added = texts.len(), total = self.doc_count, "lexical add_texts");
		Ok(texts.len())
	}

	pub fn clear(&mut self) -> Result<()> {
		self.docs.clear();
		self.df.clear();
		self.doc_count = 0;
		self.save()
	}

	pub fn stats(&self) -> StoreStats {
		StoreStats::Lexical { docs: self.doc_count, path: self.path.display().to_string(), vocab_size: self.df.len() }
	}

	/// Current IDF for every known term.
	pub(crate) fn idf_table(&self) -> HashMap<&str, f64> {
		self.df.iter().map(|(term, &df)| (term.as_str(), idf(self.doc_count, df))).collect()
	}

	fn recompute_tfidf(&mut self) {
		let idf = self.idf_table();
		let weighted: Vec<(BTreeMap<String, f64>, f64)> = self.docs.iter().map(|d| weigh(&term_counts(&d.text), &idf)).collect();
		drop(idf);
		for (doc, (tfidf, length)) in self.docs.iter_mut().zip(weighted) {
			doc.tfidf = tfidf;
			doc.length = length;
		}
	}

	fn save(&self) -> Result<()> {
		if let Err(e) = ensure_parent_dir(&self.path) {
			warn!(path = %self.path.display(), error = %e, "could not create store directory");
		}
		let payload = SnapshotRef { meta: &self.meta, doc_count: self.doc_count, df: &self.df, docs: &self.docs };
		fs::write(&self.path, serde_json::to_vec(&payload)?)?;
		Ok(())
	}
}

impl KnowledgeStore for LexicalStore {
	fn add_texts(&mut self, texts: &[String], metadatas: Option<&[Metadata]>) -> Result<usize> { Self::add_texts(self, texts, metadatas) }
	fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> { Ok(Self::search(self, query, k)) }
	fn clear(&mut self) -> Result<()> { Self::clear(self) }
	fn stats(&self) -> StoreStats { Self::stats(self) }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn idf_is_positive_and_decreasing_in_df() {
		for n in [0usize, 1, 2, 10, 1000] {
			for df in 0..=n as u64 {
				assert!(idf(n, df) > 0.0, "idf({n},{df})");
			}
		}
		assert!(idf(10, 1) > idf(10, 5));
		assert!((idf(3, 3) - 1.0).abs() < 1e-12, "a term in every doc weighs exactly 1");
	}

	#[test]
	fn augmented_tf_dampens_repetition() {
		let mut counts = BTreeMap::new();
		counts.insert("rust".to_string(), 4u32);
		counts.insert("go".to_string(), 1u32);
		let (w, norm) = weigh(&counts, &HashMap::new());
		assert!((w["rust"] - 1.0).abs() < 1e-12);
		assert!((w["go"] - 0.625).abs() < 1e-12);
		assert!((norm - (1.0f64 + 0.625 * 0.625).sqrt()).abs() < 1e-12);
	}

	#[test]
	fn empty_document_has_zero_norm() {
		let (w, norm) = weigh(&BTreeMap::new(), &HashMap::new());
		assert!(w.is_empty());
		assert_eq!(norm, 0.0);
	}
}
