use std::collections::BTreeMap;

use coachkb_core::types::{SearchHit, SourceKind};

use crate::index::{weigh, LexicalDoc, LexicalStore};
use crate::tokenize::term_counts;

/// TF-IDF representation of a query under the store's current statistics.
#[derive(Debug, Clone, Default)]
pub struct QueryVector {
	pub weights: BTreeMap<String, f64>,
	pub norm: f64,
}

impl QueryVector {
	/// Cosine similarity against a stored document; 0 when either norm is 0.
	pub fn cosine(&self, doc: &LexicalDoc) -> f64 {
		if self.norm == 0.0 || doc.length == 0.0 { return 0.0; }
		let dot: f64 = self.weights.iter().filter_map(|(term, qw)| doc.tfidf.get(term).map(|dw| qw * dw)).sum();
		dot / (self.norm * doc.length)
	}
}

impl LexicalStore {
	/// Weighs `query` against the current IDF table. Never touches `df`.
	pub fn query_vector(&self, query: &str) -> QueryVector {
		let counts = term_counts(query);
		if counts.is_empty() { return QueryVector::default(); }
		let (weights, norm) = weigh(&counts, &self.idf_table());
		QueryVector { weights, norm }
	}

	/// Top-`k` documents with a positive cosine score, best first.
	///
	/// `k` of zero is treated as one. Equal scores keep insertion order.
	pub fn search(&self, query: &str, k: usize) -> Vec<SearchHit> {
		let qv = self.query_vector(query);
		let mut scored: Vec<(f64, &LexicalDoc)> = self
			.docs
			.iter()
			.map(|d| (qv.cosine(d), d))
			.filter(|(score, _)| *score > 0.0)
			.collect();
		scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
		scored
			.into_iter()
			.take(k.max(1))
			.map(|(score, d)| SearchHit {
				id: d.id.clone(),
				text: d.text.clone(),
				metadata: d.metadata.clone(),
				score: score as f32,
				source: SourceKind::Lexical,
			})
			.collect()
	}
}
