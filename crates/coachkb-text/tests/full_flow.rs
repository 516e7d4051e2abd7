use std::fs;

use coachkb_core::types::{Metadata, StoreStats};
use coachkb_core::{Error, KnowledgeStore};
use coachkb_text::LexicalStore;
use serde_json::{json, Value};
use tempfile::TempDir;

fn texts(items: &[&str]) -> Vec<String> {
	items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn cat_query_ranks_cat_document_first() {
	let tmp = TempDir::new().unwrap();
	let mut store = LexicalStore::open(tmp.path().join("kb.json"));
	let added = store.add_texts(&texts(&["the cat sat on the mat", "the dog sat on the log"]), None).expect("add");
	assert_eq!(added, 2);

	let results = store.search("cat", 5);
	assert!(!results.is_empty());
	assert_eq!(results[0].id, "d1");
	let dog_score = results.iter().find(|h| h.id == "d2").map(|h| h.score).unwrap_or(0.0);
	assert!(results[0].score > dog_score);
}

#[test]
fn disjoint_documents_are_excluded_and_weights_non_negative() {
	let tmp = TempDir::new().unwrap();
	let mut store = LexicalStore::open(tmp.path().join("kb.json"));
	store
		.add_texts(&texts(&["kubernetes migration for payments", "quarterly hiring plan", "payments latency dashboard", ""]), None)
		.expect("add");

	for doc in store.docs() {
		assert!(doc.tfidf.values().all(|w| *w >= 0.0), "weights of {} must be non-negative", doc.id);
		assert!(doc.length >= 0.0);
	}
	assert_eq!(store.docs()[3].length, 0.0, "empty text has zero norm");

	let results = store.search("payments", 10);
	let ids: Vec<&str> = results.iter().map(|h| h.id.as_str()).collect();
	assert_eq!(ids.len(), 2);
	assert!(ids.contains(&"d1") && ids.contains(&"d3"));
	for hit in &results {
		assert!(hit.score > 0.0 && hit.score <= 1.0 + 1e-6);
	}
	assert!(store.search("", 5).is_empty());
	assert!(store.search("zebra", 5).is_empty());
}

#[test]
fn search_does_not_mutate_document_frequencies() {
	let tmp = TempDir::new().unwrap();
	let mut store = LexicalStore::open(tmp.path().join("kb.json"));
	store.add_texts(&texts(&["alpha beta", "beta gamma"]), None).expect("add");
	let vocab = store.vocab_size();
	let _ = store.search("beta delta delta", 3);
	assert_eq!(store.vocab_size(), vocab);
	assert_eq!(store.document_frequency("beta"), 2);
	assert_eq!(store.document_frequency("delta"), 0);
}

#[test]
fn top_k_limits_and_zero_k_returns_one() {
	let tmp = TempDir::new().unwrap();
	let mut store = LexicalStore::open(tmp.path().join("kb.json"));
	store.add_texts(&texts(&["rust service", "rust cli", "rust parser"]), None).expect("add");
	assert_eq!(store.search("rust", 2).len(), 2);
	assert_eq!(store.search("rust", 0).len(), 1);
}

#[test]
fn df_counts_documents_not_occurrences_and_weights_follow_new_batches() {
	let tmp = TempDir::new().unwrap();
	let mut store = LexicalStore::open(tmp.path().join("kb.json"));
	store.add_texts(&texts(&["ship ship ship", "plan"]), None).expect("add");
	assert_eq!(store.document_frequency("ship"), 1);
	let before = store.docs()[1].tfidf["plan"];

	store.add_texts(&texts(&["plan the ship"]), None).expect("add");
	assert_eq!(store.document_frequency("ship"), 2);
	assert_eq!(store.document_frequency("plan"), 2);
	let after = store.docs()[1].tfidf["plan"];
	assert!(after < before, "older documents are re-weighted with the new df");
	assert_eq!(store.docs()[2].id, "d3");
}

#[test]
fn persistence_round_trip_preserves_docs_and_ranking() {
	let tmp = TempDir::new().unwrap();
	let path = tmp.path().join("nested/kb.json");
	let mut meta = Metadata::new();
	meta.insert("role".to_string(), json!("staff engineer"));
	let ranking = {
		let mut store = LexicalStore::open(&path);
		store.add_texts(&texts(&["designed the search ranking service"]), Some(std::slice::from_ref(&meta))).expect("add");
		store.add_texts(&texts(&["ran the incident review", "search relevance tuning"]), None).expect("add");
		store.search("search service", 5)
	};

	let reloaded = LexicalStore::open(&path);
	assert_eq!(reloaded.doc_count(), 3);
	assert_eq!(reloaded.docs()[0].metadata, meta);
	let again = reloaded.search("search service", 5);
	assert_eq!(ranking.len(), again.len());
	for (a, b) in ranking.iter().zip(again.iter()) {
		assert_eq!(a.id, b.id);
		assert!((a.score - b.score).abs() < 1e-6);
	}
}

#[test]
fn snapshot_layout_on_disk() {
	let tmp = TempDir::new().unwrap();
	let path = tmp.path().join("kb.json");
	let mut store = LexicalStore::open(&path);
	store.add_texts(&texts(&["Hello hello world"]), None).expect("add");

	let raw: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
	assert_eq!(raw["meta"]["engine"], json!("lexical"));
	assert_eq!(raw["meta"]["version"], json!(1));
	assert_eq!(raw["doc_count"], json!(1));
	assert_eq!(raw["df"]["hello"], json!(1));
	let doc = &raw["docs"][0];
	assert_eq!(doc["id"], json!("d1"));
	assert!(doc["tfidf"]["hello"].as_f64().unwrap() > 0.0);
	assert!(doc["length"].as_f64().unwrap() > 0.0);
}

#[test]
fn corrupt_snapshot_starts_fresh() {
	let tmp = TempDir::new().unwrap();
	let path = tmp.path().join("kb.json");
	fs::write(&path, "{ not json").unwrap();
	let mut store = LexicalStore::open(&path);
	assert_eq!(store.doc_count(), 0);
	store.add_texts(&texts(&["recovered"]), None).expect("add");
	assert_eq!(LexicalStore::open(&path).doc_count(), 1);
}

#[test]
fn clear_resets_and_persists() {
	let tmp = TempDir::new().unwrap();
	let path = tmp.path().join("kb.json");
	let mut store = LexicalStore::open(&path);
	store.add_texts(&texts(&["one thing", "another thing"]), None).expect("add");
	store.clear().expect("clear");
	assert_eq!(store.stats().docs(), 0);
	assert!(store.search("thing", 5).is_empty());
	assert_eq!(LexicalStore::open(&path).doc_count(), 0);

	store.add_texts(&texts(&["fresh start"]), None).expect("add");
	assert_eq!(store.docs()[0].id, "d1", "ids restart after clear");
}

#[test]
fn stats_report_lexical_engine() {
	let tmp = TempDir::new().unwrap();
	let path = tmp.path().join("kb.json");
	let mut store = LexicalStore::open(&path);
	store.add_texts(&texts(&["a b c", "c d"]), None).expect("add");
	match store.stats() {
		StoreStats::Lexical { docs, path: p, vocab_size } => {
			assert_eq!(docs, 2);
			assert_eq!(p, path.display().to_string());
			assert_eq!(vocab_size, 4);
		}
		other => panic!("unexpected stats {other:?}"),
	}
	let as_json = serde_json::to_value(store.stats()).unwrap();
	assert_eq!(as_json["engine"], json!("lexical"));
}

#[test]
fn import_directory_adds_paragraphs_and_valid_jsonl_lines() {
	let tmp = TempDir::new().unwrap();
	let data = tmp.path().join("data");
	fs::create_dir_all(&data).unwrap();
	fs::write(data.join("history.txt"), "Led the API redesign.\n\nMentored three interns.").unwrap();
	fs::write(data.join("wins.jsonl"), "{\"text\": \"Reduced cloud spend\"}\n{broken\n{\"content\": \"Launched mobile app\", \"year\": 2023}\n").unwrap();

	let mut store = LexicalStore::open(tmp.path().join("kb.json"));
	let added = KnowledgeStore::import_path(&mut store, &data).expect("import");
	assert_eq!(added, 4);
	assert_eq!(store.doc_count(), 4);

	let hit = &store.search("mobile app", 1)[0];
	assert_eq!(hit.text, "Launched mobile app");
	let source = data.join("wins.jsonl").to_string_lossy().to_string();
	assert_eq!(hit.metadata.get("source"), Some(&json!(source)));
	assert_eq!(hit.metadata.get("year"), Some(&json!(2023)));
}

#[test]
fn import_missing_path_is_not_found() {
	let tmp = TempDir::new().unwrap();
	let mut store = LexicalStore::open(tmp.path().join("kb.json"));
	let err = KnowledgeStore::import_path(&mut store, &tmp.path().join("missing")).unwrap_err();
	assert!(matches!(err, Error::NotFound(_)));
}
