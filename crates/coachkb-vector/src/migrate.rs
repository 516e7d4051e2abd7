//! Reads the lexical store's JSON snapshot so its chunks can be re-embedded.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use coachkb_core::error::Result;
use coachkb_core::types::Metadata;

#[derive(Deserialize)]
struct LegacySnapshot {
    #[serde(default)]
    docs: Vec<LegacyDoc>,
}

#[derive(Deserialize)]
struct LegacyDoc {
    #[serde(default)]
    text: Option<Value>,
    #[serde(default)]
    metadata: Option<Value>,
}

/// Texts and metadata of every document in a lexical snapshot, in order.
///
/// A missing `text` becomes an empty string and a non-object `metadata` an
/// empty map.
pub fn read_legacy_lexical_json(path: &Path) -> Result<(Vec<String>, Vec<Metadata>)> {
    let snapshot: LegacySnapshot = serde_json::from_slice(&fs::read(path)?)?;
    Ok(snapshot
        .docs
        .into_iter()
        .map(|d| {
            let text = d.text.as_ref().and_then(Value::as_str).unwrap_or_default().to_string();
            let metadata = match d.metadata {
                Some(Value::Object(map)) => map,
                _ => Metadata::new(),
            };
            (text, metadata)
        })
        .unzip())
}
