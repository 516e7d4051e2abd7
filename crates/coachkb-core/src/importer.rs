//! Turns text, markdown and JSON files into `(text, metadata)` chunks.
//!
//! JSON payloads are classified into a [`JsonShape`] and resolved by a single
//! recursive walk. Malformed records are skipped, never reported.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::{source_metadata, Chunk, Metadata};

pub const SUPPORTED_IMPORT_SUFFIXES: [&str; 4] = ["txt", "md", "json", "jsonl"];

const TEXT_KEYS: [&str; 3] = ["text", "content", "chunk"];
const EXCLUDED_KEYS: [&str; 4] = ["text", "content", "chunk", "metadata"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Paragraphs,
    JsonLines,
    Json,
}

fn file_kind(path: &Path) -> Option<FileKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "txt" | "md" => Some(FileKind::Paragraphs),
        "jsonl" => Some(FileKind::JsonLines),
        "json" => Some(FileKind::Json),
        _ => None,
    }
}

pub fn is_supported(path: &Path) -> bool {
    file_kind(path).is_some()
}

/// Lists supported files under `path`, sorted for deterministic ingest.
///
/// A single file is returned only when its suffix is supported.
pub fn gather_import_files(path: &Path) -> Vec<PathBuf> {
    if !path.is_dir() {
        return if path.is_file() && is_supported(path) { vec![path.to_path_buf()] } else { vec![] };
    }
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_supported(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Like [`gather_import_files`], but a missing `root` is [`Error::NotFound`].
pub fn collect_import_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(Error::NotFound(root.display().to_string()));
    }
    Ok(gather_import_files(root))
}

/// Chunks of `file` ready for one `add_texts` call, or `None` when the file
/// is unreadable (logged) or yields nothing.
pub fn load_file_chunks(file: &Path) -> Option<(Vec<String>, Vec<Metadata>)> {
    match read_import_file(file) {
        Ok((texts, _)) if texts.is_empty() => {
            debug!(file = %file.display(), "no chunks");
            None
        }
        Ok(parsed) => Some(parsed),
        Err(e) => {
            warn!(file = %file.display(), error = %e, "skipping unreadable import file");
            None
        }
    }
}

/// Reads one supported file into parallel text/metadata lists.
pub fn read_import_file(path: &Path) -> Result<(Vec<String>, Vec<Metadata>)> {
    let source = path.to_string_lossy().to_string();
    let chunks = match file_kind(path) {
        Some(FileKind::Paragraphs) => split_paragraphs(&read_file_content(path)?, &source),
        Some(FileKind::JsonLines) => parse_json_lines(&read_file_content(path)?, &source),
        Some(FileKind::Json) => parse_json_document(&read_file_content(path)?, &source),
        None => vec![],
    };
    debug!(file = %path.display(), chunks = chunks.len(), "read import file");
    Ok(chunks.into_iter().map(|c| (c.text, c.metadata)).unzip())
}

fn read_file_content(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).to_string(),
    })
}

/// One chunk per blank-line separated paragraph. CRLF line endings count as `\n`.
pub fn split_paragraphs(content: &str, source: &str) -> Vec<Chunk> {
    content
        .replace("\r\n", "\n")
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| Chunk::new(p, source_metadata(source)))
        .collect()
}

pub fn parse_json_lines(content: &str, source: &str) -> Vec<Chunk> {
    let mut out = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => resolve_chunks(&value, source, &mut out),
            Err(e) => debug!(source, line = lineno + 1, error = %e, "skipping malformed jsonl line"),
        }
    }
    out
}

pub fn parse_json_document(content: &str, source: &str) -> Vec<Chunk> {
    let mut out = Vec::new();
    match serde_json::from_str::<Value>(content) {
        Ok(value) => resolve_chunks(&value, source, &mut out),
        Err(e) => debug!(source, error = %e, "skipping malformed json document"),
    }
    out
}

/// The JSON layouts the importer understands.
#[derive(Debug)]
pub enum JsonShape<'a> {
    /// A bare string is one chunk.
    StringChunk(&'a str),
    /// A list concatenates the chunks of its items.
    ChunkList(&'a [Value]),
    /// An object holding a `chunks` list.
    ChunksWrapper(&'a [Value]),
    /// Any other object: a single record with a text field.
    RecordObject(&'a serde_json::Map<String, Value>),
    Ignored,
}

impl<'a> JsonShape<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::String(s) => JsonShape::StringChunk(s),
            Value::Array(items) => JsonShape::ChunkList(items),
            Value::Object(map) => match map.get("chunks") {
                Some(Value::Array(items)) => JsonShape::ChunksWrapper(items),
                _ => JsonShape::RecordObject(map),
            },
            _ => JsonShape::Ignored,
        }
    }
}

pub fn resolve_chunks(value: &Value, source: &str, out: &mut Vec<Chunk>) {
    match JsonShape::classify(value) {
        JsonShape::StringChunk(s) => out.push(Chunk::new(s, source_metadata(source))),
        JsonShape::ChunkList(items) | JsonShape::ChunksWrapper(items) => {
            for item in items {
                resolve_chunks(item, source, out);
            }
        }
        JsonShape::RecordObject(record) => {
            if let Some(text) = record_text(record) {
                out.push(Chunk::new(text, record_metadata(record, source)));
            }
        }
        JsonShape::Ignored => {}
    }
}

fn record_text(record: &serde_json::Map<String, Value>) -> Option<&str> {
    TEXT_KEYS
        .iter()
        .filter_map(|key| record.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

fn record_metadata(record: &serde_json::Map<String, Value>, source: &str) -> Metadata {
    let mut meta = match record.get("metadata") {
        Some(Value::Object(explicit)) => explicit.clone(),
        _ => record
            .iter()
            .filter(|(k, _)| !EXCLUDED_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    };
    meta.insert("source".to_string(), Value::String(source.to_string()));
    meta
}
