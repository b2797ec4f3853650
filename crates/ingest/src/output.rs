//! Rendering chunks for retrieval consumers.

use serde_json::{Map, Value};

use mdchunk_core::Chunk;

/// Statistics and execution bookkeeping never shown to consumers.
const EXCLUDED_KEYS: &[&str] = &[
    "strategy",
    "fallback_level",
    "char_count",
    "line_count",
    "word_count",
    "block_count",
    "total_chunks",
    "section_count",
];

fn is_excluded(key: &str) -> bool {
    EXCLUDED_KEYS.contains(&key) || key.starts_with("avg_") || key.ends_with("_count")
}

/// Metadata worth emitting for one chunk.
///
/// `is_*` / `has_*` flags appear only when true; line range and the oversize
/// flag come from the chunk itself. Split pieces keep `split_parent`,
/// `split_index` and `split_total` so consumers can regroup them.
pub fn filter_metadata(chunk: &Chunk) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in &chunk.metadata {
        if is_excluded(key) {
            continue;
        }
        let flag = key.starts_with("is_") || key.starts_with("has_");
        if flag && value != &Value::Bool(true) {
            continue;
        }
        out.insert(key.clone(), value.clone());
    }
    out.insert("start_line".into(), chunk.start_line.into());
    out.insert("end_line".into(), chunk.end_line.into());
    if chunk.is_oversize {
        out.insert("is_oversize".into(), true.into());
    }
    out
}

/// `<metadata>` block followed by the raw content, or the content alone.
pub fn format_chunk(chunk: &Chunk, include_metadata: bool) -> String {
    if !include_metadata {
        return chunk.content.clone();
    }
    let json = serde_json::to_string_pretty(&Value::Object(filter_metadata(chunk)))
        .unwrap_or_else(|_| "{}".to_string());
    format!("<metadata>\n{json}\n</metadata>\n{}", chunk.content)
}

pub fn format_chunks(chunks: &[Chunk], include_metadata: bool) -> Vec<String> {
    chunks
        .iter()
        .map(|c| format_chunk(c, include_metadata))
        .collect()
}
