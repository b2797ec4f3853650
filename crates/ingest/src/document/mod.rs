//! Markdown block extraction and pre-chunking normalization.

mod md;
mod normalize;

pub use md::{header_title, parse_markdown};
pub use normalize::normalize_text;

use mdchunk_core::{ChunkingError, Document, Result};

/// Decode raw bytes as UTF-8, rejecting invalid input instead of guessing.
pub fn decode_utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| ChunkingError::InvalidEncoding {
        detail: e.to_string(),
    })
}

/// Validate, normalize and parse a markdown document.
pub fn extract_document(text: &str) -> Result<Document> {
    if text.trim().is_empty() {
        return Err(ChunkingError::EmptyInput);
    }
    let normalized = normalize_text(text);
    Ok(parse_markdown(&normalized))
}
