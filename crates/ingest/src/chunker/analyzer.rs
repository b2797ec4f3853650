//! Content profiling used by strategy selection.

use std::collections::BTreeSet;

use mdchunk_core::text::{char_len, list_item_indent};
use mdchunk_core::{Block, BlockKind, ChunkingError, ContentAnalysis, Document, Result};

/// Minimum share of content for a category to count towards "mixed".
const MIXED_CATEGORY_RATIO: f64 = 0.1;

/// Profile the block sequence of a document.
pub fn analyze(doc: &Document) -> Result<ContentAnalysis> {
    if doc.blocks.iter().all(|b| b.content.trim().is_empty()) {
        return Err(ChunkingError::EmptyInput);
    }

    let mut code_chars = 0usize;
    let mut list_chars = 0usize;
    let mut table_chars = 0usize;
    let mut text_chars = 0usize;
    let mut analysis = ContentAnalysis {
        total_chars: char_len(&doc.text),
        total_lines: doc.text.lines().count(),
        ..Default::default()
    };
    let mut languages = BTreeSet::new();

    for block in &doc.blocks {
        let chars = block.char_len();
        match block.kind {
            BlockKind::Code => {
                code_chars += chars;
                analysis.code_block_count += 1;
                if let Some(lang) = &block.language {
                    languages.insert(lang.to_ascii_lowercase());
                }
            }
            BlockKind::List => {
                list_chars += chars;
                analysis.list_count += 1;
                analysis.nesting_depth = analysis.nesting_depth.max(list_depth(block));
            }
            BlockKind::Table => {
                table_chars += chars;
                analysis.table_count += 1;
            }
            BlockKind::Header => {
                text_chars += chars;
                analysis.header_count += 1;
                let level = block.header_level.unwrap_or(1);
                analysis.max_header_level = analysis.max_header_level.max(level);
            }
            BlockKind::Paragraph => {
                text_chars += chars;
                analysis.paragraph_count += 1;
            }
        }
    }

    let total = (code_chars + list_chars + table_chars + text_chars).max(1) as f64;
    analysis.code_ratio = code_chars as f64 / total;
    analysis.list_ratio = list_chars as f64 / total;
    analysis.table_ratio = table_chars as f64 / total;
    analysis.text_ratio = text_chars as f64 / total;
    analysis.languages = languages.into_iter().collect();

    let structured = [analysis.code_ratio, analysis.list_ratio, analysis.table_ratio]
        .iter()
        .filter(|r| **r >= MIXED_CATEGORY_RATIO)
        .count();
    analysis.has_mixed_content = structured >= 2;

    tracing::debug!(
        code_ratio = analysis.code_ratio,
        list_ratio = analysis.list_ratio,
        headers = analysis.header_count,
        tables = analysis.table_count,
        mixed = analysis.has_mixed_content,
        "Content analyzed"
    );
    Ok(analysis)
}

/// Number of distinct item indentation levels in a list block.
fn list_depth(block: &Block) -> usize {
    let indents: BTreeSet<usize> = block.content.lines().filter_map(list_item_indent).collect();
    indents.len().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_markdown;

    #[test]
    fn counts_and_ratios() {
        let doc = parse_markdown(
            "# T\n\nText here.\n\n```python\nprint(1)\n```\n\n- a\n  - b\n    - c\n\n| a | b |\n|---|---|\n| 1 | 2 |\n",
        );
        let a = analyze(&doc).unwrap();
        assert_eq!(a.header_count, 1);
        assert_eq!(a.code_block_count, 1);
        assert_eq!(a.list_count, 1);
        assert_eq!(a.table_count, 1);
        assert_eq!(a.nesting_depth, 3);
        assert_eq!(a.languages, vec!["python".to_string()]);
        let sum = a.code_ratio + a.list_ratio + a.table_ratio + a.text_ratio;
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(a.has_mixed_content);
    }

    #[test]
    fn plain_prose_is_not_mixed() {
        let doc = parse_markdown("One paragraph.\n\nAnother paragraph.");
        let a = analyze(&doc).unwrap();
        assert_eq!(a.paragraph_count, 2);
        assert!(!a.has_mixed_content);
        assert!((a.text_ratio - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_document_is_rejected() {
        let doc = parse_markdown("   ");
        assert_eq!(analyze(&doc).unwrap_err(), ChunkingError::EmptyInput);
    }
}
