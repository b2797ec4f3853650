use mdchunk_core::{BlockKind, Chunk, ChunkConfig, ContentAnalysis, Document, StrategyKind, Thresholds};

use super::assembler::{assemble, UnitRules};

const RULES: UnitRules = UnitRules {
    anchors: &[BlockKind::Table],
    isolate: &[BlockKind::Table],
    header_break_level: None,
};

pub(super) fn applies(analysis: &ContentAnalysis, t: &Thresholds) -> bool {
    analysis.table_count >= t.min_tables
}

/// Tables stay whole and alone, preceded by their caption paragraph when short.
pub(super) fn build(doc: &Document, config: &ChunkConfig) -> Vec<Chunk> {
    assemble(doc, config, StrategyKind::Table, &RULES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_markdown;

    #[test]
    fn tables_keep_their_caption() {
        let doc = parse_markdown(
            "Results by region:\n\n| region | sales |\n|---|---|\n| north | 10 |\n\nClosing remarks.",
        );
        let chunks = build(&doc, &ChunkConfig::default());
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].content.starts_with("Results by region:\n\n| region"));
        assert_eq!(chunks[0].meta_str("content_type"), Some("mixed"));
        assert!(chunks[0].meta_flag("has_table"));
        assert_eq!(chunks[1].content, "Closing remarks.");
    }
}
