//! Chunking strategies. Each one groups whole blocks differently; none of
//! them splits a block, that is left to the size enforcer.

mod assembler;
mod code_aware;
mod fallback;
mod list_aware;
mod mixed;
mod structural;
mod table;

pub(crate) use assembler::BLOCK_SEPARATOR;

use mdchunk_core::{
    BlockKind, Chunk, ChunkConfig, ChunkingError, ContentAnalysis, Document, Result, StrategyKind,
    Thresholds,
};

/// Uniform capability of every strategy kind.
pub trait Strategy {
    /// Whether the content profile calls for this strategy.
    fn applies(&self, analysis: &ContentAnalysis, thresholds: &Thresholds) -> bool;

    /// Cheap check that the strategy has something to work with.
    fn can_handle(&self, doc: &Document) -> bool;

    /// Group the document's blocks into chunks.
    fn build(&self, doc: &Document, config: &ChunkConfig) -> Result<Vec<Chunk>>;
}

impl Strategy for StrategyKind {
    fn applies(&self, analysis: &ContentAnalysis, thresholds: &Thresholds) -> bool {
        match self {
            StrategyKind::CodeAware => code_aware::applies(analysis, thresholds),
            StrategyKind::Structural => structural::applies(analysis, thresholds),
            StrategyKind::ListAware => list_aware::applies(analysis, thresholds),
            StrategyKind::Table => table::applies(analysis, thresholds),
            StrategyKind::Mixed => mixed::applies(analysis),
            StrategyKind::Fallback => true,
        }
    }

    fn can_handle(&self, doc: &Document) -> bool {
        let any = |kind: BlockKind| doc.blocks.iter().any(|b| b.kind == kind);
        match self {
            StrategyKind::CodeAware => any(BlockKind::Code),
            StrategyKind::Structural => any(BlockKind::Header),
            StrategyKind::ListAware => any(BlockKind::List),
            StrategyKind::Table => any(BlockKind::Table),
            StrategyKind::Mixed | StrategyKind::Fallback => fallback::can_handle(doc),
        }
    }

    fn build(&self, doc: &Document, config: &ChunkConfig) -> Result<Vec<Chunk>> {
        let chunks = match self {
            StrategyKind::CodeAware => code_aware::build(doc, config),
            StrategyKind::Structural => structural::build(doc, config),
            StrategyKind::ListAware => list_aware::build(doc, config),
            StrategyKind::Table => table::build(doc, config),
            StrategyKind::Mixed => mixed::build(doc, config),
            StrategyKind::Fallback => fallback::build(doc, config),
        };
        if chunks.is_empty() {
            return Err(ChunkingError::Strategy {
                strategy: self.to_string(),
                message: "no chunks produced".to_string(),
            });
        }
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::analyzer::analyze;
    use crate::document::parse_markdown;

    fn fenced(n: usize) -> String {
        (0..n)
            .map(|i| format!("```rust\nfn f{i}() {{\n    let x = {i};\n    println!(\"{{x}}\");\n}}\n```"))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[test]
    fn code_heavy_documents_apply_code_aware() {
        let doc = parse_markdown(&fenced(3));
        let analysis = analyze(&doc).unwrap();
        let t = Thresholds::default();
        assert!(StrategyKind::CodeAware.applies(&analysis, &t));
        assert!(!StrategyKind::Structural.applies(&analysis, &t));
        assert!(StrategyKind::Fallback.applies(&analysis, &t));
    }

    #[test]
    fn can_handle_needs_matching_blocks() {
        let doc = parse_markdown("Just prose.");
        assert!(!StrategyKind::CodeAware.can_handle(&doc));
        assert!(!StrategyKind::Table.can_handle(&doc));
        assert!(StrategyKind::Mixed.can_handle(&doc));
        assert!(StrategyKind::Fallback.can_handle(&doc));
    }

    #[test]
    fn every_strategy_preserves_blocks() {
        let text = "# Guide\n\nIntro text:\n\n- one\n- two\n\n## Code\n\n```sh\nls\n```\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\nTail.";
        let doc = parse_markdown(text);
        let config = ChunkConfig::default();
        for kind in StrategyKind::PRIORITY {
            let chunks = kind.build(&doc, &config).unwrap();
            let mut ids: Vec<usize> = chunks.iter().flat_map(|c| c.block_ids()).collect();
            ids.sort_unstable();
            assert_eq!(ids, (0..doc.blocks.len()).collect::<Vec<_>>(), "{kind}");
            for chunk in &chunks {
                assert_eq!(chunk.meta_str("strategy"), Some(kind.as_str()));
            }
        }
    }
}
