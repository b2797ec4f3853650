use mdchunk_core::{BlockKind, Chunk, ChunkConfig, ContentAnalysis, Document, StrategyKind, Thresholds};

use super::assembler::{assemble, UnitRules};

/// Every code block gets its own chunk, together with a short lead-in paragraph.
const RULES: UnitRules = UnitRules {
    anchors: &[BlockKind::Code],
    isolate: &[BlockKind::Code],
    header_break_level: None,
};

pub(super) fn applies(analysis: &ContentAnalysis, t: &Thresholds) -> bool {
    analysis.code_ratio >= t.code_ratio && analysis.code_block_count >= t.min_code_blocks
}

pub(super) fn build(doc: &Document, config: &ChunkConfig) -> Vec<Chunk> {
    assemble(doc, config, StrategyKind::CodeAware, &RULES)
}
