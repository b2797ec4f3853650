use mdchunk_core::{BlockKind, Chunk, ChunkConfig, ContentAnalysis, Document, StrategyKind};

use super::assembler::{assemble, UnitRules};

const RULES: UnitRules = UnitRules {
    anchors: &[BlockKind::Code, BlockKind::Table, BlockKind::List],
    isolate: &[BlockKind::Code, BlockKind::Table],
    header_break_level: Some(2),
};

pub(super) fn applies(analysis: &ContentAnalysis) -> bool {
    analysis.has_mixed_content
}

/// Section breaks at the top two header levels, code and tables isolated,
/// lists kept with their introduction.
pub(super) fn build(doc: &Document, config: &ChunkConfig) -> Vec<Chunk> {
    assemble(doc, config, StrategyKind::Mixed, &RULES)
}
