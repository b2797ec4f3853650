use mdchunk_core::{Chunk, ChunkConfig, Document, StrategyKind};

use super::assembler::{assemble, UnitRules};

const RULES: UnitRules = UnitRules {
    anchors: &[],
    isolate: &[],
    header_break_level: None,
};

pub(super) fn can_handle(doc: &Document) -> bool {
    doc.blocks.iter().any(|b| !b.content.trim().is_empty())
}

/// Sequential packing in document order.
pub(super) fn build(doc: &Document, config: &ChunkConfig) -> Vec<Chunk> {
    assemble(doc, config, StrategyKind::Fallback, &RULES)
}
