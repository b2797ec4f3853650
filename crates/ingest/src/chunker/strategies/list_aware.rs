use mdchunk_core::{BlockKind, Chunk, ChunkConfig, ContentAnalysis, Document, StrategyKind, Thresholds};

use super::assembler::{assemble, UnitRules};

const RULES: UnitRules = UnitRules {
    anchors: &[BlockKind::List],
    isolate: &[],
    header_break_level: Some(2),
};

pub(super) fn applies(analysis: &ContentAnalysis, t: &Thresholds) -> bool {
    analysis.list_ratio >= t.list_ratio && analysis.list_count >= t.min_lists
}

/// Lists pack together; an introducing paragraph never gets separated from its list.
pub(super) fn build(doc: &Document, config: &ChunkConfig) -> Vec<Chunk> {
    assemble(doc, config, StrategyKind::ListAware, &RULES)
}
