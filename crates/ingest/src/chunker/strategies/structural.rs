use std::collections::BTreeSet;

use mdchunk_core::{BlockKind, Chunk, ChunkConfig, ContentAnalysis, Document, StrategyKind, Thresholds};

use super::assembler::{assemble, UnitRules};

pub(super) fn applies(analysis: &ContentAnalysis, t: &Thresholds) -> bool {
    analysis.header_count >= t.min_headers
}

/// Break at the two shallowest header levels present; deeper subsections
/// stay with their parent while they fit.
pub(super) fn build(doc: &Document, config: &ChunkConfig) -> Vec<Chunk> {
    let rules = UnitRules {
        anchors: &[BlockKind::Code, BlockKind::Table],
        isolate: &[],
        header_break_level: split_level(doc),
    };
    assemble(doc, config, StrategyKind::Structural, &rules)
}

fn split_level(doc: &Document) -> Option<u8> {
    let levels: BTreeSet<u8> = doc.blocks.iter().filter_map(|b| b.header_level).collect();
    levels.iter().nth(1).or_else(|| levels.first()).copied()
}
