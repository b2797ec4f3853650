use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use mdchunk_core::{BlockId, Chunk, ChunkingError, Document, Result};

use crate::ValidationResult;

#[derive(Debug, Clone, Copy)]
struct Presence {
    chunk: usize,
    partial: bool,
}

/// Records which chunks each block landed in.
pub struct BlockTracker<'a> {
    doc: &'a Document,
    seen: BTreeMap<BlockId, Vec<Presence>>,
}

/// Block-level coverage of a chunk list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageResult {
    /// Percentage of registered blocks present in at least one chunk.
    pub coverage: f64,
    pub total_blocks: usize,
    pub covered_blocks: usize,
    pub missing_blocks: Vec<BlockId>,
    pub missing_chars: usize,
    pub over_duplicated: Vec<BlockId>,
    #[serde(flatten)]
    pub report: ValidationResult,
}

impl<'a> BlockTracker<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            seen: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, chunk_index: usize, chunk: &Chunk) {
        for span in &chunk.spans {
            self.seen.entry(span.block_id).or_default().push(Presence {
                chunk: chunk_index,
                partial: span.partial,
            });
        }
    }

    /// Record every leaf chunk; root and section nodes carry no blocks.
    pub fn record_all(&mut self, chunks: &[Chunk]) {
        for (i, chunk) in chunks.iter().filter(|c| c.is_leaf()).enumerate() {
            self.record(i, chunk);
        }
    }

    pub fn validate(&self, max_duplication: usize) -> CoverageResult {
        let mut report = ValidationResult::new();
        let total_blocks = self.doc.blocks.len();

        let missing_blocks: Vec<BlockId> = self
            .doc
            .blocks
            .iter()
            .map(|b| b.id)
            .filter(|id| !self.seen.contains_key(id))
            .collect();
        let missing_chars: usize = missing_blocks
            .iter()
            .filter_map(|id| self.doc.block(*id))
            .map(|b| b.char_len())
            .sum();
        if !missing_blocks.is_empty() {
            report.error(
                "missing_content",
                format!(
                    "{} block(s) missing from output ({missing_chars} chars): {missing_blocks:?}",
                    missing_blocks.len()
                ),
            );
        }

        let over_duplicated: Vec<BlockId> = self
            .seen
            .iter()
            .filter(|(id, _)| self.doc.block(**id).is_some_and(|b| !b.is_header()))
            .filter(|(_, presence)| longest_full_run(presence) > max_duplication)
            .map(|(id, _)| *id)
            .collect();
        for id in &over_duplicated {
            report.warn(
                "over_duplication",
                format!("block {id} repeated in more than {max_duplication} consecutive chunks"),
            );
        }

        let covered_blocks = total_blocks - missing_blocks.len();
        let coverage = if total_blocks == 0 {
            100.0
        } else {
            covered_blocks as f64 / total_blocks as f64 * 100.0
        };
        CoverageResult {
            coverage,
            total_blocks,
            covered_blocks,
            missing_blocks,
            missing_chars,
            over_duplicated,
            report,
        }
    }
}

/// Longest run of consecutive chunk indices holding the full block.
fn longest_full_run(presence: &[Presence]) -> usize {
    let mut indices: Vec<usize> = presence
        .iter()
        .filter(|p| !p.partial)
        .map(|p| p.chunk)
        .collect();
    indices.sort_unstable();
    indices.dedup();

    let mut best = 0;
    let mut run = 0;
    let mut prev: Option<usize> = None;
    for i in indices {
        run = match prev {
            Some(p) if p + 1 == i => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(i);
    }
    best
}

impl CoverageResult {
    pub fn is_valid(&self) -> bool {
        self.report.valid
    }

    pub fn raise_if_invalid(&self, strict: bool) -> Result<()> {
        if self.missing_blocks.is_empty() {
            return Ok(());
        }
        if strict {
            return Err(ChunkingError::MissingContent {
                blocks: self.missing_blocks.clone(),
                chars: self.missing_chars,
            });
        }
        self.report.log_downgraded();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdchunk_core::{Block, BlockKind, BlockSpan};

    fn block(id: BlockId, kind: BlockKind, content: &str) -> Block {
        Block {
            id,
            kind,
            content: content.to_string(),
            start_offset: 0,
            end_offset: content.len(),
            start_line: id + 1,
            end_line: id + 1,
            header_level: (kind == BlockKind::Header).then_some(1),
            section: None,
            language: None,
            content_hash: String::new(),
        }
    }

    fn doc() -> Document {
        Document {
            text: String::new(),
            blocks: vec![
                block(0, BlockKind::Header, "# T"),
                block(1, BlockKind::Paragraph, "alpha"),
                block(2, BlockKind::Paragraph, "beta"),
            ],
            sections: Vec::new(),
        }
    }

    fn chunk(ids: &[BlockId]) -> Chunk {
        let mut c = Chunk::new("x".into(), 1, 1);
        c.spans = ids.iter().map(|id| BlockSpan::full(*id, 0, 1)).collect();
        c
    }

    #[test]
    fn full_coverage_is_valid() {
        let doc = doc();
        let mut tracker = BlockTracker::new(&doc);
        tracker.record_all(&[chunk(&[0, 1]), chunk(&[2])]);
        let result = tracker.validate(2);
        assert!(result.is_valid());
        assert!((result.coverage - 100.0).abs() < f64::EPSILON);
        assert!(result.raise_if_invalid(true).is_ok());
    }

    #[test]
    fn missing_block_is_fatal_only_when_strict() {
        let doc = doc();
        let mut tracker = BlockTracker::new(&doc);
        tracker.record_all(&[chunk(&[0, 1])]);
        let result = tracker.validate(2);
        assert!(!result.is_valid());
        assert_eq!(result.missing_blocks, vec![2]);
        assert_eq!(result.missing_chars, 4);
        assert!(result.raise_if_invalid(false).is_ok());
        assert_eq!(
            result.raise_if_invalid(true).unwrap_err(),
            ChunkingError::MissingContent {
                blocks: vec![2],
                chars: 4
            }
        );
    }

    #[test]
    fn consecutive_repeats_are_flagged_as_warning() {
        let doc = doc();
        let mut tracker = BlockTracker::new(&doc);
        tracker.record_all(&[chunk(&[0, 1]), chunk(&[1]), chunk(&[1, 2])]);
        let result = tracker.validate(2);
        assert_eq!(result.over_duplicated, vec![1]);
        assert!(result.is_valid());
        assert_eq!(result.report.warnings.len(), 1);
    }

    #[test]
    fn headers_and_partial_pieces_do_not_count_as_duplication() {
        let doc = doc();
        let mut tracker = BlockTracker::new(&doc);
        let mut parts: Vec<Chunk> = (0..3).map(|_| chunk(&[0])).collect();
        for c in &mut parts {
            c.spans.push(BlockSpan {
                block_id: 1,
                start: 0,
                end: 1,
                block_offset: 0,
                partial: true,
            });
        }
        parts.push(chunk(&[2]));
        tracker.record_all(&parts);
        let result = tracker.validate(2);
        assert!(result.over_duplicated.is_empty());
        assert!(result.is_valid());
    }
}
