use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use mdchunk_core::text::char_len;
use mdchunk_core::{Chunk, ChunkingError, Result, Thresholds};

use crate::ValidationResult;

/// Paragraphs shorter than this are ignored when looking for repeats.
const MIN_PARAGRAPH_CHARS: usize = 20;

/// Length of the probe used to find text shared with the previous chunk.
const WINDOW_CHARS: usize = 30;

/// Duplication measured for one chunk that exceeded its limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkDuplication {
    pub index: usize,
    /// Share of the chunk made of paragraphs repeated within it.
    pub internal_ratio: f64,
    /// Share of the chunk also present in the previous chunk, beyond declared overlap.
    pub external_ratio: f64,
    pub limit: f64,
}

/// Declared overlap that does not match the text actually shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapMismatch {
    pub index: usize,
    pub declared: usize,
    pub actual: usize,
    pub tolerance: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupResult {
    pub duplicated: Vec<ChunkDuplication>,
    pub overlap_mismatches: Vec<OverlapMismatch>,
    #[serde(flatten)]
    pub report: ValidationResult,
}

pub fn validate_duplication(chunks: &[Chunk], t: &Thresholds) -> DedupResult {
    let mut report = ValidationResult::new();
    let leaves: Vec<&Chunk> = chunks.iter().filter(|c| c.is_leaf()).collect();
    let mut duplicated = Vec::new();

    for (index, chunk) in leaves.iter().enumerate() {
        let overlapped = chunk.declared_overlap() > 0
            || (index > 0 && leaves[index - 1].meta_str("overlap_type") == Some("suffix"));
        let limit = if overlapped {
            t.overlap_duplication_ratio
        } else {
            t.max_duplication_ratio
        };
        let internal_ratio = internal_ratio(&chunk.content);
        let external_ratio = match index {
            0 => 0.0,
            _ => external_ratio(leaves[index - 1], chunk),
        };
        if internal_ratio > limit || external_ratio > limit {
            report.chunk_error(
                "duplication",
                index,
                format!(
                    "chunk {index}: internal {:.0}%, external {:.0}% (limit {:.0}%)",
                    internal_ratio * 100.0,
                    external_ratio * 100.0,
                    limit * 100.0
                ),
            );
            duplicated.push(ChunkDuplication {
                index,
                internal_ratio,
                external_ratio,
                limit,
            });
        }
    }

    let overlap_mismatches = check_overlap_accuracy(chunks, t);
    for m in &overlap_mismatches {
        report.warn(
            "overlap_accuracy",
            format!(
                "chunk {}: declared overlap {} but {} chars shared",
                m.index, m.declared, m.actual
            ),
        );
    }

    DedupResult {
        duplicated,
        overlap_mismatches,
        report,
    }
}

/// Share of characters in paragraphs that already appeared earlier in the chunk.
fn internal_ratio(content: &str) -> f64 {
    let total = char_len(content);
    if total == 0 {
        return 0.0;
    }
    let mut seen = HashSet::new();
    let mut repeated = 0;
    for para in content.split("\n\n").map(str::trim) {
        let chars = char_len(para);
        if chars < MIN_PARAGRAPH_CHARS {
            continue;
        }
        if !seen.insert(para) {
            repeated += chars;
        }
    }
    repeated as f64 / total as f64
}

/// Share of `chunk` covered by windows also found in `prev`, minus declared overlap.
fn external_ratio(prev: &Chunk, chunk: &Chunk) -> f64 {
    let content = chunk.content.as_str();
    if content.is_empty() {
        return 0.0;
    }
    let mut covered = vec![false; content.len()];
    let word_starts = content.char_indices().filter(|(i, c)| {
        !c.is_whitespace() && (*i == 0 || content[..*i].ends_with(char::is_whitespace))
    });
    for (start, _) in word_starts {
        let end = content[start..]
            .char_indices()
            .nth(WINDOW_CHARS)
            .map_or(content.len(), |(i, _)| start + i);
        if char_len(&content[start..end]) < WINDOW_CHARS {
            break;
        }
        if prev.content.contains(&content[start..end]) {
            covered[start..end].fill(true);
        }
    }
    let shared = content.char_indices().filter(|(i, _)| covered[*i]).count();
    let declared = chunk.declared_overlap().max(suffix_overlap(prev));
    shared.saturating_sub(declared) as f64 / char_len(content) as f64
}

fn suffix_overlap(prev: &Chunk) -> usize {
    if prev.meta_str("overlap_type") == Some("suffix") {
        prev.declared_overlap()
    } else {
        0
    }
}

/// Longest `k` (in chars) such that `left` ends with the first `k` chars of `right`.
pub fn longest_common_affix(left: &str, right: &str) -> usize {
    let boundaries: Vec<usize> = right
        .char_indices()
        .map(|(i, _)| i)
        .skip(1)
        .chain(std::iter::once(right.len()))
        .collect();
    boundaries
        .iter()
        .enumerate()
        .rev()
        .find(|(_, end)| **end <= left.len() && left.ends_with(&right[..**end]))
        .map_or(0, |(k, _)| k + 1)
}

/// Compare every declared overlap with the text actually shared between neighbours.
pub fn check_overlap_accuracy(chunks: &[Chunk], t: &Thresholds) -> Vec<OverlapMismatch> {
    let leaves: Vec<&Chunk> = chunks.iter().filter(|c| c.is_leaf()).collect();
    let mut mismatches = Vec::new();
    for (index, chunk) in leaves.iter().enumerate() {
        let declared = chunk.declared_overlap();
        if declared == 0 {
            continue;
        }
        let actual = match chunk.meta_str("overlap_type") {
            Some("suffix") => match leaves.get(index + 1) {
                Some(next) => longest_common_affix(&chunk.content, &next.content),
                None => 0,
            },
            _ => match index.checked_sub(1).and_then(|p| leaves.get(p)) {
                Some(prev) => longest_common_affix(&prev.content, &chunk.content),
                None => 0,
            },
        };
        let tolerance = t.overlap_tolerance(declared);
        if actual.abs_diff(declared) > tolerance {
            mismatches.push(OverlapMismatch {
                index,
                declared,
                actual,
                tolerance,
            });
        }
    }
    mismatches
}

impl DedupResult {
    pub fn is_valid(&self) -> bool {
        self.report.valid
    }

    pub fn raise_if_invalid(&self, strict: bool) -> Result<()> {
        let Some(first) = self.duplicated.first() else {
            return Ok(());
        };
        if strict {
            return Err(ChunkingError::InvalidChunk {
                index: first.index,
                reason: format!(
                    "duplication {:.0}% exceeds {:.0}%",
                    first.internal_ratio.max(first.external_ratio) * 100.0,
                    first.limit * 100.0
                ),
            });
        }
        self.report.log_downgraded();
        Ok(())
    }
}
