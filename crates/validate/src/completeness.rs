use serde::{Deserialize, Serialize};

use mdchunk_core::text::{byte_index_at_char, char_len};
use mdchunk_core::{Chunk, ChunkingError, Result, Thresholds};

use crate::ValidationResult;

/// Character and line coverage of the output against the input text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletenessResult {
    /// Non-whitespace characters of the input.
    pub input_chars: usize,
    /// Non-whitespace output characters with declared overlap removed.
    pub output_chars: usize,
    pub overlap_chars: usize,
    /// `output_chars / input_chars`.
    pub coverage: f64,
    /// Uncovered line ranges (1-based, inclusive) longer than the allowed gap.
    pub gaps: Vec<(usize, usize)>,
    #[serde(flatten)]
    pub report: ValidationResult,
}

/// Compare output against input.
///
/// Characters are counted without whitespace: block separators and trailing
/// newlines are layout, not content. Declared overlap is subtracted.
pub fn validate_completeness(input: &str, chunks: &[Chunk], t: &Thresholds) -> CompletenessResult {
    let mut report = ValidationResult::new();
    let leaves: Vec<&Chunk> = chunks.iter().filter(|c| c.is_leaf()).collect();

    let input_chars = visible_len(input);
    let raw_chars: usize = leaves.iter().map(|c| visible_len(&c.content)).sum();
    let overlap_chars: usize = leaves.iter().map(|c| visible_len(overlap_text(c))).sum();
    let output_chars = raw_chars.saturating_sub(overlap_chars);
    let coverage = if input_chars == 0 {
        1.0
    } else {
        output_chars as f64 / input_chars as f64
    };
    if (1.0 - coverage).abs() > t.coverage_tolerance {
        report.error(
            "char_coverage",
            format!(
                "output covers {:.1}% of input characters ({output_chars}/{input_chars})",
                coverage * 100.0
            ),
        );
    }

    let gaps = line_gaps(input, &leaves, t.max_line_gap, &mut report);
    for (start, end) in &gaps {
        report.error(
            "line_coverage",
            format!("lines {start}-{end} are not covered by any chunk"),
        );
    }

    CompletenessResult {
        input_chars,
        output_chars,
        overlap_chars,
        coverage,
        gaps,
        report,
    }
}

fn visible_len(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}

/// The injected part of a chunk's content, empty when none was declared.
fn overlap_text(chunk: &Chunk) -> &str {
    let n = chunk.declared_overlap();
    if n == 0 {
        return "";
    }
    let content = chunk.content.as_str();
    if chunk.meta_str("overlap_type") == Some("suffix") {
        let skip = char_len(content).saturating_sub(n);
        &content[byte_index_at_char(content, skip)..]
    } else {
        &content[..byte_index_at_char(content, n)]
    }
}

/// Runs of uncovered lines. Runs with more than `max_gap` non-blank lines
/// are returned; shorter runs with content become warnings.
fn line_gaps(
    input: &str,
    chunks: &[&Chunk],
    max_gap: usize,
    report: &mut ValidationResult,
) -> Vec<(usize, usize)> {
    let lines: Vec<&str> = input.lines().collect();
    let mut covered = vec![false; lines.len() + 1];
    for chunk in chunks {
        let end = chunk.end_line.min(lines.len());
        for line in chunk.start_line.max(1)..=end {
            covered[line] = true;
        }
    }

    let mut gaps = Vec::new();
    let mut run: Option<(usize, usize, usize)> = None; // (first, last, non-blank)
    for (i, text) in lines.iter().enumerate() {
        let line = i + 1;
        if covered[line] {
            if let Some(r) = run.take() {
                close_run(r, max_gap, &mut gaps, report);
            }
            continue;
        }
        if text.trim().is_empty() && run.is_none() {
            continue;
        }
        let non_blank = usize::from(!text.trim().is_empty());
        run = Some(match run {
            Some((first, _, n)) => (first, line, n + non_blank),
            None => (line, line, non_blank),
        });
    }
    if let Some(r) = run {
        close_run(r, max_gap, &mut gaps, report);
    }
    gaps
}

fn close_run(
    (first, last, non_blank): (usize, usize, usize),
    max_gap: usize,
    gaps: &mut Vec<(usize, usize)>,
    report: &mut ValidationResult,
) {
    if non_blank > max_gap {
        gaps.push((first, last));
    } else if non_blank > 0 {
        report.warn(
            "line_coverage",
            format!("{non_blank} line(s) at {first}-{last} not covered by any chunk"),
        );
    }
}

impl CompletenessResult {
    pub fn is_valid(&self) -> bool {
        self.report.valid
    }

    pub fn raise_if_invalid(&self, strict: bool) -> Result<()> {
        if self.report.valid {
            return Ok(());
        }
        if !strict {
            self.report.log_downgraded();
            return Ok(());
        }
        if !self.gaps.is_empty() {
            return Err(ChunkingError::IncompleteCoverage {
                coverage: self.coverage,
                gaps: self.gaps.clone(),
            });
        }
        Err(ChunkingError::DataLoss {
            message: format!(
                "character coverage {:.1}% outside tolerance",
                self.coverage * 100.0
            ),
        })
    }
}
