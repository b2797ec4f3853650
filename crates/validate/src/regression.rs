//! Named checks for defect classes seen in chunked output before: glued
//! sentences, fragment boundaries, lost list markers, size and duplication
//! violations.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use mdchunk_core::text::{char_len, is_atomic, is_fence_line, is_list_item};
use mdchunk_core::{BlockKind, Chunk, ChunkConfig, ChunkingError, Document, Result};

use crate::{check_overlap_accuracy, validate_duplication, BlockTracker};

static GLUED_SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{Ll}{2}[.!?]\p{Lu}\p{Ll}").expect("Invalid regex"));

/// Short words that legitimately open or close a chunk.
const SHORT_WORDS: &[&str] = &[
    "a", "i", "o", "am", "an", "as", "at", "be", "by", "do", "eg", "go", "he", "id", "ie", "if",
    "in", "is", "it", "me", "my", "no", "of", "ok", "on", "or", "re", "so", "to", "up", "us", "vs",
    "we", "а", "в", "и", "к", "о", "с", "у", "я", "бы", "вы", "до", "же", "за", "из", "ли", "мы",
    "на", "не", "он", "от", "по", "то",
];

/// Characters of a list item used to find it again in the output.
const LIST_KEY_CHARS: usize = 30;

pub struct RegressionInput<'a> {
    pub document: &'a Document,
    pub chunks: &'a [Chunk],
    pub config: &'a ChunkConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub name: String,
    pub passed: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
}

impl CheckOutcome {
    fn pass(name: &str, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: message.into(),
            chunk_index: None,
        }
    }

    fn fail(name: &str, chunk_index: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: message.into(),
            chunk_index,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegressionReport {
    pub checks: Vec<CheckOutcome>,
}

impl RegressionReport {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.checks.iter().filter(|c| !c.passed)
    }

    pub fn check(&self, name: &str) -> Option<&CheckOutcome> {
        self.checks.iter().find(|c| c.name == name)
    }

    pub fn raise_if_invalid(&self, strict: bool) -> Result<()> {
        let Some(first) = self.failures().next() else {
            return Ok(());
        };
        if strict {
            return Err(ChunkingError::InvalidChunk {
                index: first.chunk_index.unwrap_or(0),
                reason: format!("{}: {}", first.name, first.message),
            });
        }
        for failure in self.failures() {
            tracing::warn!(check = %failure.name, "{}", failure.message);
        }
        Ok(())
    }
}

/// Run every check against one chunking run.
pub fn run_regression_suite(input: &RegressionInput<'_>) -> RegressionReport {
    let leaves: Vec<&Chunk> = input.chunks.iter().filter(|c| c.is_leaf()).collect();
    let report = RegressionReport {
        checks: vec![
            non_empty_chunks(&leaves),
            no_word_concatenation(&leaves),
            no_fragment_boundaries(input.document, &leaves),
            list_markers_preserved(input.document, &leaves),
            size_limits(&leaves, input.config),
            block_coverage(input),
            duplication_limits(input),
            overlap_accuracy(input),
            line_order(&leaves),
        ],
    };
    tracing::debug!(
        checks = report.checks.len(),
        failed = report.failures().count(),
        "Regression suite finished"
    );
    report
}

fn non_empty_chunks(chunks: &[&Chunk]) -> CheckOutcome {
    const NAME: &str = "non_empty_chunks";
    if chunks.is_empty() {
        return CheckOutcome::fail(NAME, None, "no chunks produced");
    }
    match chunks.iter().position(|c| c.content.trim().is_empty()) {
        Some(i) => CheckOutcome::fail(NAME, Some(i), format!("chunk {i} is empty")),
        None => CheckOutcome::pass(NAME, format!("{} chunks", chunks.len())),
    }
}

fn no_word_concatenation(chunks: &[&Chunk]) -> CheckOutcome {
    const NAME: &str = "no_word_concatenation";
    for (i, chunk) in chunks.iter().enumerate() {
        if let Some(token) = glued_token(&chunk.content) {
            return CheckOutcome::fail(NAME, Some(i), format!("chunk {i}: glued sentences in {token:?}"));
        }
    }
    CheckOutcome::pass(NAME, "no glued sentences")
}

fn glued_token(content: &str) -> Option<&str> {
    let mut in_fence = false;
    for line in content.lines() {
        if is_fence_line(line) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        let found = line
            .split_whitespace()
            .filter(|t| !is_opaque_token(t))
            .find(|t| GLUED_SENTENCE.is_match(t));
        if found.is_some() {
            return found;
        }
    }
    None
}

fn is_opaque_token(token: &str) -> bool {
    token.contains("://")
        || token.starts_with("www.")
        || token.contains('@')
        || token.contains('`')
        || token.contains("](")
}

fn no_fragment_boundaries(doc: &Document, chunks: &[&Chunk]) -> CheckOutcome {
    const NAME: &str = "no_fragment_boundaries";
    for (i, chunk) in chunks.iter().enumerate() {
        let content = chunk.content.trim();
        if starts_mid_block(chunk) {
            let starts_with_punct = content.starts_with([',', ';', ':', ')', ']', '}', '.']);
            let first = content.split_whitespace().next().unwrap_or("");
            if starts_with_punct || is_fragment(first) {
                return CheckOutcome::fail(NAME, Some(i), format!("chunk {i} starts with fragment {first:?}"));
            }
        }
        if ends_mid_block(doc, chunk) {
            let last = content.split_whitespace().next_back().unwrap_or("");
            if is_fragment(last) {
                return CheckOutcome::fail(NAME, Some(i), format!("chunk {i} ends with fragment {last:?}"));
            }
        }
    }
    CheckOutcome::pass(NAME, "boundaries fall on whole words")
}

fn starts_mid_block(chunk: &Chunk) -> bool {
    chunk.meta_str("overlap_type") == Some("prefix")
        || chunk
            .spans
            .first()
            .is_some_and(|s| s.partial && s.block_offset > 0)
}

fn ends_mid_block(doc: &Document, chunk: &Chunk) -> bool {
    chunk.meta_str("overlap_type") == Some("suffix")
        || chunk.spans.last().is_some_and(|s| {
            s.partial
                && doc
                    .block(s.block_id)
                    .is_some_and(|b| s.block_offset + (s.end - s.start) < b.content.len())
        })
}

/// A one- or two-letter lowercase piece that is not a real short word.
/// Markers such as `[x]` or `1.` are not words and never count.
fn is_fragment(token: &str) -> bool {
    let word = token.trim_end_matches(|c: char| !c.is_alphanumeric());
    let chars = char_len(word);
    chars > 0
        && chars <= 2
        && word.chars().all(|c| c.is_alphabetic() && c.is_lowercase())
        && !SHORT_WORDS.contains(&word)
}

fn list_markers_preserved(doc: &Document, chunks: &[&Chunk]) -> CheckOutcome {
    const NAME: &str = "list_markers_preserved";
    let mut items = 0;
    let mut missing: Vec<String> = Vec::new();
    for block in doc.blocks.iter().filter(|b| b.kind == BlockKind::List) {
        for line in block.content.lines().filter(|l| is_list_item(l)) {
            items += 1;
            let key: String = line.trim().chars().take(LIST_KEY_CHARS).collect();
            if !chunks.iter().any(|c| c.content.contains(&key)) {
                missing.push(key);
            }
        }
    }
    if missing.is_empty() {
        CheckOutcome::pass(NAME, format!("{items} list items intact"))
    } else {
        CheckOutcome::fail(
            NAME,
            None,
            format!("{} of {items} list items lost their marker, e.g. {:?}", missing.len(), missing[0]),
        )
    }
}

fn size_limits(chunks: &[&Chunk], config: &ChunkConfig) -> CheckOutcome {
    const NAME: &str = "size_limits";
    let max = config.max_chunk_size;
    for (i, chunk) in chunks.iter().enumerate() {
        let chars = chunk.char_len();
        if !chunk.is_oversize && chars > max {
            return CheckOutcome::fail(NAME, Some(i), format!("chunk {i} has {chars} chars, max {max}"));
        }
        if chunk.is_oversize && !config.allow_oversize && !is_atomic(&chunk.content, &config.thresholds) {
            return CheckOutcome::fail(NAME, Some(i), format!("chunk {i} is oversize without atomic content"));
        }
    }
    CheckOutcome::pass(NAME, format!("all chunks within {max} chars or atomic"))
}

fn block_coverage(input: &RegressionInput<'_>) -> CheckOutcome {
    const NAME: &str = "block_coverage";
    let mut tracker = BlockTracker::new(input.document);
    tracker.record_all(input.chunks);
    let coverage = tracker.validate(input.config.thresholds.max_duplication);
    if coverage.missing_blocks.is_empty() {
        CheckOutcome::pass(NAME, format!("{} blocks covered", coverage.total_blocks))
    } else {
        CheckOutcome::fail(
            NAME,
            None,
            format!("blocks missing from output: {:?}", coverage.missing_blocks),
        )
    }
}

fn duplication_limits(input: &RegressionInput<'_>) -> CheckOutcome {
    const NAME: &str = "duplication_limits";
    let t = &input.config.thresholds;
    let mut tracker = BlockTracker::new(input.document);
    tracker.record_all(input.chunks);
    let coverage = tracker.validate(t.max_duplication);
    if let Some(id) = coverage.over_duplicated.first() {
        return CheckOutcome::fail(
            NAME,
            None,
            format!("block {id} spans more than {} consecutive chunks", t.max_duplication),
        );
    }
    let dedup = validate_duplication(input.chunks, t);
    match dedup.duplicated.first() {
        Some(d) => CheckOutcome::fail(
            NAME,
            Some(d.index),
            format!(
                "chunk {} duplicates {:.0}% of its content",
                d.index,
                d.internal_ratio.max(d.external_ratio) * 100.0
            ),
        ),
        None => CheckOutcome::pass(NAME, "duplication within limits"),
    }
}

fn overlap_accuracy(input: &RegressionInput<'_>) -> CheckOutcome {
    const NAME: &str = "overlap_accuracy";
    let mismatches = check_overlap_accuracy(input.chunks, &input.config.thresholds);
    match mismatches.first() {
        Some(m) => CheckOutcome::fail(
            NAME,
            Some(m.index),
            format!(
                "chunk {} declares {} overlap chars but shares {}",
                m.index, m.declared, m.actual
            ),
        ),
        None => CheckOutcome::pass(NAME, "declared overlap matches shared text"),
    }
}

fn line_order(chunks: &[&Chunk]) -> CheckOutcome {
    const NAME: &str = "line_order";
    for (i, chunk) in chunks.iter().enumerate() {
        if chunk.start_line > chunk.end_line {
            return CheckOutcome::fail(NAME, Some(i), format!("chunk {i} ends before it starts"));
        }
        if i > 0 && chunk.start_line < chunks[i - 1].start_line {
            return CheckOutcome::fail(NAME, Some(i), format!("chunk {i} starts before chunk {}", i - 1));
        }
    }
    CheckOutcome::pass(NAME, "chunks follow document order")
}
