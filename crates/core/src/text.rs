//! Text predicates shared by strategies, the size enforcer and validators.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::Thresholds;

static LINK_OR_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!?\[[^\]\n]*\]\([^)\s]*(?:\s+[^)]*)?\)|<https?://[^>\s]+>|https?://[^\s<>()\]]+|www\.[^\s<>()\]]+")
        .expect("Invalid regex")
});

static LIST_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)(?:[-*+]|\d{1,9}[.)])(?:\s+|$)").expect("Invalid regex")
});

static TASK_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+]\s+\[[ xX]\]").expect("Invalid regex"));

/// Why a span of content may not be split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtomicReason {
    CodeBlock,
    Table,
    LongLine,
}

impl AtomicReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AtomicReason::CodeBlock => "code_block",
            AtomicReason::Table => "table",
            AtomicReason::LongLine => "long_line",
        }
    }
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

pub fn is_fence_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

pub fn has_code_fence(text: &str) -> bool {
    text.lines().any(is_fence_line)
}

pub fn pipe_line_count(text: &str) -> usize {
    text.lines().filter(|l| l.contains('|')).count()
}

/// A single line far longer than usual with almost no spaces (minified data, base64, ...).
pub fn is_long_dense_line(text: &str, thresholds: &Thresholds) -> bool {
    let trimmed = text.trim();
    if trimmed.contains('\n') {
        return false;
    }
    let chars = char_len(trimmed);
    if chars <= thresholds.atomic_line_chars {
        return false;
    }
    let spaces = trimmed.chars().filter(|c| *c == ' ').count();
    (spaces as f64 / chars as f64) < thresholds.atomic_space_ratio
}

pub fn atomic_reason(text: &str, thresholds: &Thresholds) -> Option<AtomicReason> {
    if has_code_fence(text) {
        Some(AtomicReason::CodeBlock)
    } else if pipe_line_count(text) >= 3 {
        Some(AtomicReason::Table)
    } else if is_long_dense_line(text, thresholds) {
        Some(AtomicReason::LongLine)
    } else {
        None
    }
}

pub fn is_atomic(text: &str, thresholds: &Thresholds) -> bool {
    atomic_reason(text, thresholds).is_some()
}

/// Byte ranges of markdown links, images and bare URLs, sorted and non-overlapping.
pub fn protected_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans: Vec<Range<usize>> = Vec::new();
    for m in LINK_OR_URL.find_iter(text) {
        match spans.last_mut() {
            Some(last) if m.start() <= last.end => last.end = last.end.max(m.end()),
            _ => spans.push(m.range()),
        }
    }
    spans
}

/// Whether a cut at byte `pos` would land strictly inside a protected span.
pub fn inside_protected(pos: usize, spans: &[Range<usize>]) -> bool {
    spans.iter().any(|s| pos > s.start && pos < s.end)
}

/// Byte index of the `n`-th char, or `text.len()` when shorter.
pub fn byte_index_at_char(text: &str, n: usize) -> usize {
    text.char_indices().nth(n).map_or(text.len(), |(i, _)| i)
}

/// Indentation width of a list item line, `None` for other lines.
pub fn list_item_indent(line: &str) -> Option<usize> {
    LIST_ITEM
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().chars().map(|c| if c == '\t' { 4 } else { 1 }).sum())
}

pub fn is_list_item(line: &str) -> bool {
    LIST_ITEM.is_match(line)
}

pub fn is_task_item(line: &str) -> bool {
    TASK_ITEM.is_match(line)
}

pub fn is_ordered_item(line: &str) -> bool {
    line.trim_start()
        .split_once(|c: char| c == '.' || c == ')')
        .is_some_and(|(n, _)| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// Shrink a byte range so it neither starts nor ends on whitespace.
pub fn trim_range(text: &str, range: Range<usize>) -> Range<usize> {
    let slice = &text[range.clone()];
    let lead = slice.len() - slice.trim_start().len();
    let trail = slice.len() - slice.trim_end().len();
    if lead == slice.len() {
        return range.start..range.start;
    }
    (range.start + lead)..(range.end - trail)
}
