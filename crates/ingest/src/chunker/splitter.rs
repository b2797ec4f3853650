//! Byte-range splitting cascade: paragraphs, list items, sentences, words,
//! then a hard cut. Pieces are trimmed sub-ranges of the input, so
//! concatenating them reproduces every non-whitespace character in order.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use mdchunk_core::text::{
    byte_index_at_char, char_len, inside_protected, list_item_indent, protected_spans, trim_range,
};

static BLANK_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n\s*").expect("Invalid regex"));

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[.!?]+["'\u{201D}\u{2019})\]]*\s+"#).expect("Invalid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Paragraph,
    ListItem,
    Sentence,
    Word,
}

impl Level {
    fn next(self) -> Level {
        match self {
            Level::Paragraph => Level::ListItem,
            Level::ListItem => Level::Sentence,
            Level::Sentence | Level::Word => Level::Word,
        }
    }
}

struct Splitter<'a> {
    text: &'a str,
    budget: usize,
    min_size: usize,
    protected: Vec<Range<usize>>,
    out: Vec<Range<usize>>,
}

/// Split `text` into trimmed byte ranges of at most `budget` characters.
///
/// `min_size` keeps greedy packing from leaving tiny pieces behind: a short
/// buffer is re-split together with an oversized neighbour instead of
/// being emitted alone.
pub fn split_to_fit(text: &str, budget: usize, min_size: usize) -> Vec<Range<usize>> {
    let mut splitter = Splitter {
        text,
        budget: budget.max(1),
        min_size,
        protected: protected_spans(text),
        out: Vec::new(),
    };
    splitter.split(0..text.len(), Level::Paragraph);
    splitter.out
}

impl Splitter<'_> {
    fn len(&self, range: &Range<usize>) -> usize {
        let r = trim_range(self.text, range.clone());
        char_len(&self.text[r])
    }

    fn fits(&self, range: &Range<usize>) -> bool {
        self.len(range) <= self.budget
    }

    fn emit(&mut self, range: Range<usize>) {
        let r = trim_range(self.text, range);
        if !r.is_empty() {
            self.out.push(r);
        }
    }

    fn split(&mut self, range: Range<usize>, level: Level) {
        let range = trim_range(self.text, range);
        if range.is_empty() {
            return;
        }
        if self.fits(&range) {
            self.out.push(range);
            return;
        }
        if level == Level::Word {
            self.split_words(range);
            return;
        }

        let bounds = self.boundaries(&range, level);
        if bounds.is_empty() {
            self.split(range, level.next());
            return;
        }

        let starts = std::iter::once(range.start).chain(bounds.iter().copied());
        let ends = bounds.iter().copied().chain(std::iter::once(range.end));
        let mut current: Option<Range<usize>> = None;

        for segment in starts.zip(ends).map(|(s, e)| s..e) {
            if let Some(cur) = &current {
                let merged = cur.start..segment.end;
                if self.fits(&merged) {
                    current = Some(merged);
                    continue;
                }
                if !self.fits(&segment) && self.len(cur) < self.min_size {
                    // A short buffer next to an oversized segment: split both together.
                    let merged = cur.start..segment.end;
                    current = None;
                    self.split(merged, level.next());
                    continue;
                }
                let done = cur.clone();
                self.emit(done);
                current = None;
            }
            if self.fits(&segment) {
                current = Some(segment);
            } else {
                self.split(segment, level.next());
            }
        }
        if let Some(cur) = current {
            self.emit(cur);
        }
    }

    /// Absolute cut positions strictly inside `range` for one cascade level.
    fn boundaries(&self, range: &Range<usize>, level: Level) -> Vec<usize> {
        let slice = &self.text[range.clone()];
        let offset = range.start;
        let inner = |p: &usize| *p > range.start && *p < range.end;
        match level {
            Level::Paragraph => BLANK_LINE
                .find_iter(slice)
                .map(|m| offset + m.end())
                .filter(inner)
                .collect(),
            Level::ListItem => {
                let mut items: Vec<(usize, usize)> = Vec::new();
                let mut pos = offset;
                for line in slice.split_inclusive('\n') {
                    if let Some(indent) = list_item_indent(line) {
                        items.push((pos, indent));
                    }
                    pos += line.len();
                }
                let Some(top) = items.iter().map(|(_, indent)| *indent).min() else {
                    return Vec::new();
                };
                items
                    .into_iter()
                    .filter(|(_, indent)| *indent == top)
                    .map(|(p, _)| p)
                    .filter(inner)
                    .collect()
            }
            Level::Sentence => SENTENCE_END
                .find_iter(slice)
                .map(|m| offset + m.end())
                .filter(inner)
                .filter(|p| !inside_protected(*p, &self.protected))
                .collect(),
            Level::Word => Vec::new(),
        }
    }

    /// Last resort: break at whitespace before the limit, never inside a
    /// link or URL; cut hard when no such position exists.
    fn split_words(&mut self, range: Range<usize>) {
        let mut start = range.start;
        while start < range.end {
            let rest = trim_range(self.text, start..range.end);
            if rest.is_empty() {
                break;
            }
            start = rest.start;
            if self.fits(&rest) {
                self.out.push(rest);
                break;
            }
            let limit = start + byte_index_at_char(&self.text[start..range.end], self.budget);
            let end = self.word_cut(start, limit, range.end).unwrap_or(limit);
            self.emit(start..end);
            start = end;
        }
    }

    fn word_cut(&self, start: usize, limit: usize, end: usize) -> Option<usize> {
        let window_end = self.text[limit..end]
            .chars()
            .next()
            .map_or(limit, |c| limit + c.len_utf8());
        let at_space = self.text[start..window_end]
            .char_indices()
            .rev()
            .map(|(i, c)| (start + i, c))
            .find(|(p, c)| *p > start && c.is_whitespace() && !inside_protected(*p, &self.protected))
            .map(|(p, _)| p);
        let at_span = self
            .protected
            .iter()
            .map(|s| s.start)
            .filter(|p| *p > start && *p <= limit)
            .max();
        at_space.max(at_span)
    }
}
