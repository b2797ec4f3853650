use std::ops::Range;

use mdchunk_core::text::{atomic_reason, char_len, AtomicReason};
use mdchunk_core::{BlockSpan, Chunk, ChunkConfig, Document, Thresholds};

use super::splitter::split_to_fit;

/// Bring every chunk within the content budget.
///
/// Atomic chunks (code, tables, long dense lines) are never split; when they
/// exceed the maximum they are flagged oversize with a reason instead. A chunk
/// that joins an atomic block with other blocks is first cut around it.
pub fn enforce_sizes(chunks: Vec<Chunk>, doc: &Document, config: &ChunkConfig) -> Vec<Chunk> {
    let budget = config.content_budget();
    let max = config.max_chunk_size;
    let mut out = Vec::with_capacity(chunks.len());

    for (index, mut chunk) in chunks.into_iter().enumerate() {
        let chars = chunk.char_len();
        if chars <= budget {
            out.push(chunk);
            continue;
        }

        if !config.allow_oversize {
            let segments = segments(&chunk, doc, &config.thresholds);
            if segments.len() > 1 {
                out.extend(split_around_atomic(&chunk, doc, segments, index, config));
                continue;
            }
        }

        let reason = atomic_reason(&chunk.content, &config.thresholds)
            .map(|r| r.as_str())
            .or(config.allow_oversize.then_some("allowed"));
        if let Some(reason) = reason {
            if chars > max {
                tracing::debug!(index, chars, max, reason, "Keeping oversize chunk");
                chunk.is_oversize = true;
                chunk.set_meta("oversize_reason", reason);
            }
            out.push(chunk);
            continue;
        }

        let ranges = split_to_fit(&chunk.content, budget, config.effective_min_size());
        tracing::debug!(index, chars, pieces = ranges.len(), "Splitting chunk");
        let total = ranges.len();
        for (i, range) in ranges.into_iter().enumerate() {
            out.push(child(&chunk, doc, range, index, i, total));
        }
    }
    out
}

/// A stretch of a chunk's content and, when it may not be split, why.
struct Segment {
    range: Range<usize>,
    reason: Option<AtomicReason>,
}

/// Cut a chunk at the edges of its atomic blocks. Headers directly in front
/// of an atomic block stay with it as long as the pair is still atomic.
fn segments(chunk: &Chunk, doc: &Document, thresholds: &Thresholds) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut run: Option<Range<usize>> = None;
    let mut headers_only = true;

    for span in &chunk.spans {
        let Some(text) = chunk.content.get(span.start..span.end) else {
            continue;
        };
        if let Some(reason) = atomic_reason(text, thresholds) {
            let mut segment = Segment {
                range: span.start..span.end,
                reason: Some(reason),
            };
            if let Some(r) = run.take() {
                let joined = chunk
                    .content
                    .get(r.start..span.end)
                    .and_then(|t| atomic_reason(t, thresholds));
                match joined.filter(|_| headers_only) {
                    Some(reason) => {
                        segment.range.start = r.start;
                        segment.reason = Some(reason);
                    }
                    None => out.push(Segment {
                        range: r,
                        reason: None,
                    }),
                }
            }
            out.push(segment);
            continue;
        }

        let is_header = doc.block(span.block_id).is_some_and(|b| b.is_header());
        run = match run {
            Some(r) => {
                headers_only &= is_header;
                Some(r.start..span.end)
            }
            None => {
                headers_only = is_header;
                Some(span.start..span.end)
            }
        };
    }
    if let Some(range) = run {
        out.push(Segment {
            range,
            reason: None,
        });
    }
    out
}

fn split_around_atomic(
    chunk: &Chunk,
    doc: &Document,
    segments: Vec<Segment>,
    index: usize,
    config: &ChunkConfig,
) -> Vec<Chunk> {
    let budget = config.content_budget();
    let mut pieces: Vec<(Range<usize>, Option<AtomicReason>)> = Vec::new();
    for segment in segments {
        let text = &chunk.content[segment.range.clone()];
        if segment.reason.is_some() || char_len(text) <= budget {
            pieces.push((segment.range, segment.reason));
            continue;
        }
        let base = segment.range.start;
        pieces.extend(
            split_to_fit(text, budget, config.effective_min_size())
                .into_iter()
                .map(|r| ((r.start + base)..(r.end + base), None)),
        );
    }

    tracing::debug!(index, pieces = pieces.len(), "Cutting chunk around atomic blocks");
    let total = pieces.len();
    pieces
        .into_iter()
        .enumerate()
        .map(|(i, (range, reason))| {
            let mut piece = child(chunk, doc, range, index, i, total);
            if let Some(reason) = reason {
                let chars = piece.char_len();
                if chars > config.max_chunk_size {
                    tracing::debug!(index, chars, reason = reason.as_str(), "Keeping oversize block");
                    piece.is_oversize = true;
                    piece.set_meta("oversize_reason", reason.as_str());
                }
            }
            piece
        })
        .collect()
}

fn child(
    parent: &Chunk,
    doc: &Document,
    range: Range<usize>,
    parent_index: usize,
    split_index: usize,
    split_total: usize,
) -> Chunk {
    let spans: Vec<BlockSpan> = parent
        .spans
        .iter()
        .filter_map(|s| {
            let start = s.start.max(range.start);
            let end = s.end.min(range.end);
            (start < end).then(|| BlockSpan {
                block_id: s.block_id,
                start: start - range.start,
                end: end - range.start,
                block_offset: s.block_offset + (start - s.start),
                partial: s.partial || start > s.start || end < s.end,
            })
        })
        .collect();

    let start_line = line_at(parent, doc, range.start);
    let end_line = line_at(parent, doc, range.end.saturating_sub(1)).max(start_line);
    let mut chunk = Chunk::new(parent.content[range].to_string(), start_line, end_line);
    chunk.spans = spans;
    chunk.metadata = parent.metadata.clone();
    chunk.set_meta("is_split", true);
    chunk.set_meta("split_parent", parent_index);
    chunk.set_meta("split_index", split_index);
    chunk.set_meta("split_total", split_total);
    chunk
}

/// Source line of a byte offset inside a chunk's content.
fn line_at(chunk: &Chunk, doc: &Document, offset: usize) -> usize {
    let span = chunk
        .spans
        .iter()
        .find(|s| offset >= s.start && offset < s.end)
        .or_else(|| chunk.spans.iter().rev().find(|s| s.start <= offset));
    let Some(span) = span else {
        return chunk.start_line;
    };
    let Some(block) = doc.block(span.block_id) else {
        return chunk.start_line;
    };
    let within = span.block_offset + offset.min(span.end).saturating_sub(span.start);
    let newlines = block
        .content
        .get(..within)
        .map_or(0, |prefix| prefix.matches('\n').count());
    block.start_line + newlines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::strategies::Strategy;
    use crate::document::parse_markdown;
    use mdchunk_core::text::char_len;
    use mdchunk_core::StrategyKind;

    fn config(max: usize) -> ChunkConfig {
        ChunkConfig {
            max_chunk_size: max,
            enable_overlap: false,
            ..Default::default()
        }
    }

    fn run(text: &str, config: &ChunkConfig) -> (Document, Vec<Chunk>) {
        let doc = parse_markdown(text);
        let chunks = StrategyKind::Fallback.build(&doc, config).unwrap();
        let chunks = enforce_sizes(chunks, &doc, config);
        (doc, chunks)
    }

    #[test]
    fn small_chunks_pass_through() {
        let (_, chunks) = run("Short text.", &config(100));
        assert_eq!(chunks.len(), 1);
        assert!(!chunks[0].meta_flag("is_split"));
    }

    #[test]
    fn oversized_prose_is_split_with_bookkeeping() {
        let text = "First line of prose here.\nSecond line of prose here.\nThird line of prose here.";
        let (doc, chunks) = run(text, &config(30));
        assert_eq!(chunks.len(), 3);
        for (i, chunk) in chunks.iter().enumerate() {
            assert!(char_len(&chunk.content) <= 30);
            assert_eq!(chunk.meta_usize("split_index"), Some(i));
            assert_eq!(chunk.meta_usize("split_total"), Some(3));
            assert_eq!(chunk.meta_usize("split_parent"), Some(0));
            assert!(chunk.spans.iter().all(|s| s.partial));
            assert_eq!(chunk.start_line, i + 1);
        }
        assert_eq!(doc.blocks.len(), 1);
    }

    #[test]
    fn atomic_code_is_flagged_not_split() {
        let body = "let value = compute_something();\n".repeat(200);
        let text = format!("```rust\n{body}```");
        let (_, chunks) = run(&text, &config(100));
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_oversize);
        assert_eq!(chunks[0].meta_str("oversize_reason"), Some("code_block"));
    }

    #[test]
    fn atomic_within_max_is_not_oversize() {
        let config = ChunkConfig {
            max_chunk_size: 100,
            ..Default::default()
        };
        let text = "```\n".to_string() + &"a".repeat(70) + "\n```";
        let (_, chunks) = run(&text, &config);
        assert_eq!(chunks.len(), 1);
        assert!(!chunks[0].is_oversize);
    }

    #[test]
    fn dense_line_under_heading_is_not_cut() {
        let line = "x".repeat(1500);
        let text = format!("## Data\n\n{line}");
        let (doc, chunks) = run(&text, &config(500));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content, "## Data");
        assert!(!chunks[0].is_oversize);
        assert_eq!(chunks[1].content, line);
        assert!(chunks[1].is_oversize);
        assert_eq!(chunks[1].meta_str("oversize_reason"), Some("long_line"));
        assert_eq!(chunks[1].start_line, 3);
        assert!(chunks[1].spans.iter().all(|s| !s.partial));
        assert_eq!(chunks[1].spans[0].block_id, doc.blocks.len() - 1);
    }

    #[test]
    fn heading_stays_with_oversize_code() {
        let body = "let value = compute_something();\n".repeat(40);
        let text = format!("## Build\n\n```rust\n{body}```");
        let (_, chunks) = run(&text, &config(200));
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.starts_with("## Build"));
        assert!(chunks[0].is_oversize);
        assert_eq!(chunks[0].meta_str("oversize_reason"), Some("code_block"));
    }

    #[test]
    fn prose_around_atomic_block_is_split_separately() {
        let prose = "Plain words keep going here. ".repeat(12);
        let line = "z".repeat(1200);
        let text = format!("{}\n\n{line}\n\nShort tail.", prose.trim_end());
        let (_, chunks) = run(&text, &config(150));
        let dense: Vec<_> = chunks.iter().filter(|c| c.is_oversize).collect();
        assert_eq!(dense.len(), 1);
        assert_eq!(dense[0].content, line);
        for chunk in chunks.iter().filter(|c| !c.is_oversize) {
            assert!(char_len(&chunk.content) <= 150);
            assert!(!chunk.content.contains('z'));
        }
        assert_eq!(chunks.last().map(|c| c.content.as_str()), Some("Short tail."));
    }

    #[test]
    fn allow_oversize_keeps_prose_whole() {
        let config = ChunkConfig {
            allow_oversize: true,
            ..config(20)
        };
        let (_, chunks) = run("This sentence is longer than twenty characters.", &config);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_oversize);
        assert_eq!(chunks[0].meta_str("oversize_reason"), Some("allowed"));
    }

    #[test]
    fn blocks_beyond_budget_stay_separate() {
        let text = "Alpha paragraph text.\n\nBeta paragraph text.";
        let (_, chunks) = run(text, &config(25));
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].spans.len(), 1);
        assert_eq!(chunks[0].spans[0].block_id, 0);
        assert_eq!(chunks[1].spans[0].block_id, 1);
        assert_eq!(chunks[1].start_line, 3);
    }
}
