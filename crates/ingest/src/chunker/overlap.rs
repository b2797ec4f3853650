use mdchunk_core::text::{byte_index_at_char, char_len, is_atomic, protected_spans};
use mdchunk_core::{Chunk, ChunkConfig, OverlapDirection, OVERLAP_SEPARATOR};

/// Inject context from neighbouring chunks.
///
/// Context is always taken from the neighbour's own content (never from
/// overlap already injected), starts and ends on word boundaries and never
/// splits a link or URL. Atomic neighbours contribute nothing; oversize
/// chunks receive nothing.
pub fn apply_overlap(mut chunks: Vec<Chunk>, config: &ChunkConfig) -> Vec<Chunk> {
    if !config.overlap_active() || chunks.len() < 2 {
        return chunks;
    }
    let originals: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let t = &config.thresholds;
    let sep_chars = char_len(OVERLAP_SEPARATOR);

    for (i, chunk) in chunks.iter_mut().enumerate() {
        if chunk.is_oversize {
            continue;
        }
        let source = match config.overlap_direction {
            OverlapDirection::Previous if i > 0 => &originals[i - 1],
            OverlapDirection::Next if i + 1 < originals.len() => &originals[i + 1],
            _ => continue,
        };
        if is_atomic(source, t) {
            continue;
        }
        let room = config
            .max_chunk_size
            .saturating_sub(chunk.char_len() + sep_chars);
        let want = config.overlap_size.min(room).min(char_len(source) / 2);
        if want == 0 {
            continue;
        }

        match config.overlap_direction {
            OverlapDirection::Previous => {
                let tail = tail_at_word_boundary(source, want);
                if tail.is_empty() {
                    continue;
                }
                let shift = tail.len() + OVERLAP_SEPARATOR.len();
                chunk.content = format!("{tail}{OVERLAP_SEPARATOR}{}", chunk.content);
                for span in &mut chunk.spans {
                    span.start += shift;
                    span.end += shift;
                }
                mark(chunk, char_len(tail), "prefix");
            }
            OverlapDirection::Next => {
                let head = head_at_word_boundary(source, want);
                if head.is_empty() {
                    continue;
                }
                chunk.content.push_str(OVERLAP_SEPARATOR);
                chunk.content.push_str(head);
                mark(chunk, char_len(head), "suffix");
            }
        }
    }
    chunks
}

fn mark(chunk: &mut Chunk, size: usize, kind: &str) {
    chunk.set_meta("has_overlap", true);
    chunk.set_meta("overlap_size", size);
    chunk.set_meta("overlap_type", kind);
}

/// Last `n` characters of `text`, moved forward to the next word start and
/// past any link or URL it would otherwise cut.
pub fn tail_at_word_boundary(text: &str, n: usize) -> &str {
    let text = text.trim_end();
    let total = char_len(text);
    if n == 0 || total == 0 {
        return "";
    }
    let mut start = byte_index_at_char(text, total.saturating_sub(n));
    if start > 0 && !text[..start].ends_with(char::is_whitespace) {
        start = text[start..]
            .find(char::is_whitespace)
            .map_or(text.len(), |p| start + p);
    }
    if let Some(span) = protected_spans(text)
        .into_iter()
        .find(|s| start > s.start && start < s.end)
    {
        start = span.end;
    }
    text[start..].trim_start()
}

/// First `n` characters of `text`, moved back to the previous word end and
/// before any link or URL it would otherwise cut.
pub fn head_at_word_boundary(text: &str, n: usize) -> &str {
    let text = text.trim_start();
    if n == 0 || text.is_empty() {
        return "";
    }
    let mut end = byte_index_at_char(text, n);
    if end < text.len() && !text[end..].starts_with(char::is_whitespace) {
        end = text[..end].rfind(char::is_whitespace).unwrap_or(0);
    }
    if let Some(span) = protected_spans(text)
        .into_iter()
        .find(|s| end > s.start && end < s.end)
    {
        end = span.start;
    }
    text[..end].trim_end()
}
