use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};
use sha2::{Digest, Sha256};

use mdchunk_core::text::trim_range;
use mdchunk_core::{Block, BlockKind, Document, Section, SectionId};

/// Top-level construct found by the markdown parser, before line/section resolution.
struct RawBlock {
    kind: BlockKind,
    start: usize,
    end: usize,
    level: Option<u8>,
    language: Option<String>,
}

impl RawBlock {
    fn from_tag(tag: &Tag<'_>, start: usize, end: usize) -> Self {
        let (kind, level, language) = match tag {
            Tag::Heading { level, .. } => (BlockKind::Header, Some(*level as u8), None),
            Tag::List(_) => (BlockKind::List, None, None),
            Tag::Table(_) => (BlockKind::Table, None, None),
            Tag::CodeBlock(CodeBlockKind::Fenced(info)) => {
                let lang = info.split_whitespace().next().unwrap_or("").to_string();
                (BlockKind::Code, None, Some(lang).filter(|l| !l.is_empty()))
            }
            Tag::CodeBlock(CodeBlockKind::Indented) => (BlockKind::Code, None, None),
            _ => (BlockKind::Paragraph, None, None),
        };
        Self {
            kind,
            start,
            end,
            level,
            language,
        }
    }
}

/// Split markdown into top-level blocks with line ranges, hashes and section links.
pub fn parse_markdown(text: &str) -> Document {
    let options =
        Options::ENABLE_TABLES | Options::ENABLE_TASKLISTS | Options::ENABLE_STRIKETHROUGH;

    let mut raw: Vec<RawBlock> = Vec::new();
    let mut depth = 0usize;
    for (event, range) in Parser::new_ext(text, options).into_offset_iter() {
        match event {
            Event::Start(tag) => {
                if depth == 0 {
                    raw.push(RawBlock::from_tag(&tag, range.start, range.end));
                }
                depth += 1;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Rule | Event::Html(_) if depth == 0 => raw.push(RawBlock {
                kind: BlockKind::Paragraph,
                start: range.start,
                end: range.end,
                level: None,
                language: None,
            }),
            _ => {}
        }
    }
    let raw = fill_gaps(text, raw);

    let line_starts = line_starts(text);
    let mut blocks: Vec<Block> = Vec::with_capacity(raw.len());
    let mut sections: Vec<Section> = Vec::new();
    let mut open_sections: Vec<SectionId> = Vec::new();

    for rb in raw {
        let content = text[rb.start..rb.end].trim_end();
        if content.trim().is_empty() {
            continue;
        }
        let id = blocks.len();
        let end = rb.start + content.len();

        if let (BlockKind::Header, Some(level)) = (rb.kind, rb.level) {
            while open_sections
                .last()
                .is_some_and(|&s| sections[s].level >= level)
            {
                open_sections.pop();
            }
            let section_id = sections.len();
            sections.push(Section {
                id: section_id,
                title: header_title(content),
                level,
                header_block: id,
                parent: open_sections.last().copied(),
            });
            open_sections.push(section_id);
        }

        blocks.push(Block {
            id,
            kind: rb.kind,
            content: content.to_string(),
            start_offset: rb.start,
            end_offset: end,
            start_line: line_at(&line_starts, rb.start),
            end_line: line_at(&line_starts, end.saturating_sub(1).max(rb.start)),
            header_level: rb.level,
            section: open_sections.last().copied(),
            language: rb.language,
            content_hash: content_hash(content),
        });
    }

    Document {
        text: text.to_string(),
        blocks,
        sections,
    }
}

/// Keep source text the parser emits no events for (link reference
/// definitions) as paragraph blocks.
fn fill_gaps(text: &str, raw: Vec<RawBlock>) -> Vec<RawBlock> {
    let mut out = Vec::with_capacity(raw.len());
    let mut cursor = 0;
    for rb in raw {
        if rb.start > cursor {
            push_gap(text, cursor..rb.start, &mut out);
        }
        cursor = cursor.max(rb.end);
        out.push(rb);
    }
    push_gap(text, cursor..text.len(), &mut out);
    out
}

fn push_gap(text: &str, range: Range<usize>, out: &mut Vec<RawBlock>) {
    let range = trim_range(text, range);
    if range.is_empty() {
        return;
    }
    tracing::trace!(start = range.start, end = range.end, "Keeping unparsed source text");
    out.push(RawBlock {
        kind: BlockKind::Paragraph,
        start: range.start,
        end: range.end,
        level: None,
        language: None,
    });
}

/// Heading text without ATX markers or setext underline.
pub fn header_title(content: &str) -> String {
    content
        .lines()
        .next()
        .unwrap_or("")
        .trim()
        .trim_start_matches('#')
        .trim_end_matches('#')
        .trim()
        .to_string()
}

fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let hex = format!("{digest:x}");
    hex[..16].to_string()
}

fn line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}

/// 1-based line containing byte `offset`.
fn line_at(starts: &[usize], offset: usize) -> usize {
    starts.partition_point(|&s| s <= offset).max(1)
}
