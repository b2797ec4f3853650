//! Packs whole blocks into chunks. Strategies decide grouping and breaks;
//! the assembler never cuts inside a block.

use mdchunk_core::text::{is_ordered_item, is_task_item, list_item_indent};
use mdchunk_core::{Block, BlockKind, BlockSpan, Chunk, ChunkConfig, Document, StrategyKind};

/// Separator placed between blocks of one chunk.
pub(crate) const BLOCK_SEPARATOR: &str = "\n\n";

/// A paragraph this short (or ending in ':') introduces the block after it.
const INTRO_MAX_CHARS: usize = 300;

/// How a strategy groups blocks into units.
pub(super) struct UnitRules {
    /// Kinds kept together with a short introducing paragraph.
    pub anchors: &'static [BlockKind],
    /// Kinds that always start and end their own chunk.
    pub isolate: &'static [BlockKind],
    /// Start a new chunk before headers at or above this level.
    pub header_break_level: Option<u8>,
}

/// Run the shared grouping loop for one strategy.
pub(super) fn assemble(
    doc: &Document,
    config: &ChunkConfig,
    strategy: StrategyKind,
    rules: &UnitRules,
) -> Vec<Chunk> {
    let mut asm = ChunkAssembler::new(doc, strategy, config.content_budget());
    let blocks = &doc.blocks;
    let mut i = 0;

    while i < blocks.len() {
        let block = &blocks[i];
        let next = blocks.get(i + 1);

        if let Some(next) = next.filter(|n| rules.anchors.contains(&n.kind)) {
            if introduces(block, next, asm.budget) {
                let isolated = rules.isolate.contains(&next.kind);
                asm.push_unit(&[block, next], isolated, isolated);
                i += 2;
                continue;
            }
        }

        if rules.isolate.contains(&block.kind) {
            asm.push_unit(&[block], true, true);
        } else if let (BlockKind::Header, Some(limit)) = (block.kind, rules.header_break_level) {
            let breaks = block.header_level.is_some_and(|level| level <= limit);
            asm.push_unit(&[block], breaks, false);
        } else {
            asm.push_unit(&[block], false, false);
        }
        i += 1;
    }
    asm.finish()
}

fn introduces(block: &Block, next: &Block, budget: usize) -> bool {
    if block.kind != BlockKind::Paragraph {
        return false;
    }
    let chars = block.char_len();
    let short = chars <= INTRO_MAX_CHARS || block.content.trim_end().ends_with(':');
    short && chars + BLOCK_SEPARATOR.len() + next.char_len() <= budget
}

pub(crate) struct ChunkAssembler<'a> {
    doc: &'a Document,
    strategy: StrategyKind,
    budget: usize,
    pending: Vec<&'a Block>,
    force_break: bool,
    chunks: Vec<Chunk>,
}

impl<'a> ChunkAssembler<'a> {
    pub(crate) fn new(doc: &'a Document, strategy: StrategyKind, budget: usize) -> Self {
        Self {
            doc,
            strategy,
            budget,
            pending: Vec::new(),
            force_break: false,
            chunks: Vec::new(),
        }
    }

    /// Append a unit of blocks that must land in the same chunk.
    ///
    /// Headers waiting in `pending` are never flushed on their own; they
    /// travel with whatever follows them.
    pub(crate) fn push_unit(&mut self, unit: &[&'a Block], break_before: bool, break_after: bool) {
        if unit.is_empty() {
            return;
        }
        let has_body = self.pending.iter().any(|b| !b.is_header());
        if has_body {
            let unit_chars = joined_len(unit);
            let over = self.pending_len() + BLOCK_SEPARATOR.len() + unit_chars > self.budget;
            if break_before || self.force_break || over {
                self.flush();
            }
        }
        self.pending.extend_from_slice(unit);
        self.force_break = break_after;
    }

    fn pending_len(&self) -> usize {
        joined_len(&self.pending)
    }

    /// Emit pending blocks, keeping trailing headers back for the next chunk.
    fn flush(&mut self) {
        let body_end = self
            .pending
            .iter()
            .rposition(|b| !b.is_header())
            .map_or(0, |i| i + 1);
        if body_end == 0 {
            return;
        }
        let carried = self.pending.split_off(body_end);
        let blocks = std::mem::replace(&mut self.pending, carried);
        self.chunks.push(build_chunk(self.doc, &blocks, self.strategy));
    }

    pub(crate) fn finish(mut self) -> Vec<Chunk> {
        self.flush();
        if !self.pending.is_empty() {
            // Document ends in headers only.
            let blocks = std::mem::take(&mut self.pending);
            self.chunks.push(build_chunk(self.doc, &blocks, self.strategy));
        }
        self.chunks
    }
}

fn joined_len(blocks: &[&Block]) -> usize {
    let chars: usize = blocks.iter().map(|b| b.char_len()).sum();
    chars + BLOCK_SEPARATOR.len() * blocks.len().saturating_sub(1)
}

/// Join blocks into a chunk and derive its descriptive metadata.
pub(crate) fn build_chunk(doc: &Document, blocks: &[&Block], strategy: StrategyKind) -> Chunk {
    let mut content = String::new();
    let mut spans = Vec::with_capacity(blocks.len());
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            content.push_str(BLOCK_SEPARATOR);
        }
        let start = content.len();
        content.push_str(&block.content);
        spans.push(BlockSpan::full(block.id, start, content.len()));
    }

    let start_line = blocks.first().map_or(1, |b| b.start_line);
    let end_line = blocks.last().map_or(start_line, |b| b.end_line);
    let mut chunk = Chunk::new(content, start_line, end_line);
    chunk.spans = spans;

    chunk.set_meta("strategy", strategy.as_str());
    chunk.set_meta("content_type", content_type(blocks));

    let section = blocks.iter().find_map(|b| b.section);
    let path = section.map(|s| doc.header_path(s)).unwrap_or_default();
    if let Some(title) = path.last() {
        chunk.set_meta("section_title", title.as_str());
    }
    chunk.set_meta("header_path", path);

    if let Some(lang) = blocks.iter().find_map(|b| b.language.as_deref()) {
        chunk.set_meta("language", lang);
    }
    let has = |kind: BlockKind| blocks.iter().any(|b| b.kind == kind);
    chunk.set_meta("has_code", has(BlockKind::Code));
    chunk.set_meta("has_table", has(BlockKind::Table));
    chunk.set_meta("has_list", has(BlockKind::List));
    if let Some(list) = blocks.iter().find(|b| b.kind == BlockKind::List) {
        chunk.set_meta("list_type", list_type(&list.content));
    }
    chunk.set_meta("block_count", blocks.len());
    chunk
}

fn content_type(blocks: &[&Block]) -> &'static str {
    let mut kinds = blocks
        .iter()
        .filter(|b| !b.is_header())
        .map(|b| match b.kind {
            BlockKind::Code => "code",
            BlockKind::Table => "table",
            BlockKind::List => "list",
            BlockKind::Header | BlockKind::Paragraph => "text",
        });
    match kinds.next() {
        None => "text",
        Some(first) if kinds.all(|k| k == first) => first,
        Some(_) => "mixed",
    }
}

fn list_type(content: &str) -> &'static str {
    let first_item = content.lines().find(|l| list_item_indent(l).is_some());
    if content.lines().any(is_task_item) {
        "task"
    } else if first_item.is_some_and(is_ordered_item) {
        "ordered"
    } else {
        "unordered"
    }
}
