use serde::{Deserialize, Serialize};

/// Index of a block within its [`Document`].
pub type BlockId = usize;

/// Index of a section within [`Document::sections`].
pub type SectionId = usize;

/// Structural category of a parsed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Header,
    Paragraph,
    List,
    Table,
    Code,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Header => "header",
            BlockKind::Paragraph => "paragraph",
            BlockKind::List => "list",
            BlockKind::Table => "table",
            BlockKind::Code => "code",
        }
    }
}

/// Atomic input unit produced by the block extractor. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    /// Source text of the block, trailing newlines removed.
    pub content: String,
    /// Byte offset of the block start in the normalized input.
    pub start_offset: usize,
    /// Byte offset one past the block end.
    pub end_offset: usize,
    /// 1-based first line.
    pub start_line: usize,
    /// 1-based last line (inclusive).
    pub end_line: usize,
    /// Heading level 1-6 for header blocks.
    pub header_level: Option<u8>,
    /// Owning section, looked up in [`Document::sections`].
    pub section: Option<SectionId>,
    /// Fence info string for code blocks.
    pub language: Option<String>,
    /// Stable short hash of `content`.
    pub content_hash: String,
}

impl Block {
    pub fn is_header(&self) -> bool {
        self.kind == BlockKind::Header
    }

    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// A header-delimited region of the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub title: String,
    pub level: u8,
    pub header_block: BlockId,
    pub parent: Option<SectionId>,
}

/// Parsed document: the normalized source plus its block and section tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub blocks: Vec<Block>,
    pub sections: Vec<Section>,
}

impl Document {
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.get(id)
    }

    /// Section titles from the outermost ancestor down to `id`.
    pub fn header_path(&self, id: SectionId) -> Vec<String> {
        let mut path = Vec::new();
        let mut cursor = self.sections.get(id);
        while let Some(section) = cursor {
            path.push(section.title.clone());
            cursor = section.parent.and_then(|p| self.sections.get(p));
        }
        path.reverse();
        path
    }

    /// Outermost ancestor of a section.
    pub fn top_section(&self, id: SectionId) -> Option<&Section> {
        let mut current = self.sections.get(id)?;
        while let Some(parent) = current.parent.and_then(|p| self.sections.get(p)) {
            current = parent;
        }
        Some(current)
    }

    pub fn total_chars(&self) -> usize {
        self.text.chars().count()
    }
}
