use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::StrategyKind;
use crate::document::BlockId;

/// Ordered chunk metadata.
pub type Metadata = IndexMap<String, Value>;

/// Where a block sits inside a chunk's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpan {
    pub block_id: BlockId,
    /// Byte range within [`Chunk::content`].
    pub start: usize,
    pub end: usize,
    /// Byte offset inside the block's own content where this span begins.
    #[serde(default)]
    pub block_offset: usize,
    /// Only part of the block made it into this chunk (split by the size enforcer).
    pub partial: bool,
}

impl BlockSpan {
    pub fn full(block_id: BlockId, start: usize, end: usize) -> Self {
        Self {
            block_id,
            start,
            end,
            block_offset: 0,
            partial: false,
        }
    }
}

/// Joins injected overlap text to a chunk's own content.
pub const OVERLAP_SEPARATOR: &str = "\n\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyLevel {
    Root,
    Section,
    Leaf,
}

impl HierarchyLevel {
    pub fn depth(&self) -> u8 {
        match self {
            HierarchyLevel::Root => 0,
            HierarchyLevel::Section => 1,
            HierarchyLevel::Leaf => 2,
        }
    }
}

/// Position of a chunk inside the hierarchy arena.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyInfo {
    pub node_id: usize,
    pub level: HierarchyLevel,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub is_root: bool,
    pub is_leaf: bool,
}

/// An output segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    /// 1-based first source line.
    pub start_line: usize,
    /// 1-based last source line (inclusive).
    pub end_line: usize,
    pub metadata: Metadata,
    pub is_oversize: bool,
    pub spans: Vec<BlockSpan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hierarchy: Option<HierarchyInfo>,
}

impl Chunk {
    pub fn new(content: String, start_line: usize, end_line: usize) -> Self {
        Self {
            content,
            start_line,
            end_line,
            metadata: Metadata::new(),
            is_oversize: false,
            spans: Vec::new(),
            hierarchy: None,
        }
    }

    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    pub fn set_meta(&mut self, key: &str, value: impl Into<Value>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    pub fn meta_usize(&self, key: &str) -> Option<usize> {
        self.metadata
            .get(key)
            .and_then(Value::as_u64)
            .map(|v| v as usize)
    }

    pub fn meta_flag(&self, key: &str) -> bool {
        self.metadata
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Declared overlap length, zero when none was injected.
    pub fn declared_overlap(&self) -> usize {
        if self.meta_flag("has_overlap") {
            self.meta_usize("overlap_size").unwrap_or(0)
        } else {
            0
        }
    }

    /// Every block recorded in this chunk, full or partial.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.spans.iter().map(|s| s.block_id)
    }

    /// Blocks present in full.
    pub fn full_block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.spans.iter().filter(|s| !s.partial).map(|s| s.block_id)
    }

    pub fn is_leaf(&self) -> bool {
        self.hierarchy.as_ref().map_or(true, |h| h.is_leaf)
    }
}

/// Per-run statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkStatistics {
    pub total_chunks: usize,
    pub total_chars: usize,
    pub avg_chunk_size: f64,
    pub min_chunk_size: usize,
    pub max_chunk_size: usize,
    pub oversize_chunks: usize,
    pub split_chunks: usize,
    pub overlapped_chunks: usize,
    pub block_count: usize,
    pub strategy_attempts: usize,
}

impl ChunkStatistics {
    pub fn from_chunks(chunks: &[Chunk], block_count: usize, strategy_attempts: usize) -> Self {
        let sizes: Vec<usize> = chunks.iter().map(Chunk::char_len).collect();
        let total_chars: usize = sizes.iter().sum();
        Self {
            total_chunks: chunks.len(),
            total_chars,
            avg_chunk_size: if chunks.is_empty() {
                0.0
            } else {
                total_chars as f64 / chunks.len() as f64
            },
            min_chunk_size: sizes.iter().copied().min().unwrap_or(0),
            max_chunk_size: sizes.iter().copied().max().unwrap_or(0),
            oversize_chunks: chunks.iter().filter(|c| c.is_oversize).count(),
            split_chunks: chunks.iter().filter(|c| c.meta_flag("is_split")).count(),
            overlapped_chunks: chunks.iter().filter(|c| c.meta_flag("has_overlap")).count(),
            block_count,
            strategy_attempts,
        }
    }
}

/// Profile of a document's block sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentAnalysis {
    pub total_chars: usize,
    pub total_lines: usize,
    pub code_ratio: f64,
    pub list_ratio: f64,
    pub table_ratio: f64,
    pub text_ratio: f64,
    pub code_block_count: usize,
    pub header_count: usize,
    pub list_count: usize,
    pub table_count: usize,
    pub paragraph_count: usize,
    pub max_header_level: u8,
    pub nesting_depth: usize,
    pub has_mixed_content: bool,
    pub languages: Vec<String>,
}

/// Outcome of one chunking invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingResult {
    pub chunks: Vec<Chunk>,
    pub strategy_used: StrategyKind,
    pub fallback_used: bool,
    pub fallback_level: usize,
    #[serde(with = "duration_ms")]
    pub processing_time: Duration,
    pub statistics: ChunkStatistics,
    pub analysis: ContentAnalysis,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ChunkingResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && !self.chunks.is_empty()
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64() * 1000.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(ms.max(0.0) / 1000.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_overlap_requires_flag() {
        let mut chunk = Chunk::new("text".into(), 1, 1);
        chunk.set_meta("overlap_size", 12);
        assert_eq!(chunk.declared_overlap(), 0);
        chunk.set_meta("has_overlap", true);
        assert_eq!(chunk.declared_overlap(), 12);
    }

    #[test]
    fn statistics_summarize_sizes() {
        let mut a = Chunk::new("aaaa".into(), 1, 1);
        a.is_oversize = true;
        let mut b = Chunk::new("bb".into(), 2, 2);
        b.set_meta("is_split", true);
        let stats = ChunkStatistics::from_chunks(&[a, b], 2, 1);
        assert_eq!(stats.total_chunks, 2);
        assert_eq!(stats.total_chars, 6);
        assert_eq!(stats.min_chunk_size, 2);
        assert_eq!(stats.max_chunk_size, 4);
        assert_eq!(stats.oversize_chunks, 1);
        assert_eq!(stats.split_chunks, 1);
        assert!((stats.avg_chunk_size - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn full_and_partial_blocks() {
        let mut chunk = Chunk::new("x".into(), 1, 1);
        chunk.spans = vec![
            BlockSpan::full(0, 0, 1),
            BlockSpan {
                block_id: 1,
                start: 0,
                end: 1,
                block_offset: 4,
                partial: true,
            },
        ];
        assert_eq!(chunk.block_ids().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(chunk.full_block_ids().collect::<Vec<_>>(), vec![0]);
    }
}
