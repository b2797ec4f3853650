//! Host-facing invocation contract.

use serde::{Deserialize, Serialize};

use mdchunk_core::{ChunkConfig, Result, StrategyKind};

use crate::chunker::MarkdownChunker;
use crate::output::format_chunks;

fn default_max_chunk_size() -> usize {
    4096
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_strategy() -> String {
    "auto".to_string()
}

fn default_true() -> bool {
    true
}

/// Parameters a host tool passes for one chunking call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRequest {
    pub input_text: String,
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// `auto` or a strategy name.
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default = "default_true")]
    pub include_metadata: bool,
    #[serde(default)]
    pub enable_hierarchy: bool,
    #[serde(default)]
    pub debug: bool,
}

impl ChunkRequest {
    pub fn new(input_text: impl Into<String>) -> Self {
        Self {
            input_text: input_text.into(),
            max_chunk_size: default_max_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            strategy: default_strategy(),
            include_metadata: true,
            enable_hierarchy: false,
            debug: false,
        }
    }

    /// Build a config on top of `base`, failing on unknown strategy names.
    pub fn into_config(&self, base: ChunkConfig) -> Result<ChunkConfig> {
        Ok(ChunkConfig {
            max_chunk_size: self.max_chunk_size,
            overlap_size: self.chunk_overlap,
            strategy_override: StrategyKind::parse_override(&self.strategy)?,
            include_metadata: self.include_metadata,
            enable_hierarchy: self.enable_hierarchy,
            debug: self.debug,
            ..base
        })
    }
}

/// Chunk the request text and render each chunk per the output contract.
pub fn handle_request(request: &ChunkRequest) -> Result<Vec<String>> {
    let config = request.into_config(ChunkConfig::default())?;
    let result = MarkdownChunker::new(config).chunk(&request.input_text)?;
    for error in &result.errors {
        tracing::warn!(error = %error, "Chunking defect");
    }
    for warning in &result.warnings {
        tracing::debug!(warning = %warning, "Chunking warning");
    }
    Ok(format_chunks(&result.chunks, request.include_metadata))
}
