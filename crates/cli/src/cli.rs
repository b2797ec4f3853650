use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use mdchunk_core::{ChunkConfig, OverlapDirection, StrategyKind};

/// Split markdown documents into bounded, structure-aware chunks.
///
/// Reads each FILE (or stdin when none is given) and prints the chunks.
#[derive(Parser, Debug)]
#[command(name = "mdchunk", about = "Structure-aware markdown chunker")]
pub struct CliArgs {
    /// Markdown files to chunk (stdin when empty)
    pub files: Vec<PathBuf>,

    /// Path to config file (default: ~/.config/mdchunk/config.toml)
    #[arg(long)]
    pub config: Option<String>,

    /// Maximum characters per chunk
    #[arg(long)]
    pub max_chunk_size: Option<usize>,

    /// Preferred minimum characters per chunk
    #[arg(long)]
    pub min_chunk_size: Option<usize>,

    /// Overlap characters between adjacent chunks
    #[arg(long)]
    pub overlap: Option<usize>,

    /// Disable overlap injection
    #[arg(long)]
    pub no_overlap: bool,

    /// Take overlap from the previous or the next chunk
    #[arg(long, value_enum)]
    pub overlap_direction: Option<Direction>,

    /// Strategy: auto, code_aware, structural, list_aware, table, mixed, fallback
    #[arg(long)]
    pub strategy: Option<String>,

    /// Keep oversized chunks instead of splitting them
    #[arg(long)]
    pub allow_oversize: bool,

    /// Build the root/section/leaf hierarchy
    #[arg(long)]
    pub hierarchy: bool,

    /// With --hierarchy, print every node instead of leaves only
    #[arg(long)]
    pub debug: bool,

    /// Print raw chunk content without the metadata block
    #[arg(long)]
    pub no_metadata: bool,

    /// Fail on coverage defects instead of warning
    #[arg(long)]
    pub strict: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Run the regression checks on the output and fail if any does not pass
    #[arg(long)]
    pub check: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Formatted chunks, one after another
    Text,
    /// The full chunking result as JSON
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    Previous,
    Next,
}

impl From<Direction> for OverlapDirection {
    fn from(d: Direction) -> Self {
        match d {
            Direction::Previous => OverlapDirection::Previous,
            Direction::Next => OverlapDirection::Next,
        }
    }
}

impl CliArgs {
    /// Apply command-line flags on top of `config`. Flags always win.
    pub fn apply(&self, mut config: ChunkConfig) -> Result<ChunkConfig> {
        if let Some(max) = self.max_chunk_size {
            config.max_chunk_size = max;
        }
        if let Some(min) = self.min_chunk_size {
            config.min_chunk_size = min;
        }
        if let Some(overlap) = self.overlap {
            config.overlap_size = overlap;
        }
        if self.no_overlap {
            config.enable_overlap = false;
        }
        if let Some(direction) = self.overlap_direction {
            config.overlap_direction = direction.into();
        }
        if let Some(name) = &self.strategy {
            config.strategy_override = StrategyKind::parse_override(name)?;
        }
        config.allow_oversize |= self.allow_oversize;
        config.enable_hierarchy |= self.hierarchy;
        config.debug |= self.debug;
        config.strict |= self.strict;
        if self.no_metadata {
            config.include_metadata = false;
        }
        Ok(config)
    }
}
