//! Shared data model for the markdown chunking pipeline: blocks, chunks,
//! configuration and the error taxonomy.

pub mod chunk;
pub mod config;
pub mod document;
pub mod error;
pub mod text;

pub use chunk::*;
pub use config::{ChunkConfig, OverlapDirection, StrategyKind, Thresholds};
pub use document::*;
pub use error::*;
