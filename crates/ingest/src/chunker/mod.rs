//! Markdown chunking pipeline.
//!
//! Stages run strictly forward: analyze the block sequence, select and run a
//! strategy, enforce the size budget, inject overlap, then optionally build
//! the root/section/leaf hierarchy. Validators observe the result.

mod analyzer;
mod hierarchy;
mod overlap;
mod pipeline;
mod selector;
mod size_enforcer;
mod splitter;
mod strategies;

pub use analyzer::analyze;
pub use hierarchy::{HierarchyNode, HierarchyTree};
pub use overlap::{apply_overlap, head_at_word_boundary, tail_at_word_boundary};
pub use pipeline::{chunk_many, MarkdownChunker};
pub use selector::{select_candidates, select_strategy};
pub use size_enforcer::enforce_sizes;
pub use splitter::split_to_fit;
pub use strategies::Strategy;
