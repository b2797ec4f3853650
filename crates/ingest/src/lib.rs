//! Markdown ingestion: block extraction, the chunking pipeline and the
//! host-facing request and output contract.

pub mod chunker;
pub mod document;
pub mod output;
pub mod request;

pub use chunker::{chunk_many, MarkdownChunker};
pub use output::{filter_metadata, format_chunk, format_chunks};
pub use request::{handle_request, ChunkRequest};
