//! End-to-end chunking of one document, plus batch processing.

use std::time::Instant;

use rayon::prelude::*;

use mdchunk_core::{
    Chunk, ChunkConfig, ChunkStatistics, ChunkingError, ChunkingResult, Document, Result,
    StrategyKind,
};
use mdchunk_validate::{validate_completeness, validate_duplication, BlockTracker};

use super::analyzer::analyze;
use super::hierarchy::HierarchyTree;
use super::overlap::apply_overlap;
use super::selector::select_candidates;
use super::size_enforcer::enforce_sizes;
use super::strategies::Strategy;
use crate::document::{decode_utf8, extract_document};

/// Runs the full pipeline with one fixed configuration.
///
/// The chunker holds no state between calls, so one instance can be shared
/// freely across threads.
#[derive(Debug, Clone, Default)]
pub struct MarkdownChunker {
    config: ChunkConfig,
}

impl MarkdownChunker {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Normalize, parse and chunk markdown text.
    pub fn chunk(&self, text: &str) -> Result<ChunkingResult> {
        self.config.validate()?;
        let doc = extract_document(text)?;
        self.chunk_document(&doc)
    }

    /// Like [`chunk`](Self::chunk), for raw bytes that must be valid UTF-8.
    pub fn chunk_bytes(&self, bytes: &[u8]) -> Result<ChunkingResult> {
        self.chunk(decode_utf8(bytes)?)
    }

    /// Chunk an already parsed document.
    pub fn chunk_document(&self, doc: &Document) -> Result<ChunkingResult> {
        let started = Instant::now();
        let config = &self.config;
        config.validate()?;
        config.log_summary();

        let analysis = analyze(doc)?;
        let candidates = select_candidates(&analysis, config);
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        let (strategy, fallback_level, chunks) = run_strategies(doc, config, &candidates, &mut warnings)?;
        let attempts = fallback_level + 1;
        let fallback_used = fallback_level > 0;
        tracing::debug!(%strategy, fallback_level, chunks = chunks.len(), "Strategy built chunks");

        let chunks = enforce_sizes(chunks, doc, config);
        let mut chunks = apply_overlap(chunks, config);
        annotate(&mut chunks, fallback_used.then_some(fallback_level));

        validate(doc, &chunks, config, &mut errors, &mut warnings)?;

        let statistics = ChunkStatistics::from_chunks(&chunks, doc.blocks.len(), attempts);
        let chunks = if config.enable_hierarchy {
            HierarchyTree::build(chunks, doc).into_view(config.debug)
        } else {
            chunks
        };

        let processing_time = started.elapsed();
        tracing::info!(
            %strategy,
            chunks = statistics.total_chunks,
            oversize = statistics.oversize_chunks,
            split = statistics.split_chunks,
            warnings = warnings.len(),
            errors = errors.len(),
            elapsed_ms = processing_time.as_millis() as u64,
            "Document chunked"
        );

        Ok(ChunkingResult {
            chunks,
            strategy_used: strategy,
            fallback_used,
            fallback_level,
            processing_time,
            statistics,
            analysis,
            warnings,
            errors,
        })
    }
}

/// Try candidates in order until one produces chunks.
///
/// Recoverable strategy faults are recorded as warnings; anything else ends
/// the run.
fn run_strategies(
    doc: &Document,
    config: &ChunkConfig,
    candidates: &[StrategyKind],
    warnings: &mut Vec<String>,
) -> Result<(StrategyKind, usize, Vec<Chunk>)> {
    let mut tried = Vec::with_capacity(candidates.len());
    for (level, kind) in candidates.iter().copied().enumerate() {
        tried.push(kind.to_string());
        if !kind.can_handle(doc) {
            tracing::debug!(strategy = %kind, "Strategy cannot handle document");
            continue;
        }
        match kind.build(doc, config) {
            Ok(chunks) => return Ok((kind, level, chunks)),
            Err(e) if e.is_recoverable() => {
                tracing::warn!(strategy = %kind, error = %e, "Strategy failed, trying next candidate");
                warnings.push(e.to_string());
            }
            Err(e) => return Err(e),
        }
    }
    Err(ChunkingError::NoStrategyCanHandle { tried })
}

fn annotate(chunks: &mut [Chunk], fallback_level: Option<usize>) {
    let total = chunks.len();
    for (index, chunk) in chunks.iter_mut().enumerate() {
        let lines = chunk.content.lines().count();
        let words = chunk.content.split_whitespace().count();
        let chars = chunk.char_len();
        chunk.set_meta("chunk_index", index);
        chunk.set_meta("total_chunks", total);
        chunk.set_meta("char_count", chars);
        chunk.set_meta("line_count", lines);
        chunk.set_meta("word_count", words);
        if let Some(level) = fallback_level {
            chunk.set_meta("fallback_level", level);
        }
    }
}

/// Run the completeness validators. Strict mode fails on their defects;
/// otherwise the defects are recorded in `errors` and the output is kept.
fn validate(
    doc: &Document,
    chunks: &[Chunk],
    config: &ChunkConfig,
    errors: &mut Vec<String>,
    warnings: &mut Vec<String>,
) -> Result<()> {
    let t = &config.thresholds;

    let mut tracker = BlockTracker::new(doc);
    tracker.record_all(chunks);
    let coverage = tracker.validate(t.max_duplication);
    coverage.raise_if_invalid(config.strict)?;
    errors.extend(coverage.report.error_messages());
    warnings.extend(coverage.report.warning_messages());

    let completeness = validate_completeness(&doc.text, chunks, t);
    completeness.raise_if_invalid(config.strict)?;
    errors.extend(completeness.report.error_messages());
    warnings.extend(completeness.report.warning_messages());

    // Duplication is advisory regardless of strictness.
    let dedup = validate_duplication(chunks, t);
    dedup.raise_if_invalid(false)?;
    warnings.extend(dedup.report.error_messages());
    warnings.extend(dedup.report.warning_messages());

    tracing::debug!(
        coverage = coverage.coverage,
        char_coverage = completeness.coverage,
        duplicated = dedup.duplicated.len(),
        "Validation finished"
    );
    Ok(())
}

/// Chunk independent documents in parallel, one result per input.
pub fn chunk_many(texts: &[String], config: &ChunkConfig) -> Vec<Result<ChunkingResult>> {
    let chunker = MarkdownChunker::new(config.clone());
    texts.par_iter().map(|text| chunker.chunk(text)).collect()
}
