//! End-to-end properties of the chunking pipeline, run through the public API.

use mdchunk_core::text::{char_len, is_atomic};
use mdchunk_core::{ChunkConfig, ChunkingResult, StrategyKind, Thresholds};
use mdchunk_ingest::document::{extract_document, normalize_text};
use mdchunk_ingest::MarkdownChunker;
use mdchunk_validate::{
    check_overlap_accuracy, run_regression_suite, validate_completeness, BlockTracker,
    RegressionInput,
};

const MANUAL: &str = "# Deployment manual

This manual describes how the service is deployed, configured and monitored in production environments.

## Requirements

The service needs a recent Linux kernel, a Postgres database and outbound network access. Memory usage stays below two gigabytes for typical workloads.

- [ ] provision the database server
- [x] open the firewall for port 8443
- [ ] request certificates from the security team

## Configuration

Settings are read from environment variables first and from the configuration file second. Unknown keys are rejected during startup.

| key | default | meaning |
|-----|---------|---------|
| port | 8443 | listening port |
| workers | 4 | request threads |
| timeout | 30 | seconds per request |

```toml
[server]
port = 8443
workers = 4
```

## Monitoring

Metrics are exported every fifteen seconds. Dashboards show latency percentiles, error rates and queue depth for every region.

1. open the dashboard
2. select the region
3. compare the latency graphs

Alerts fire when the error rate exceeds one percent for five consecutive minutes.";

fn chunk_with(config: ChunkConfig, text: &str) -> ChunkingResult {
    MarkdownChunker::new(config)
        .chunk(text)
        .unwrap_or_else(|e| panic!("chunking failed: {e}"))
}

fn sized(max: usize, overlap: usize) -> ChunkConfig {
    ChunkConfig {
        max_chunk_size: max,
        min_chunk_size: max / 4,
        overlap_size: overlap,
        ..Default::default()
    }
}

/// Prose without repeated phrases, so shared text between chunks is only
/// ever the injected overlap.
fn distinct_prose(sentences: usize) -> String {
    const SUBJECTS: &[&str] = &["The parser", "Every worker", "This module", "Our scheduler", "A client"];
    const VERBS: &[&str] = &["records", "rejects", "forwards", "compresses", "validates"];
    const OBJECTS: &[&str] = &["incoming frames", "stale sessions", "batched writes", "signed tokens", "partial uploads"];
    let mut paragraphs = Vec::new();
    let mut current = Vec::new();
    for i in 0..sentences {
        current.push(format!(
            "{} {} {} during phase {} of cycle {}.",
            SUBJECTS[i % SUBJECTS.len()],
            VERBS[(i / 5) % VERBS.len()],
            OBJECTS[(i / 25) % OBJECTS.len()],
            i,
            i * 7 + 3
        ));
        if current.len() == 6 {
            paragraphs.push(current.join(" "));
            current.clear();
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }
    paragraphs.join("\n\n")
}

/// A long line without spaces, distinct for every seed.
fn dense_line(seed: u64, chars: usize) -> String {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut line = String::with_capacity(chars + 16);
    while line.len() < chars {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        line.push_str(&format!("{:016x}", state));
    }
    line.truncate(chars);
    line
}

/// Headings followed directly by atomic content, and atomic content after prose.
fn capacity_report() -> String {
    let rows: String = (0..40)
        .map(|i| format!("| tier_{i} | {} | limit for tier {i} |\n", i * 37 + 5))
        .collect();
    format!(
        "# Capacity report\n\n\
         Numbers below were collected by the gateway during the last quarter.\n\n\
         ## Limits\n\n\
         | tier | value | note |\n|---|---|---|\n{rows}\n\
         ## Payload\n\n\
         The captured payload follows without any formatting applied.\n\n\
         {}\n\n\
         ## Raw\n\n\
         {}\n\n\
         Closing remarks about the captured data and its retention period.",
        dense_line(1, 1500),
        dense_line(2, 1500)
    )
}

// ── Strategy completeness ───────────────────────────────────────────

#[test]
fn every_input_yields_non_empty_chunks() {
    let inputs = [
        "x",
        "One sentence.",
        "# Only a header",
        "- a\n- b\n- c",
        "| a | b |\n|---|---|\n| 1 | 2 |",
        "```\ncode only\n```",
        MANUAL,
    ];
    for input in inputs {
        for max in [40, 200, 4096] {
            let result = chunk_with(sized(max, 20), input);
            assert!(!result.chunks.is_empty(), "{input:?} at {max}");
            for chunk in &result.chunks {
                assert!(!chunk.content.trim().is_empty(), "{input:?} at {max}");
            }
        }
    }
}

// ── Size limits ─────────────────────────────────────────────────────

#[test]
fn chunks_fit_or_are_atomic() {
    let thresholds = Thresholds::default();
    for max in [60, 150, 300, 1000] {
        let result = chunk_with(sized(max, 30), MANUAL);
        for chunk in &result.chunks {
            if chunk.is_oversize {
                assert!(is_atomic(&chunk.content, &thresholds), "{:?}", chunk.content);
            } else {
                assert!(chunk.char_len() <= max, "{} > {max}", chunk.char_len());
            }
        }
    }
}

#[test]
fn dense_line_under_heading_is_kept_whole() {
    let line = dense_line(7, 1500);
    let config = ChunkConfig {
        enable_overlap: false,
        ..sized(500, 0)
    };
    let result = chunk_with(config, &format!("## Data\n\n{line}"));
    let kept: Vec<_> = result.chunks.iter().filter(|c| c.content == line).collect();
    assert_eq!(kept.len(), 1);
    assert!(kept[0].is_oversize);
    assert_eq!(kept[0].meta_str("oversize_reason"), Some("long_line"));
    assert!(result.chunks.iter().any(|c| c.content == "## Data"));
}

#[test]
fn atomic_content_after_headings_and_prose() {
    let text = capacity_report();
    let thresholds = Thresholds::default();
    for overlap in [0, 60] {
        let config = sized(500, overlap);
        let doc = extract_document(&text).unwrap();
        let result = MarkdownChunker::new(config.clone())
            .chunk_document(&doc)
            .unwrap();

        for chunk in &result.chunks {
            if chunk.is_oversize {
                assert!(is_atomic(&chunk.content, &thresholds), "{:?}", &chunk.content[..40]);
                assert!(!chunk.meta_flag("has_overlap"));
            } else {
                assert!(chunk.char_len() <= 500, "{} chars", chunk.char_len());
            }
        }
        for seed in [1, 2] {
            let line = dense_line(seed, 1500);
            assert_eq!(
                result.chunks.iter().filter(|c| c.content == line).count(),
                1,
                "line {seed} with overlap {overlap}"
            );
        }
        assert!(result
            .chunks
            .iter()
            .any(|c| c.is_oversize && c.meta_str("oversize_reason") == Some("table")));
        assert!(result.errors.is_empty(), "{:?}", result.errors);

        let report = run_regression_suite(&RegressionInput {
            document: &doc,
            chunks: &result.chunks,
            config: &config,
        });
        let failures: Vec<_> = report.failures().collect();
        assert!(failures.is_empty(), "overlap {overlap}: {failures:?}");
    }
}

#[test]
fn reference_definitions_survive_strict_mode() {
    let text = "See the [guide][1] for setup details.\n\n\
                [1]: https://example.com/docs/guide\n\n\
                More text after the reference.";
    let config = ChunkConfig {
        strict: true,
        ..Default::default()
    };
    let result = chunk_with(config, text);
    let joined: String = result.chunks.iter().map(|c| c.content.as_str()).collect();
    assert!(joined.contains("[1]: https://example.com/docs/guide"));
    assert!(result.warnings.iter().all(|w| !w.starts_with("char_coverage")));
}

#[test]
fn repeated_paragraph_is_split_within_budget() {
    let body = "This is a test paragraph. ".repeat(50 * 1024 / 26);
    let text = format!("## Header\n\n{body}");
    let config = ChunkConfig {
        max_chunk_size: 500,
        allow_oversize: false,
        ..Default::default()
    };
    let result = chunk_with(config.clone(), &text);
    assert!(result.chunks.len() > 100);
    for chunk in &result.chunks {
        assert!(!chunk.is_oversize);
        assert!(chunk.char_len() <= 500, "{}", chunk.char_len());
    }

    let completeness = validate_completeness(&text, &result.chunks, &config.thresholds);
    assert!(
        (completeness.coverage - 1.0).abs() <= 0.05,
        "coverage {}",
        completeness.coverage
    );
}

#[test]
fn large_code_block_stays_whole() {
    let mut code = String::from("```rust\n");
    while code.len() < 5000 {
        code.push_str("let value = compute(input, 42);\n");
    }
    code.push_str("```");
    let result = chunk_with(
        ChunkConfig {
            max_chunk_size: 100,
            ..Default::default()
        },
        &code,
    );
    assert_eq!(result.chunks.len(), 1);
    assert!(result.chunks[0].is_oversize);
    assert_eq!(result.chunks[0].meta_str("oversize_reason"), Some("code_block"));
    assert_eq!(result.statistics.oversize_chunks, 1);
}

// ── Coverage ────────────────────────────────────────────────────────

#[test]
fn character_coverage_without_overlap() {
    let config = ChunkConfig {
        enable_overlap: false,
        ..sized(200, 0)
    };
    let result = chunk_with(config.clone(), MANUAL);
    let total: usize = result.chunks.iter().map(|c| char_len(&c.content)).sum();
    let input = char_len(MANUAL);
    let deviation = total.abs_diff(input) as f64 / input as f64;
    assert!(deviation <= config.thresholds.coverage_tolerance, "deviation {deviation}");
}

#[test]
fn no_block_is_lost_or_over_duplicated() {
    let doc = extract_document(MANUAL).unwrap();
    for max in [80, 250, 4096] {
        let config = sized(max, 40);
        let result = MarkdownChunker::new(config.clone())
            .chunk_document(&doc)
            .unwrap();
        let mut tracker = BlockTracker::new(&doc);
        tracker.record_all(&result.chunks);
        let coverage = tracker.validate(config.thresholds.max_duplication);
        assert!(coverage.missing_blocks.is_empty(), "{:?}", coverage.missing_blocks);
        assert!(coverage.over_duplicated.is_empty(), "{:?}", coverage.over_duplicated);
        assert!((coverage.coverage - 100.0).abs() < f64::EPSILON);
    }
}

// ── Overlap ─────────────────────────────────────────────────────────

#[test]
fn declared_overlap_matches_shared_text() {
    let text = distinct_prose(60);
    let config = sized(400, 60);
    let result = chunk_with(config.clone(), &text);
    assert!(result.statistics.overlapped_chunks > 0);
    let mismatches = check_overlap_accuracy(&result.chunks, &config.thresholds);
    assert!(mismatches.is_empty(), "{mismatches:?}");

    for pair in result.chunks.windows(2) {
        let declared = pair[1].declared_overlap();
        if declared == 0 {
            continue;
        }
        let shared = mdchunk_validate::longest_common_affix(&pair[0].content, &pair[1].content);
        let tolerance = 10usize.max(declared / 10);
        assert!(shared.abs_diff(declared) <= tolerance, "{shared} vs {declared}");
        assert!(pair[1].char_len() <= config.max_chunk_size);
    }
}

// ── Determinism ─────────────────────────────────────────────────────

#[test]
fn identical_runs_are_identical() {
    let config = ChunkConfig {
        enable_hierarchy: true,
        debug: true,
        ..sized(180, 40)
    };
    let first = chunk_with(config.clone(), MANUAL);
    let second = chunk_with(config, MANUAL);
    assert_eq!(first.chunks, second.chunks);
    assert_eq!(first.strategy_used, second.strategy_used);
}

// ── Normalization ───────────────────────────────────────────────────

#[test]
fn glued_cyrillic_sentences_are_separated() {
    let input = format!("{}{}", "продукта.", "Нет возможности");
    assert!(normalize_text(&input).contains("продукта. Нет"));

    let result = chunk_with(ChunkConfig::default(), &input);
    assert!(result.chunks[0].content.contains("продукта. Нет"));
}

// ── Hierarchy ───────────────────────────────────────────────────────

#[test]
fn hierarchy_debug_view_is_a_superset() {
    let text = "# Alpha\n\nFirst section text.\n\n# Beta\n\nSecond section text.\n\n# Gamma\n\nThird section text.";
    let normal = chunk_with(
        ChunkConfig {
            enable_hierarchy: true,
            ..sized(60, 10)
        },
        text,
    );
    let debug = chunk_with(
        ChunkConfig {
            enable_hierarchy: true,
            debug: true,
            ..sized(60, 10)
        },
        text,
    );
    assert!(debug.chunks.len() > normal.chunks.len());

    assert!(debug.chunks[0].meta_flag("is_root"));
    let sections: Vec<_> = debug
        .chunks
        .iter()
        .filter(|c| c.meta_usize("hierarchy_level") == Some(1))
        .collect();
    assert_eq!(sections.len(), 3);
    assert!(sections.iter().all(|c| !c.meta_flag("is_leaf")));

    assert!(normal.chunks.iter().all(|c| !c.meta_flag("is_root")));
    let debug_leaves: Vec<_> = debug.chunks.iter().filter(|c| c.is_leaf()).collect();
    assert_eq!(debug_leaves.len(), normal.chunks.len());
    for (a, b) in debug_leaves.iter().zip(&normal.chunks) {
        assert_eq!(a.content, b.content);
    }
}

// ── Regression battery ──────────────────────────────────────────────

#[test]
fn regression_suite_passes_on_manual() {
    let doc = extract_document(MANUAL).unwrap();
    for max in [300, 4096] {
        let config = sized(max, 50);
        let result = MarkdownChunker::new(config.clone())
            .chunk_document(&doc)
            .unwrap();
        let report = run_regression_suite(&RegressionInput {
            document: &doc,
            chunks: &result.chunks,
            config: &config,
        });
        let failures: Vec<_> = report.failures().collect();
        assert!(failures.is_empty(), "max {max}: {failures:?}");
    }
}

#[test]
fn strategy_selection_follows_content() {
    let code: String = (0..4)
        .map(|i| format!("```python\ndef handler_{i}(event):\n    return process(event, retries={i})\n```"))
        .collect::<Vec<_>>()
        .join("\n\n");
    assert_eq!(
        chunk_with(ChunkConfig::default(), &code).strategy_used,
        StrategyKind::CodeAware
    );
    assert_eq!(
        chunk_with(ChunkConfig::default(), MANUAL).strategy_used,
        StrategyKind::Structural
    );
    assert_eq!(
        chunk_with(ChunkConfig::default(), "Plain words only.").strategy_used,
        StrategyKind::Fallback
    );
}
