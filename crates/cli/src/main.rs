mod cli;
mod config;

use std::io::{self, Read, Write};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use mdchunk_core::config::load_dotenv;
use mdchunk_core::{ChunkConfig, ChunkingResult};
use mdchunk_ingest::document::extract_document;
use mdchunk_ingest::{chunk_many, format_chunks};
use mdchunk_validate::{run_regression_suite, RegressionInput};

use crate::cli::{CliArgs, OutputFormat};
use crate::config::CliConfig;

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries only chunk output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    load_dotenv();
    let args = CliArgs::parse();

    // Precedence: flag > config file > environment > default.
    let file_config = CliConfig::load(args.config.as_deref())
        .context("failed to load configuration")?;
    let config = file_config.apply(ChunkConfig::from_env())?;
    let config = args.apply(config)?;
    config.validate().context("invalid chunk configuration")?;

    let inputs = read_inputs(&args)?;
    let texts: Vec<String> = inputs.iter().map(|(_, text)| text.clone()).collect();
    info!(documents = texts.len(), "Chunking");
    let results = chunk_many(&texts, &config);

    let mut stdout = io::stdout().lock();
    let mut failed_checks = 0;
    for ((name, text), result) in inputs.iter().zip(results) {
        let result = result.with_context(|| format!("failed to chunk {name}"))?;
        for error in &result.errors {
            error!(document = %name, "{error}");
        }
        for warning in &result.warnings {
            warn!(document = %name, "{warning}");
        }
        write_result(&mut stdout, &args, &config, &result)?;

        if args.check {
            failed_checks += check(name, text, &config, &result)?;
        }
    }
    stdout.flush()?;

    if failed_checks > 0 {
        bail!("{failed_checks} regression check(s) failed");
    }
    Ok(())
}

/// `(name, text)` for every input file, or stdin when none are given.
fn read_inputs(args: &CliArgs) -> Result<Vec<(String, String)>> {
    if args.files.is_empty() {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(vec![("<stdin>".to_string(), text)]);
    }
    args.files
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let text = String::from_utf8(bytes)
                .with_context(|| format!("{} is not valid UTF-8", path.display()))?;
            Ok((path.display().to_string(), text))
        })
        .collect()
}

fn write_result(
    out: &mut impl Write,
    args: &CliArgs,
    config: &ChunkConfig,
    result: &ChunkingResult,
) -> Result<()> {
    match args.format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, result).context("failed to write JSON")?;
            writeln!(out)?;
        }
        OutputFormat::Text => {
            for chunk in format_chunks(&result.chunks, config.include_metadata) {
                writeln!(out, "{chunk}\n")?;
            }
        }
    }
    Ok(())
}

/// Run the regression battery and report failures on stderr.
fn check(name: &str, text: &str, config: &ChunkConfig, result: &ChunkingResult) -> Result<usize> {
    let document = extract_document(text).with_context(|| format!("failed to parse {name}"))?;
    let report = run_regression_suite(&RegressionInput {
        document: &document,
        chunks: &result.chunks,
        config,
    });
    let failures: Vec<_> = report.failures().collect();
    for failure in &failures {
        eprintln!("{name}: {} failed: {}", failure.name, failure.message);
    }
    if failures.is_empty() {
        eprintln!("{name}: {} checks passed", report.checks.len());
    }
    Ok(failures.len())
}
