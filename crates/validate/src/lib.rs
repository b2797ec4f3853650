//! Read-only checks over a finished chunk list.
//!
//! Every validator returns a result carrying a [`ValidationResult`] with
//! errors (invalid output) and warnings (advisory). Callers decide whether
//! an invalid result is fatal through `raise_if_invalid(strict)`.

mod block_tracker;
mod completeness;
mod dedup;
pub mod regression;

pub use block_tracker::{BlockTracker, CoverageResult};
pub use completeness::{validate_completeness, CompletenessResult};
pub use dedup::{
    check_overlap_accuracy, longest_common_affix, validate_duplication, ChunkDuplication,
    DedupResult, OverlapMismatch,
};
pub use regression::{run_regression_suite, CheckOutcome, RegressionInput, RegressionReport};

use serde::{Deserialize, Serialize};

// ── Result types ────────────────────────────────────────────────────

/// Outcome shared by all validators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// A defect that makes the output invalid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Name of the check that failed, e.g. `"missing_content"`.
    pub check: String,
    pub message: String,
    /// Chunk the defect was found in, when it is local to one chunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
}

/// A non-blocking advisory finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub check: String,
    pub message: String,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn error(&mut self, check: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            check: check.into(),
            message: message.into(),
            chunk_index: None,
        });
    }

    pub(crate) fn chunk_error(
        &mut self,
        check: impl Into<String>,
        index: usize,
        message: impl Into<String>,
    ) {
        self.valid = false;
        self.errors.push(ValidationError {
            check: check.into(),
            message: message.into(),
            chunk_index: Some(index),
        });
    }

    pub(crate) fn warn(&mut self, check: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            check: check.into(),
            message: message.into(),
        });
    }

    /// Errors as `check: message`.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.check, e.message))
            .collect()
    }

    /// Warnings as `check: message`.
    pub fn warning_messages(&self) -> Vec<String> {
        self.warnings
            .iter()
            .map(|w| format!("{}: {}", w.check, w.message))
            .collect()
    }

    /// Log findings that are not being escalated.
    pub(crate) fn log_downgraded(&self) {
        for e in &self.errors {
            tracing::warn!(check = %e.check, "{}", e.message);
        }
    }
}
