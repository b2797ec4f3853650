use serde::Serialize;
use thiserror::Error;

use crate::document::BlockId;

/// Coarse classification used at the boundary that decides how to surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InputValidation,
    Strategy,
    DataLoss,
    Validation,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChunkingError {
    #[error("Input text is empty or contains only whitespace")]
    EmptyInput,

    #[error("Input is not valid UTF-8: {detail}")]
    InvalidEncoding { detail: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Unknown strategy '{name}'")]
    StrategyNotFound { name: String },

    #[error("Strategy {strategy} cannot proceed: {message}")]
    Strategy { strategy: String, message: String },

    #[error("Strategy {strategy} failed: {reason}")]
    StrategyFailed { strategy: String, reason: String },

    #[error("No strategy could handle the input (tried: {})", .tried.join(", "))]
    NoStrategyCanHandle { tried: Vec<String> },

    #[error("{} block(s) missing from output ({chars} chars)", .blocks.len())]
    MissingContent { blocks: Vec<BlockId>, chars: usize },

    #[error("Incomplete coverage: {coverage:.1}% with {} uncovered line range(s)", .gaps.len())]
    IncompleteCoverage {
        coverage: f64,
        gaps: Vec<(usize, usize)>,
    },

    #[error("Data loss: {message}")]
    DataLoss { message: String },

    #[error("Invalid chunk #{index}: {reason}")]
    InvalidChunk { index: usize, reason: String },

    #[error("Invalid metadata '{key}' on chunk #{index}: {reason}")]
    InvalidMetadata {
        index: usize,
        key: String,
        reason: String,
    },
}

impl ChunkingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChunkingError::EmptyInput
            | ChunkingError::InvalidEncoding { .. }
            | ChunkingError::InvalidConfig { .. } => ErrorKind::InputValidation,
            ChunkingError::StrategyNotFound { .. }
            | ChunkingError::Strategy { .. }
            | ChunkingError::StrategyFailed { .. }
            | ChunkingError::NoStrategyCanHandle { .. } => ErrorKind::Strategy,
            ChunkingError::MissingContent { .. }
            | ChunkingError::IncompleteCoverage { .. }
            | ChunkingError::DataLoss { .. } => ErrorKind::DataLoss,
            ChunkingError::InvalidChunk { .. } | ChunkingError::InvalidMetadata { .. } => {
                ErrorKind::Validation
            }
        }
    }

    /// Stage-local strategy faults the selector can fail over from.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ChunkingError::Strategy { .. } | ChunkingError::StrategyFailed { .. }
        )
    }
}

/// Result alias for chunking operations.
pub type Result<T> = std::result::Result<T, ChunkingError>;
