use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ChunkingError, Result};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_usize(key: &str, default: usize) -> usize {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match env_opt(key).map(|v| v.to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

// ── Strategy kinds ────────────────────────────────────────────

/// Closed set of chunking strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    CodeAware,
    Structural,
    ListAware,
    Table,
    Mixed,
    /// Sentence packing; handles any non-empty input.
    #[serde(alias = "sentences")]
    Fallback,
}

impl StrategyKind {
    /// Selection order used when no override is configured.
    pub const PRIORITY: [StrategyKind; 6] = [
        StrategyKind::CodeAware,
        StrategyKind::Structural,
        StrategyKind::ListAware,
        StrategyKind::Table,
        StrategyKind::Mixed,
        StrategyKind::Fallback,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::CodeAware => "code_aware",
            StrategyKind::Structural => "structural",
            StrategyKind::ListAware => "list_aware",
            StrategyKind::Table => "table",
            StrategyKind::Mixed => "mixed",
            StrategyKind::Fallback => "fallback",
        }
    }

    /// Parse a request-level strategy name, where `auto` means "no override".
    pub fn parse_override(name: &str) -> Result<Option<StrategyKind>> {
        let name = name.trim();
        if name.is_empty() || name.eq_ignore_ascii_case("auto") {
            return Ok(None);
        }
        name.parse().map(Some)
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = ChunkingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "code_aware" | "code" => Ok(StrategyKind::CodeAware),
            "structural" => Ok(StrategyKind::Structural),
            "list_aware" | "list" => Ok(StrategyKind::ListAware),
            "table" => Ok(StrategyKind::Table),
            "mixed" => Ok(StrategyKind::Mixed),
            "fallback" | "sentences" => Ok(StrategyKind::Fallback),
            _ => Err(ChunkingError::StrategyNotFound { name: s.to_string() }),
        }
    }
}

/// Where overlap context is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapDirection {
    /// Prefix each chunk with the tail of the previous one.
    #[default]
    Previous,
    /// Suffix each chunk with the head of the next one.
    Next,
}

// ── Thresholds ────────────────────────────────────────────────

/// Empirically tuned constants, exposed as configurable defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub code_ratio: f64,
    pub min_code_blocks: usize,
    pub min_headers: usize,
    pub list_ratio: f64,
    pub min_lists: usize,
    pub min_tables: usize,
    /// A single line longer than this with few spaces is atomic.
    pub atomic_line_chars: usize,
    pub atomic_space_ratio: f64,
    pub coverage_tolerance: f64,
    pub max_line_gap: usize,
    pub max_duplication: usize,
    pub max_duplication_ratio: f64,
    pub overlap_duplication_ratio: f64,
    pub overlap_tolerance_chars: usize,
    pub overlap_tolerance_ratio: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            code_ratio: 0.7,
            min_code_blocks: 3,
            min_headers: 3,
            list_ratio: 0.6,
            min_lists: 5,
            min_tables: 3,
            atomic_line_chars: 1000,
            atomic_space_ratio: 0.1,
            coverage_tolerance: 0.05,
            max_line_gap: 10,
            max_duplication: 2,
            max_duplication_ratio: 0.3,
            overlap_duplication_ratio: 0.6,
            overlap_tolerance_chars: 10,
            overlap_tolerance_ratio: 0.1,
        }
    }
}

impl Thresholds {
    /// Allowed deviation between declared and observed overlap length.
    pub fn overlap_tolerance(&self, declared: usize) -> usize {
        let relative = (declared as f64 * self.overlap_tolerance_ratio).ceil() as usize;
        relative.max(self.overlap_tolerance_chars)
    }
}

// ── Chunk configuration ───────────────────────────────────────

/// Per-invocation configuration. Never mutated by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    /// Maximum characters per chunk (default: 4096).
    pub max_chunk_size: usize,
    /// Preferred minimum characters per chunk (default: 512).
    pub min_chunk_size: usize,
    /// Overlap characters between adjacent chunks (default: 200).
    pub overlap_size: usize,
    pub enable_overlap: bool,
    pub overlap_direction: OverlapDirection,
    /// Mark every oversized chunk instead of splitting it.
    pub allow_oversize: bool,
    pub strategy_override: Option<StrategyKind>,
    pub enable_hierarchy: bool,
    /// Return the full hierarchy instead of leaves (hierarchy mode only).
    pub debug: bool,
    pub include_metadata: bool,
    /// Escalate completeness defects to errors.
    pub strict: bool,
    pub thresholds: Thresholds,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 4096,
            min_chunk_size: 512,
            overlap_size: 200,
            enable_overlap: true,
            overlap_direction: OverlapDirection::Previous,
            allow_oversize: false,
            strategy_override: None,
            enable_hierarchy: false,
            debug: false,
            include_metadata: true,
            strict: false,
            thresholds: Thresholds::default(),
        }
    }
}

impl ChunkConfig {
    /// Build config from `MDCHUNK_*` environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        let d = Self::default();
        let strategy_override = env_opt("MDCHUNK_STRATEGY")
            .and_then(|name| match StrategyKind::parse_override(&name) {
                Ok(kind) => kind,
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring MDCHUNK_STRATEGY");
                    None
                }
            });
        Self {
            max_chunk_size: env_usize("MDCHUNK_MAX_CHUNK_SIZE", d.max_chunk_size),
            min_chunk_size: env_usize("MDCHUNK_MIN_CHUNK_SIZE", d.min_chunk_size),
            overlap_size: env_usize("MDCHUNK_OVERLAP_SIZE", d.overlap_size),
            enable_overlap: env_bool("MDCHUNK_ENABLE_OVERLAP", d.enable_overlap),
            overlap_direction: match env_opt("MDCHUNK_OVERLAP_DIRECTION").as_deref() {
                Some("next") => OverlapDirection::Next,
                _ => OverlapDirection::Previous,
            },
            allow_oversize: env_bool("MDCHUNK_ALLOW_OVERSIZE", d.allow_oversize),
            strategy_override,
            enable_hierarchy: env_bool("MDCHUNK_ENABLE_HIERARCHY", d.enable_hierarchy),
            debug: env_bool("MDCHUNK_DEBUG", d.debug),
            include_metadata: env_bool("MDCHUNK_INCLUDE_METADATA", d.include_metadata),
            strict: env_bool("MDCHUNK_STRICT", d.strict),
            thresholds: d.thresholds,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_size == 0 {
            return Err(ChunkingError::InvalidConfig {
                reason: "max_chunk_size must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn overlap_active(&self) -> bool {
        self.enable_overlap && self.overlap_size > 0
    }

    /// Room reserved for overlap, at most half the maximum.
    pub fn overlap_reserve(&self) -> usize {
        if self.overlap_active() {
            self.overlap_size.min(self.max_chunk_size / 2)
        } else {
            0
        }
    }

    /// Characters of own content a chunk may hold before overlap is added.
    pub fn content_budget(&self) -> usize {
        (self.max_chunk_size - self.overlap_reserve()).max(1)
    }

    pub fn effective_min_size(&self) -> usize {
        self.min_chunk_size.min(self.content_budget() / 2)
    }

    pub fn log_summary(&self) {
        tracing::debug!(
            max = self.max_chunk_size,
            min = self.min_chunk_size,
            overlap = self.overlap_size,
            overlap_enabled = self.enable_overlap,
            strategy = self.strategy_override.map(|s| s.as_str()).unwrap_or("auto"),
            hierarchy = self.enable_hierarchy,
            strict = self.strict,
            "Chunk config"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let config = ChunkConfig::default();
        assert_eq!(config.max_chunk_size, 4096);
        assert_eq!(config.overlap_size, 200);
        assert!(config.include_metadata);
        assert!(!config.enable_hierarchy);
        assert_eq!(config.content_budget(), 3896);
        assert_eq!(config.thresholds.max_duplication, 2);
    }

    #[test]
    fn budget_clamps_large_overlap() {
        let config = ChunkConfig {
            max_chunk_size: 100,
            ..Default::default()
        };
        assert_eq!(config.overlap_reserve(), 50);
        assert_eq!(config.content_budget(), 50);
        assert_eq!(config.effective_min_size(), 25);

        let no_overlap = ChunkConfig {
            max_chunk_size: 100,
            enable_overlap: false,
            ..Default::default()
        };
        assert_eq!(no_overlap.content_budget(), 100);
    }

    #[test]
    fn zero_max_is_rejected() {
        let config = ChunkConfig {
            max_chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ChunkingError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn strategy_names_parse() {
        assert_eq!(StrategyKind::parse_override("auto").unwrap(), None);
        assert_eq!(
            StrategyKind::parse_override("code_aware").unwrap(),
            Some(StrategyKind::CodeAware)
        );
        assert_eq!(
            "sentences".parse::<StrategyKind>().unwrap(),
            StrategyKind::Fallback
        );
        assert!(matches!(
            "semantic".parse::<StrategyKind>(),
            Err(ChunkingError::StrategyNotFound { .. })
        ));
    }

    #[test]
    fn overlap_tolerance_floor() {
        let t = Thresholds::default();
        assert_eq!(t.overlap_tolerance(50), 10);
        assert_eq!(t.overlap_tolerance(300), 30);
    }

    #[test]
    fn partial_toml_like_input_uses_defaults() {
        let config: ChunkConfig =
            serde_json::from_str(r#"{"max_chunk_size": 800, "strategy_override": "table"}"#)
                .unwrap();
        assert_eq!(config.max_chunk_size, 800);
        assert_eq!(config.strategy_override, Some(StrategyKind::Table));
        assert_eq!(config.overlap_size, 200);
    }
}
