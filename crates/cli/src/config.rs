use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use mdchunk_core::{ChunkConfig, OverlapDirection, StrategyKind, Thresholds};

/// CLI configuration loaded from TOML file.
///
/// Every field is optional; unset fields leave the environment or built-in
/// default in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub max_chunk_size: Option<usize>,
    pub min_chunk_size: Option<usize>,
    pub overlap_size: Option<usize>,
    pub enable_overlap: Option<bool>,
    pub overlap_direction: Option<OverlapDirection>,
    pub allow_oversize: Option<bool>,
    /// `auto` or a strategy name
    pub strategy: Option<String>,
    pub enable_hierarchy: Option<bool>,
    pub include_metadata: Option<bool>,
    pub strict: Option<bool>,
    /// Tuning constants, replaced as a whole when present
    pub thresholds: Option<Thresholds>,
}

impl CliConfig {
    /// Return the default config directory path: ~/.config/mdchunk/
    pub fn default_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("could not determine user config directory")?
            .join("mdchunk");
        Ok(config_dir)
    }

    /// Return the default config file path.
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::default_config_dir()?.join("config.toml"))
    }

    /// Load config from the given path, or the default path.
    /// Returns an empty config if the file does not exist.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = match path {
            Some(p) => PathBuf::from(p),
            None => Self::default_config_path()?,
        };

        if config_path.exists() {
            debug!(?config_path, "Loading config");
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read config: {}", config_path.display()))?;
            let config: Self = toml::from_str(&content)
                .with_context(|| format!("failed to parse config: {}", config_path.display()))?;
            Ok(config)
        } else {
            debug!(?config_path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Apply file settings on top of `config`.
    pub fn apply(&self, mut config: ChunkConfig) -> Result<ChunkConfig> {
        if let Some(v) = self.max_chunk_size {
            config.max_chunk_size = v;
        }
        if let Some(v) = self.min_chunk_size {
            config.min_chunk_size = v;
        }
        if let Some(v) = self.overlap_size {
            config.overlap_size = v;
        }
        if let Some(v) = self.enable_overlap {
            config.enable_overlap = v;
        }
        if let Some(v) = self.overlap_direction {
            config.overlap_direction = v;
        }
        if let Some(v) = self.allow_oversize {
            config.allow_oversize = v;
        }
        if let Some(name) = &self.strategy {
            config.strategy_override = StrategyKind::parse_override(name)
                .with_context(|| format!("invalid strategy in config: {name}"))?;
        }
        if let Some(v) = self.enable_hierarchy {
            config.enable_hierarchy = v;
        }
        if let Some(v) = self.include_metadata {
            config.include_metadata = v;
        }
        if let Some(v) = self.strict {
            config.strict = v;
        }
        if let Some(t) = &self.thresholds {
            config.thresholds = t.clone();
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_empty() {
        let config = CliConfig::default();
        assert_eq!(config.max_chunk_size, None);
        assert_eq!(
            config.apply(ChunkConfig::default()).unwrap(),
            ChunkConfig::default()
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "max_chunk_size = 1500\nstrategy = \"list_aware\"\noverlap_direction = \"next\"\n\n[thresholds]\nmin_headers = 5"
        )
        .unwrap();
        let config = CliConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.max_chunk_size, Some(1500));

        let chunk = config.apply(ChunkConfig::default()).unwrap();
        assert_eq!(chunk.max_chunk_size, 1500);
        assert_eq!(chunk.strategy_override, Some(StrategyKind::ListAware));
        assert_eq!(chunk.overlap_direction, OverlapDirection::Next);
        assert_eq!(chunk.thresholds.min_headers, 5);
        assert_eq!(chunk.thresholds.code_ratio, 0.7);
        assert_eq!(chunk.overlap_size, 200);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = CliConfig::load(path.to_str()).unwrap();
        assert_eq!(config, CliConfig::default());
        assert!(!path.exists());
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_chunk_size = \"big\"").unwrap();
        assert!(CliConfig::load(file.path().to_str()).is_err());
    }

    #[test]
    fn test_bad_strategy_is_an_error() {
        let config = CliConfig {
            strategy: Some("semantic".into()),
            ..Default::default()
        };
        assert!(config.apply(ChunkConfig::default()).is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = CliConfig {
            max_chunk_size: Some(900),
            strict: Some(true),
            ..Default::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: CliConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }
}
