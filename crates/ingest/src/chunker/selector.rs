use mdchunk_core::{ChunkConfig, ContentAnalysis, StrategyKind};

use super::strategies::Strategy;

/// Ordered strategies to attempt for a document.
///
/// An override goes first; the remaining applicable strategies follow in
/// priority order and `Fallback` always closes the list.
pub fn select_candidates(analysis: &ContentAnalysis, config: &ChunkConfig) -> Vec<StrategyKind> {
    let t = &config.thresholds;
    let mut candidates: Vec<StrategyKind> = config.strategy_override.into_iter().collect();

    for kind in StrategyKind::PRIORITY {
        if !candidates.contains(&kind) && kind.applies(analysis, t) {
            candidates.push(kind);
        }
    }
    if !candidates.contains(&StrategyKind::Fallback) {
        candidates.push(StrategyKind::Fallback);
    }
    candidates
}

/// First choice for a document, before any fail-over.
pub fn select_strategy(analysis: &ContentAnalysis, config: &ChunkConfig) -> StrategyKind {
    select_candidates(analysis, config)
        .first()
        .copied()
        .unwrap_or(StrategyKind::Fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis() -> ContentAnalysis {
        ContentAnalysis {
            total_chars: 1000,
            text_ratio: 1.0,
            paragraph_count: 4,
            ..Default::default()
        }
    }

    #[test]
    fn plain_text_goes_straight_to_fallback() {
        let config = ChunkConfig::default();
        assert_eq!(
            select_candidates(&analysis(), &config),
            vec![StrategyKind::Fallback]
        );
    }

    #[test]
    fn priority_order_is_respected() {
        let a = ContentAnalysis {
            code_ratio: 0.8,
            code_block_count: 4,
            header_count: 5,
            table_count: 3,
            ..analysis()
        };
        let config = ChunkConfig::default();
        assert_eq!(
            select_candidates(&a, &config),
            vec![
                StrategyKind::CodeAware,
                StrategyKind::Structural,
                StrategyKind::Table,
                StrategyKind::Fallback
            ]
        );
        assert_eq!(select_strategy(&a, &config), StrategyKind::CodeAware);
    }

    #[test]
    fn structural_needs_three_headers() {
        let config = ChunkConfig::default();
        let two = ContentAnalysis {
            header_count: 2,
            ..analysis()
        };
        assert_eq!(select_strategy(&two, &config), StrategyKind::Fallback);
        let three = ContentAnalysis {
            header_count: 3,
            ..analysis()
        };
        assert_eq!(select_strategy(&three, &config), StrategyKind::Structural);
    }

    #[test]
    fn override_short_circuits_selection() {
        let config = ChunkConfig {
            strategy_override: Some(StrategyKind::Table),
            ..Default::default()
        };
        let a = ContentAnalysis {
            header_count: 4,
            ..analysis()
        };
        assert_eq!(
            select_candidates(&a, &config),
            vec![
                StrategyKind::Table,
                StrategyKind::Structural,
                StrategyKind::Fallback
            ]
        );
    }
}
