//! Configuration types for the watchdog pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use watchdog_judge::consensus::TieBreak;
use watchdog_judge::phi::CONSENSUS_THRESHOLD;

/// Configuration for the full pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// Trigger evaluator settings.
    pub trigger: TriggerSettings,

    /// Consensus and escalation settings.
    pub consensus: ConsensusSettings,

    /// Feedback calibration settings.
    pub calibration: CalibrationSettings,

    /// Durable state settings.
    pub store: StoreSettings,

    /// Strategy selection.
    pub strategy: StrategySettings,
}

/// Trigger evaluator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerSettings {
    /// Minimum seconds between two emitted judgments.
    pub cooldown_secs: u64,

    /// Width of the recent-observation window in seconds.
    pub window_secs: u64,

    /// Success-streak de-dup window in seconds.
    pub streak_dedup_secs: u64,

    /// Observations retained in memory.
    pub observation_capacity: usize,

    /// Judgments retained in memory.
    pub judgment_capacity: usize,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            cooldown_secs: 30,
            window_secs: 300,
            streak_dedup_secs: 600,
            observation_capacity: 100,
            judgment_capacity: 50,
        }
    }
}

/// Consensus fan-out and deep-escalation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusSettings {
    /// Agreement ratio required for consensus (inclusive).
    pub threshold: f64,

    /// Per-source timeout in seconds.
    pub source_timeout_secs: u64,

    /// Deep-escalation timeout in seconds.
    pub deep_timeout_secs: u64,

    /// How equal-count majority ties are resolved.
    pub tie_break: TieBreak,
}

impl Default for ConsensusSettings {
    fn default() -> Self {
        Self {
            threshold: CONSENSUS_THRESHOLD,
            source_timeout_secs: 30,
            deep_timeout_secs: 120,
            tie_break: TieBreak::FirstSeen,
        }
    }
}

/// Feedback calibration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationSettings {
    /// EMA smoothing factor for the accuracy metric.
    pub smoothing: f64,

    /// Consecutive misses in one category before a threshold nudge.
    pub miss_streak: u32,

    /// Step requested per nudge (bounded by the profile anyway).
    pub nudge_step: f64,

    /// Fractional decay toward defaults for untouched categories, per
    /// feedback event.
    pub decay_rate: f64,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            smoothing: 0.3,
            miss_streak: 2,
            nudge_step: 1.0,
            decay_rate: 0.05,
        }
    }
}

/// Durable state settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Path to the state database.
    pub db_path: PathBuf,

    /// Whether to persist state at all. Off by default: the pipeline is
    /// fully functional in memory.
    pub persist: bool,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./watchdog_state.db"),
            persist: false,
        }
    }
}

/// Which judgment strategy the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyMode {
    /// Deterministic rule scoring only.
    Static,
    /// One inference backend, static fallback.
    Inference,
    /// Parallel consensus, static fallback.
    Consensus,
    /// Consensus with deep escalation, static fallback.
    Hybrid,
}

/// Strategy selection and degradation policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySettings {
    /// The strategy to run for triggered observations.
    pub mode: StrategyMode,

    /// Whether degradation to cheaper strategies is permitted. When
    /// false, a failed consensus/inference round surfaces its error
    /// instead of falling back to static scoring.
    pub fallback_enabled: bool,

    /// Publish a background inference refinement after each static
    /// judgment. The primary return path never waits for it.
    pub refine_in_background: bool,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            mode: StrategyMode::Static,
            fallback_enabled: true,
            refine_in_background: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WatchdogConfig::default();
        assert_eq!(config.trigger.cooldown_secs, 30);
        assert_eq!(config.strategy.mode, StrategyMode::Static);
        assert!(config.strategy.fallback_enabled);
        assert!(!config.store.persist);
        assert!((config.consensus.threshold - CONSENSUS_THRESHOLD).abs() < 1e-12);
    }

    #[test]
    fn test_config_serialization() {
        let config = WatchdogConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: WatchdogConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.trigger.window_secs, config.trigger.window_secs);
        assert_eq!(parsed.strategy.mode, config.strategy.mode);
    }

    #[test]
    fn test_strategy_mode_wire_names() {
        let json = serde_json::to_string(&StrategyMode::Hybrid).unwrap();
        assert_eq!(json, "\"hybrid\"");
    }
}
