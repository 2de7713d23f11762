//! Deterministic rule-based scoring.
//!
//! The cheapest strategy and the fallback of last resort: no I/O, no
//! failure modes beyond malformed input. Each trigger category maps to a
//! fixed verdict band and a fixed axiom-score table; repetition moves the
//! score within the band, never out of it.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use watchdog_observe::{Clock, Severity, TriggerKind};

use crate::axioms::Axiom;
use crate::bound::ConfidenceBounds;
use crate::error::{JudgeError, Result};
use crate::judgment::{Judgment, JudgmentSource};
use crate::phi::{geometric_mean, GROWL_MIN, HOWL_MIN, MAX_CONFIDENCE, UNIT_CONFIDENCE, WAG_MIN};
use crate::specificity::SpecificityEstimator;
use crate::strategy::JudgmentItem;
use crate::verdict::Verdict;

/// Deterministic judgment scorer.
pub struct StaticStrategy {
    clock: Arc<dyn Clock>,
    bounds: ConfidenceBounds,
    specificity: Arc<dyn SpecificityEstimator>,
}

impl StaticStrategy {
    /// Creates a scorer with the default bounds.
    pub fn new(clock: Arc<dyn Clock>, specificity: Arc<dyn SpecificityEstimator>) -> Self {
        Self {
            clock,
            bounds: ConfidenceBounds::new(),
            specificity,
        }
    }

    /// Scores a triggered item.
    ///
    /// # Errors
    ///
    /// [`JudgeError::InvalidTrigger`] when the item carries no matched
    /// observations — that is caller error, not a degradation case.
    pub fn score(&self, item: &JudgmentItem) -> Result<Judgment> {
        if item.observation_refs.is_empty() || item.match_count == 0 {
            return Err(JudgeError::InvalidTrigger(format!(
                "{} trigger with no matched observations",
                item.trigger
            )));
        }

        let (verdict, axiom_scores, reason, recommendation) = self.rule_for(item);

        let mut q_score = geometric_mean(&axiom_scores.values().copied().collect::<Vec<_>>());
        q_score += Self::repetition_shift(item);
        q_score = Self::clamp_into_band(q_score, verdict);

        let desired = (item.match_count as f64 * UNIT_CONFIDENCE).min(MAX_CONFIDENCE);
        let bounded = self
            .bounds
            .bound(desired, self.specificity.estimate(&reason));

        debug!(
            trigger = %item.trigger,
            verdict = %verdict,
            q_score,
            confidence = bounded.confidence,
            "static judgment scored"
        );

        let mut judgment = Judgment::new(item.trigger, &item.subject, self.clock.now_millis());
        judgment.verdict = verdict;
        judgment.reason = reason;
        judgment.confidence = bounded.confidence;
        judgment.q_score = q_score;
        judgment.axiom_scores = axiom_scores;
        judgment.observation_refs = item.observation_refs.clone();
        judgment.recommendation = recommendation;
        judgment.source = JudgmentSource::Static;
        judgment.band = bounded.band;
        Ok(judgment)
    }

    /// The fixed verdict band, axiom table, and wording for a category.
    fn rule_for(
        &self,
        item: &JudgmentItem,
    ) -> (Verdict, BTreeMap<Axiom, f64>, String, String) {
        match item.trigger {
            TriggerKind::ErrorPattern => (
                Verdict::Growl,
                Self::axiom_table([45.0, 50.0, 55.0, 50.0, 40.0]),
                format!(
                    "{} errors sharing signature '{}' in the recent window",
                    item.match_count, item.subject
                ),
                "Inspect the failing operation before retrying it again".to_string(),
            ),
            TriggerKind::SuccessStreak => (
                Verdict::Wag,
                Self::axiom_table([70.0, 72.0, 68.0, 70.0, 66.0]),
                format!("{} successes in the recent window", item.match_count),
                "Current approach is working; keep it".to_string(),
            ),
            TriggerKind::Security => {
                if item.severity == Some(Severity::Critical) {
                    (
                        Verdict::Howl,
                        Self::axiom_table([88.0, 90.0, 86.0, 85.0, 84.0]),
                        format!("critical security signal '{}'", item.subject),
                        "Stop and address the security signal immediately".to_string(),
                    )
                } else {
                    (
                        Verdict::Growl,
                        Self::axiom_table([44.0, 48.0, 52.0, 46.0, 42.0]),
                        format!("security signal '{}'", item.subject),
                        "Review the security signal before continuing".to_string(),
                    )
                }
            }
            TriggerKind::RapidChange => (
                Verdict::Bark,
                Self::axiom_table([30.0, 34.0, 32.0, 28.0, 30.0]),
                format!(
                    "{} changes to '{}' in the recent window",
                    item.match_count, item.subject
                ),
                "Slow down and verify the repeated edits to this resource".to_string(),
            ),
            TriggerKind::Anomaly => (
                Verdict::Bark,
                Self::axiom_table([26.0, 30.0, 28.0, 24.0, 26.0]),
                format!("behavioral anomaly '{}'", item.subject),
                "Investigate the deviation before it compounds".to_string(),
            ),
        }
    }

    fn axiom_table(values: [f64; 5]) -> BTreeMap<Axiom, f64> {
        Axiom::ALL.iter().copied().zip(values).collect()
    }

    /// Repetition moves the score within its band: repeated failures read
    /// worse, longer streaks read better.
    fn repetition_shift(item: &JudgmentItem) -> f64 {
        let extra = item.match_count.saturating_sub(1).min(8) as f64;
        match item.trigger {
            TriggerKind::ErrorPattern | TriggerKind::RapidChange => -1.5 * extra,
            TriggerKind::SuccessStreak => 1.0 * extra,
            TriggerKind::Security | TriggerKind::Anomaly => 0.0,
        }
    }

    fn clamp_into_band(q_score: f64, verdict: Verdict) -> f64 {
        match verdict {
            Verdict::Howl => q_score.clamp(HOWL_MIN, 100.0),
            Verdict::Wag => q_score.clamp(WAG_MIN, HOWL_MIN - 0.1),
            Verdict::Growl => q_score.clamp(GROWL_MIN, WAG_MIN - 0.1),
            Verdict::Bark => q_score.clamp(0.0, GROWL_MIN - 0.1),
        }
    }
}
