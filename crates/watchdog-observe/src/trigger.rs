//! Trigger evaluation: deciding *when* the pipeline should judge.
//!
//! The evaluator runs synchronously after every recorded observation and
//! produces at most one [`Trigger`] per call.
//!
//! ## Rule order
//!
//! Rules are checked in a fixed order; the first match wins. The order is
//! part of the contract because it decides which trigger fires when
//! several conditions hold at once.
//!
//! | # | Rule | Condition |
//! |---|------|-----------|
//! | 1 | Error pattern | same-signature error count ≥ `error.count` |
//! | 2 | Success streak | window success count ≥ `success.count`, de-duped over 10 min |
//! | 3 | Security | any security observation (immediate) |
//! | 4 | Rapid change | same-target change count ≥ `codeChange.rapidCount` |
//! | 5 | Anomaly | any anomaly observation (immediate) |
//!
//! All count comparisons are inclusive (`≥`). The global cooldown gates
//! everything and is absolute: no rule overrides it. It is measured from
//! the last *emitted* judgment — the owning pipeline calls
//! [`TriggerEvaluator::note_emitted`] only after a judgment actually went
//! out, so evaluations that produced nothing never push the cooldown.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::observation::{Observation, ObservationKind, Severity};
use crate::store::ObservationStore;
use crate::thresholds::{ThresholdKey, ThresholdProfile};

/// Default minimum spacing between two emitted judgments.
pub const DEFAULT_COOLDOWN_MS: u64 = 30_000;

/// Default width of the recent-observation window.
pub const DEFAULT_WINDOW_MS: u64 = 300_000;

/// Default de-duplication window for success-streak triggers.
pub const DEFAULT_STREAK_DEDUP_MS: u64 = 600_000;

/// The closed set of trigger categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Repeated errors sharing one signature.
    ErrorPattern,
    /// A run of successes worth acknowledging.
    SuccessStreak,
    /// A security signal.
    Security,
    /// A burst of changes to one resource.
    RapidChange,
    /// A behavioral anomaly.
    Anomaly,
}

impl TriggerKind {
    /// Stable string form used in judgments and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ErrorPattern => "error_pattern",
            Self::SuccessStreak => "success_streak",
            Self::Security => "security",
            Self::RapidChange => "rapid_change",
            Self::Anomaly => "anomaly",
        }
    }

    /// The adaptive threshold this category reads, if it counts anything.
    pub fn threshold_key(&self) -> Option<ThresholdKey> {
        match self {
            Self::ErrorPattern => Some(ThresholdKey::ErrorCount),
            Self::SuccessStreak => Some(ThresholdKey::SuccessCount),
            Self::RapidChange => Some(ThresholdKey::RapidChangeCount),
            Self::Security | Self::Anomaly => None,
        }
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A matched trigger: why a judgment should be produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    /// The matched category.
    pub kind: TriggerKind,
    /// What the judgment is about (signature or target).
    pub subject: String,
    /// Ids of the observations that matched the rule.
    pub observation_refs: Vec<u64>,
    /// How many observations matched. Calibration consumes this as the
    /// category's match pressure; the evaluator never writes thresholds.
    pub match_count: usize,
    /// Severity carried through from a security observation.
    pub severity: Option<Severity>,
}

/// Timing policy for the evaluator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerPolicy {
    /// Minimum spacing between emitted judgments.
    pub cooldown_ms: u64,
    /// Width of the recent-observation window.
    pub window_ms: u64,
    /// Independent de-dup window for success streaks.
    pub streak_dedup_ms: u64,
}

impl TriggerPolicy {
    /// Creates the default policy (30 s cooldown, 5 min window, 10 min
    /// streak de-dup).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            window_ms: DEFAULT_WINDOW_MS,
            streak_dedup_ms: DEFAULT_STREAK_DEDUP_MS,
        }
    }

    /// Sets the cooldown window.
    #[must_use]
    pub const fn with_cooldown_ms(mut self, cooldown_ms: u64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    /// Sets the recent-observation window.
    #[must_use]
    pub const fn with_window_ms(mut self, window_ms: u64) -> Self {
        self.window_ms = window_ms;
        self
    }

    /// Sets the success-streak de-dup window.
    #[must_use]
    pub const fn with_streak_dedup_ms(mut self, streak_dedup_ms: u64) -> Self {
        self.streak_dedup_ms = streak_dedup_ms;
        self
    }
}

impl Default for TriggerPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Decides whether an observation should fire a judgment.
///
/// One evaluator per pipeline. Not thread-safe; the pipeline processes
/// observations to completion one at a time, which is what preserves the
/// cooldown and ordering invariants.
pub struct TriggerEvaluator {
    policy: TriggerPolicy,
    last_emitted_ms: Option<u64>,
    last_streak_ms: Option<u64>,
}

impl TriggerEvaluator {
    /// Creates an evaluator with the given policy.
    pub fn new(policy: TriggerPolicy) -> Self {
        Self {
            policy,
            last_emitted_ms: None,
            last_streak_ms: None,
        }
    }

    /// Evaluates a freshly recorded observation against the recent window.
    ///
    /// Returns the first matching trigger, or `None` when nothing matched
    /// or the cooldown is still open. The observation must already be in
    /// the store (its own occurrence counts toward the thresholds).
    pub fn evaluate(
        &self,
        store: &ObservationStore,
        profile: &ThresholdProfile,
        observation: &Observation,
    ) -> Option<Trigger> {
        let now = observation.timestamp_ms;

        if let Some(last) = self.last_emitted_ms {
            if now.saturating_sub(last) < self.policy.cooldown_ms {
                debug!(kind = %observation.kind, "trigger suppressed by cooldown");
                return None;
            }
        }

        let window = store.recent(now.saturating_sub(self.policy.window_ms));

        self.match_error_pattern(&window, profile, observation)
            .or_else(|| self.match_success_streak(&window, profile, observation, now))
            .or_else(|| Self::match_security(observation))
            .or_else(|| self.match_rapid_change(&window, profile, observation))
            .or_else(|| Self::match_anomaly(observation))
    }

    /// Records that a judgment was actually emitted for `kind` at
    /// `timestamp_ms`. Starts the cooldown, and the streak de-dup clock
    /// for success triggers.
    pub fn note_emitted(&mut self, kind: TriggerKind, timestamp_ms: u64) {
        self.last_emitted_ms = Some(timestamp_ms);
        if kind == TriggerKind::SuccessStreak {
            self.last_streak_ms = Some(timestamp_ms);
        }
    }

    /// When the last judgment was emitted, if any.
    pub fn last_emitted_ms(&self) -> Option<u64> {
        self.last_emitted_ms
    }

    /// Clears cooldown and de-dup state.
    pub fn reset(&mut self) {
        self.last_emitted_ms = None;
        self.last_streak_ms = None;
    }

    fn match_error_pattern(
        &self,
        window: &[&Observation],
        profile: &ThresholdProfile,
        observation: &Observation,
    ) -> Option<Trigger> {
        if observation.kind != ObservationKind::Error {
            return None;
        }

        let refs: Vec<u64> = window
            .iter()
            .filter(|o| o.kind == ObservationKind::Error && o.signature == observation.signature)
            .map(|o| o.id)
            .collect();

        let threshold = profile.get(ThresholdKey::ErrorCount);
        if (refs.len() as f64) < threshold {
            return None;
        }

        debug!(signature = %observation.signature, count = refs.len(), "error pattern trigger");
        Some(Trigger {
            kind: TriggerKind::ErrorPattern,
            subject: observation.signature.clone(),
            match_count: refs.len(),
            observation_refs: refs,
            severity: None,
        })
    }

    fn match_success_streak(
        &self,
        window: &[&Observation],
        profile: &ThresholdProfile,
        observation: &Observation,
        now: u64,
    ) -> Option<Trigger> {
        if observation.kind != ObservationKind::Success {
            return None;
        }

        // Independent de-dup clock, distinct from the global cooldown.
        if let Some(last) = self.last_streak_ms {
            if now.saturating_sub(last) < self.policy.streak_dedup_ms {
                return None;
            }
        }

        let refs: Vec<u64> = window
            .iter()
            .filter(|o| o.kind == ObservationKind::Success)
            .map(|o| o.id)
            .collect();

        let threshold = profile.get(ThresholdKey::SuccessCount);
        if (refs.len() as f64) < threshold {
            return None;
        }

        debug!(count = refs.len(), "success streak trigger");
        Some(Trigger {
            kind: TriggerKind::SuccessStreak,
            subject: observation.signature.clone(),
            match_count: refs.len(),
            observation_refs: refs,
            severity: None,
        })
    }

    fn match_security(observation: &Observation) -> Option<Trigger> {
        if observation.kind != ObservationKind::Security {
            return None;
        }

        // Immediate trigger: bypasses counts, still cooldown-gated above.
        debug!(signature = %observation.signature, severity = ?observation.severity, "security trigger");
        Some(Trigger {
            kind: TriggerKind::Security,
            subject: observation.signature.clone(),
            observation_refs: vec![observation.id],
            match_count: 1,
            severity: observation.severity,
        })
    }

    fn match_rapid_change(
        &self,
        window: &[&Observation],
        profile: &ThresholdProfile,
        observation: &Observation,
    ) -> Option<Trigger> {
        if observation.kind != ObservationKind::CodeChange {
            return None;
        }
        let target = observation.target.as_deref()?;

        let refs: Vec<u64> = window
            .iter()
            .filter(|o| o.kind == ObservationKind::CodeChange && o.target.as_deref() == Some(target))
            .map(|o| o.id)
            .collect();

        let threshold = profile.get(ThresholdKey::RapidChangeCount);
        if (refs.len() as f64) < threshold {
            return None;
        }

        debug!(target = %target, count = refs.len(), "rapid change trigger");
        Some(Trigger {
            kind: TriggerKind::RapidChange,
            subject: target.to_string(),
            match_count: refs.len(),
            observation_refs: refs,
            severity: None,
        })
    }

    fn match_anomaly(observation: &Observation) -> Option<Trigger> {
        if observation.kind != ObservationKind::Anomaly {
            return None;
        }

        debug!(signature = %observation.signature, "anomaly trigger");
        Some(Trigger {
            kind: TriggerKind::Anomaly,
            subject: observation.signature.clone(),
            observation_refs: vec![observation.id],
            match_count: 1,
            severity: None,
        })
    }
}
