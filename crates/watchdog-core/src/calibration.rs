//! The calibration loop: learning trigger sensitivity from feedback.
//!
//! Each feedback event updates a smoothed accuracy metric and, on
//! repeated misses in one trigger category, nudges that category's
//! threshold by one bounded step:
//!
//! - a false trigger (wrong, with no correction or a milder one) raises
//!   the threshold, so it fires less;
//! - an under-call (wrong, with a more severe correction) lowers it, so
//!   the category surfaces earlier.
//!
//! Categories not involved in the feedback decay gently toward their
//! static defaults, so a profile drifts back to neutral absent evidence.

use std::collections::HashMap;

use tracing::{debug, info};

use watchdog_judge::Verdict;
use watchdog_observe::{ThresholdKey, ThresholdProfile, TriggerKind};
use watchdog_store::CalibrationState;

use crate::config::CalibrationSettings;

/// Ingests correctness feedback and steers the threshold profile.
pub struct CalibrationLoop {
    settings: CalibrationSettings,
    state: CalibrationState,
    miss_streaks: HashMap<TriggerKind, u32>,
}

impl CalibrationLoop {
    /// Creates a fresh loop.
    pub fn new(settings: CalibrationSettings) -> Self {
        Self::with_state(settings, CalibrationState::default())
    }

    /// Restores a loop from persisted state.
    pub fn with_state(settings: CalibrationSettings, state: CalibrationState) -> Self {
        Self {
            settings,
            state,
            miss_streaks: HashMap::new(),
        }
    }

    /// The current calibration state.
    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// Ingests one feedback event for an emitted judgment and applies
    /// any resulting threshold updates to `profile`.
    pub fn ingest(
        &mut self,
        profile: &ThresholdProfile,
        trigger: TriggerKind,
        emitted: Verdict,
        was_correct: bool,
        correction: Option<Verdict>,
    ) -> CalibrationState {
        let outcome = if was_correct { 1.0 } else { 0.0 };
        self.state.accuracy_ema = if self.state.accuracy_samples == 0 {
            outcome
        } else {
            self.settings.smoothing * outcome
                + (1.0 - self.settings.smoothing) * self.state.accuracy_ema
        };
        self.state.accuracy_samples += 1;

        if was_correct {
            self.miss_streaks.insert(trigger, 0);
        } else {
            self.register_miss(profile, trigger, emitted, correction);
        }

        // Untouched categories drift back toward their defaults.
        let touched = trigger.threshold_key();
        for key in ThresholdKey::ALL {
            if Some(key) != touched {
                profile.decay(key, self.settings.decay_rate);
            }
        }

        debug!(
            samples = self.state.accuracy_samples,
            ema = self.state.accuracy_ema,
            "feedback ingested"
        );
        self.state
    }

    fn register_miss(
        &mut self,
        profile: &ThresholdProfile,
        trigger: TriggerKind,
        emitted: Verdict,
        correction: Option<Verdict>,
    ) {
        let streak = self.miss_streaks.entry(trigger).or_insert(0);
        *streak += 1;
        if *streak < self.settings.miss_streak {
            return;
        }
        *streak = 0;

        let Some(key) = trigger.threshold_key() else {
            // Security and anomaly triggers have no count threshold to
            // steer.
            return;
        };

        let under_call = correction
            .map(|c| c.severity() > emitted.severity())
            .unwrap_or(false);
        let step = if under_call {
            -self.settings.nudge_step
        } else {
            self.settings.nudge_step
        };

        let updated = profile.nudge(key, step);
        info!(
            trigger = %trigger,
            key = %key,
            step,
            updated,
            "threshold recalibrated after repeated misses"
        );
    }

    /// Clears miss streaks and the accuracy metric.
    pub fn reset(&mut self) {
        self.state = CalibrationState::default();
        self.miss_streaks.clear();
    }
}
