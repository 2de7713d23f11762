//! Adaptive trigger thresholds.
//!
//! Each trigger category that counts observations has one numeric
//! threshold. Thresholds learn from judgment feedback, but only through
//! two narrow operations:
//!
//! - [`nudge`](ThresholdProfile::nudge) — a bounded step (at most
//!   [`THRESHOLD_MAX_STEP`] per call), clamped into
//!   `[THRESHOLD_MIN, THRESHOLD_MAX]`.
//! - [`decay`](ThresholdProfile::decay) — a fractional move back toward
//!   the static default.
//!
//! There is no raw write path. Updates are serialized through an internal
//! mutex so concurrent feedback events cannot interleave partial steps.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Lowest value any threshold may take.
pub const THRESHOLD_MIN: f64 = 1.0;

/// Hard ceiling for every threshold.
pub const THRESHOLD_MAX: f64 = 20.0;

/// Largest move a single nudge may make.
pub const THRESHOLD_MAX_STEP: f64 = 1.0;

/// The closed set of adaptive threshold categories.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ThresholdKey {
    /// Repeated same-signature errors needed to trigger.
    ErrorCount,
    /// Window success count needed to trigger a streak.
    SuccessCount,
    /// Same-target changes needed to trigger a rapid-change alert.
    RapidChangeCount,
}

impl ThresholdKey {
    /// Every key, in stable order.
    pub const ALL: [ThresholdKey; 3] = [
        ThresholdKey::ErrorCount,
        ThresholdKey::SuccessCount,
        ThresholdKey::RapidChangeCount,
    ];

    /// Stable string form used for persistence and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ErrorCount => "error.count",
            Self::SuccessCount => "success.count",
            Self::RapidChangeCount => "codeChange.rapidCount",
        }
    }

    /// Parses the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "error.count" => Some(Self::ErrorCount),
            "success.count" => Some(Self::SuccessCount),
            "codeChange.rapidCount" => Some(Self::RapidChangeCount),
            _ => None,
        }
    }

    /// The static default this key decays toward.
    pub fn default_value(&self) -> f64 {
        match self {
            Self::ErrorCount => 3.0,
            Self::SuccessCount => 5.0,
            Self::RapidChangeCount => 4.0,
        }
    }
}

impl std::fmt::Display for ThresholdKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-category adaptive thresholds with bounded updates.
///
/// Created at startup from persisted state or static defaults, mutated
/// only by the calibration loop, never deleted — only reset.
pub struct ThresholdProfile {
    values: Mutex<BTreeMap<ThresholdKey, f64>>,
}

impl ThresholdProfile {
    /// Creates a profile at the static defaults.
    pub fn new() -> Self {
        let values = ThresholdKey::ALL
            .iter()
            .map(|k| (*k, k.default_value()))
            .collect();
        Self {
            values: Mutex::new(values),
        }
    }

    /// Current threshold for `key`.
    pub fn get(&self, key: ThresholdKey) -> f64 {
        let values = self.lock();
        values.get(&key).copied().unwrap_or(key.default_value())
    }

    /// Applies a bounded step to `key` and returns the new value.
    ///
    /// The requested delta is clamped to `±THRESHOLD_MAX_STEP` and the
    /// result to `[THRESHOLD_MIN, THRESHOLD_MAX]`.
    pub fn nudge(&self, key: ThresholdKey, delta: f64) -> f64 {
        let step = delta.clamp(-THRESHOLD_MAX_STEP, THRESHOLD_MAX_STEP);
        let mut values = self.lock();
        let entry = values.entry(key).or_insert_with(|| key.default_value());
        let updated = (*entry + step).clamp(THRESHOLD_MIN, THRESHOLD_MAX);
        debug!(key = %key, from = *entry, to = updated, "threshold nudged");
        *entry = updated;
        updated
    }

    /// Moves `key` a fraction `rate` of the way back to its default.
    ///
    /// `rate` is clamped to `[0, 1]`. Returns the new value.
    pub fn decay(&self, key: ThresholdKey, rate: f64) -> f64 {
        let rate = rate.clamp(0.0, 1.0);
        let mut values = self.lock();
        let entry = values.entry(key).or_insert_with(|| key.default_value());
        let updated = *entry + (key.default_value() - *entry) * rate;
        *entry = updated.clamp(THRESHOLD_MIN, THRESHOLD_MAX);
        *entry
    }

    /// Stable snapshot for persistence, keyed by the string form.
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        let values = self.lock();
        values
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), *v))
            .collect()
    }

    /// Restores a persisted snapshot, clamping values into range and
    /// ignoring unknown keys.
    pub fn restore(&self, snapshot: &BTreeMap<String, f64>) {
        let mut values = self.lock();
        for (name, value) in snapshot {
            if let Some(key) = ThresholdKey::parse(name) {
                values.insert(key, value.clamp(THRESHOLD_MIN, THRESHOLD_MAX));
            }
        }
    }

    /// Resets every threshold to its static default.
    pub fn reset(&self) {
        let mut values = self.lock();
        for key in ThresholdKey::ALL {
            values.insert(key, key.default_value());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<ThresholdKey, f64>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ThresholdProfile {
    fn default() -> Self {
        Self::new()
    }
}
