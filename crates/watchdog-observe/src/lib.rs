//! # Watchdog Observe
//!
//! The perception layer of the watchdog pipeline: a bounded log of typed
//! behavioral observations, a profile of adaptive trigger thresholds, and
//! the evaluator that decides *when* a judgment should fire.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                 watchdog-observe                 │
//! │  ┌──────────────┬────────────────┬────────────┐  │
//! │  │ Observation  │   Threshold    │  Trigger   │  │
//! │  │    Store     │    Profile     │ Evaluator  │  │
//! │  └──────────────┴────────────────┴────────────┘  │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! Every recorded observation is immediately shown to the
//! [`TriggerEvaluator`], which consults the recent window in the
//! [`ObservationStore`] and the per-category thresholds in the
//! [`ThresholdProfile`] under a global cooldown. The evaluator only ever
//! says *whether and why* to judge; producing the scored verdict is the
//! judging layer's job.
//!
//! ## Invariants
//!
//! - The store preserves insertion order and evicts oldest-first.
//! - Threshold values move only through bounded steps and never leave
//!   their clamp range.
//! - Trigger rules are checked in a fixed order; the first match wins and
//!   at most one trigger is produced per observation.
//! - The cooldown is measured from the last *emitted* judgment, which the
//!   owning pipeline reports back via [`TriggerEvaluator::note_emitted`].

mod clock;
mod observation;
mod store;
mod thresholds;
mod trigger;

pub use clock::{Clock, ManualClock, SystemClock};
pub use observation::{Observation, ObservationKind, Severity};
pub use store::{ObservationStore, DEFAULT_OBSERVATION_CAPACITY};
pub use thresholds::{
    ThresholdKey, ThresholdProfile, THRESHOLD_MAX, THRESHOLD_MAX_STEP, THRESHOLD_MIN,
};
pub use trigger::{
    Trigger, TriggerEvaluator, TriggerKind, TriggerPolicy, DEFAULT_COOLDOWN_MS,
    DEFAULT_STREAK_DEDUP_MS, DEFAULT_WINDOW_MS,
};
