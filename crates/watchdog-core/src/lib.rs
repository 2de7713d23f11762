//! # Watchdog Core
//!
//! An autonomous judgment pipeline: it watches a stream of behavioral
//! observations and decides on its own when to render a scored,
//! confidence-bounded verdict.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WATCHDOG CORE                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │                   ┌──────────────┐                          │
//! │                   │   Watchdog   │  ← unified facade        │
//! │                   └──────┬───────┘                          │
//! │                          │                                  │
//! │        ┌─────────────────┼──────────────────┐               │
//! │        ▼                 ▼                  ▼               │
//! │ ┌─────────────┐  ┌──────────────┐  ┌───────────────┐        │
//! │ │  Observe    │  │    Judge     │  │  Calibration  │        │
//! │ │ store +     │  │ static /     │  │ EMA accuracy +│        │
//! │ │ thresholds +│  │ inference /  │  │ threshold     │        │
//! │ │ triggers    │  │ consensus /  │  │ nudges        │        │
//! │ │             │  │ hybrid       │  │               │        │
//! │ └─────────────┘  └──────────────┘  └───────────────┘        │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Control flow
//!
//! Observation → store → trigger evaluation (thresholds + cooldown) →
//! judgment strategy (degrading consensus → inference → static) →
//! confidence bounding → emitted judgment → later, external feedback →
//! calibration → threshold update.
//!
//! ## Guarantees
//!
//! - No emitted judgment exceeds the φ⁻¹ confidence cap, and none
//!   exceeds the specificity-linked certainty product.
//! - No two judgments are emitted inside one cooldown window.
//! - A triggered observation always yields a judgment — failures degrade
//!   down the strategy ladder — unless fallback is explicitly disabled.
//! - Threshold values never leave their clamp range, whatever the
//!   feedback sequence.

mod calibration;
mod config;
mod error;
mod watchdog;

pub use calibration::CalibrationLoop;
pub use config::{
    CalibrationSettings, ConsensusSettings, StoreSettings, StrategyMode, StrategySettings,
    TriggerSettings, WatchdogConfig,
};
pub use error::{Result, WatchdogError};
pub use watchdog::{JudgmentRefined, Watchdog};

// Re-export component types for convenience
pub use watchdog_judge::{
    Axiom, ConfidenceBounds, HybridOutcome, InferenceReply, InferenceRequest, InferenceTransport,
    JudgeError, Judgment, JudgmentItem, JudgmentSource, LexicalSpecificity, SourceJudge,
    SpecificityEstimator, TieBreak, UncertaintyBand, Verdict, Vote,
};
pub use watchdog_observe::{
    Clock, ManualClock, Observation, ObservationKind, Severity, SystemClock, ThresholdKey,
    ThresholdProfile, Trigger, TriggerKind,
};
pub use watchdog_store::{CalibrationState, StateStore, StoreError};
