//! # Watchdog Judge
//!
//! Verdict synthesis for the watchdog pipeline: four escalating
//! strategies constrained by one shared invariant.
//!
//! ## Strategies
//!
//! | Strategy | Cost | Failure mode |
//! |----------|------|--------------|
//! | [`StaticStrategy`] | none | invalid input only |
//! | [`InferenceStrategy`] | one backend call | timeout / transport / malformed |
//! | [`ConsensusStrategy`] | N parallel backend calls | all sources abstain |
//! | [`HybridStrategy`] | consensus + one deep call | all sources abstain |
//!
//! Every strategy applies the confidence-bounding invariant
//! ([`ConfidenceBounds`]) before a judgment is final: a hard φ⁻¹ cap, and
//! a specificity-linked cap that allows less certainty the narrower the
//! claim. That invariant is the one rule no judgment path may bypass.
//!
//! ## Failure semantics
//!
//! External-call failures are caught where they happen and demoted to
//! abstentions. The only errors a caller sees are
//! [`JudgeError::NoSourcesAvailable`] (every source abstained — fall back
//! to [`StaticStrategy`]) and [`JudgeError::InvalidTrigger`] (caller
//! error).

pub mod axioms;
pub mod bound;
pub mod consensus;
pub mod error;
pub mod hybrid;
pub mod inference;
pub mod judgment;
pub mod phi;
pub mod specificity;
pub mod static_rules;
pub mod strategy;
pub mod transport;
pub mod verdict;

pub use axioms::Axiom;
pub use bound::{BoundOutcome, ConfidenceBounds, UncertaintyBand};
pub use consensus::{
    ConsensusOutcome, ConsensusPolicy, ConsensusStrategy, DissentEntry, TieBreak,
    DEFAULT_SOURCE_TIMEOUT,
};
pub use error::{JudgeError, Result};
pub use hybrid::{HybridOutcome, HybridStrategy, DEFAULT_DEEP_TIMEOUT};
pub use inference::{InferenceOptions, InferenceStrategy, DEFAULT_INFERENCE_TIMEOUT};
pub use judgment::{Judgment, JudgmentLog, JudgmentSource, Vote, DEFAULT_JUDGMENT_CAPACITY};
pub use specificity::{LexicalSpecificity, SpecificityEstimator};
pub use static_rules::StaticStrategy;
pub use strategy::{JudgmentItem, SourceJudge};
pub use transport::{InferenceReply, InferenceRequest, InferenceTransport};
pub use verdict::Verdict;
