//! Judgment and vote records, plus the bounded judgment log.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use watchdog_observe::TriggerKind;

use crate::axioms::Axiom;
use crate::bound::UncertaintyBand;
use crate::verdict::Verdict;

/// Default number of retained judgments.
pub const DEFAULT_JUDGMENT_CAPACITY: usize = 50;

/// Which strategy produced a judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgmentSource {
    /// Deterministic rule scoring.
    Static,
    /// A single inference backend.
    Inference,
    /// Multi-source consensus that reached agreement.
    Consensus,
    /// Consensus that failed to reach agreement, returned anyway because
    /// no deep escalation was available.
    ConsensusWeak,
    /// Deep escalation after failed consensus.
    Hybrid,
}

impl JudgmentSource {
    /// Stable string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Inference => "inference",
            Self::Consensus => "consensus",
            Self::ConsensusWeak => "consensus_weak",
            Self::Hybrid => "hybrid",
        }
    }
}

impl std::fmt::Display for JudgmentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One backend's contribution to a consensus round.
///
/// Votes are embedded in the judgment that used them and never persisted
/// on their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    /// Which source cast the vote.
    pub source_id: String,
    /// The verdict the source arrived at.
    pub verdict: Verdict,
    /// The source's q-score.
    pub q_score: f64,
    /// The source's (already bounded) confidence.
    pub confidence: f64,
    /// How long the source took to answer.
    pub latency_ms: u64,
}

/// A scored, confidence-bounded verdict about an observed situation.
///
/// Immutable after creation. The confidence field has always passed the
/// bounding invariant before a judgment leaves its strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Judgment {
    /// Unique identifier.
    pub id: String,
    /// Creation time, milliseconds since the epoch.
    pub timestamp_ms: u64,
    /// The trigger category that caused this judgment.
    pub trigger: TriggerKind,
    /// The verdict band.
    pub verdict: Verdict,
    /// What was judged (signature, target, ...).
    pub subject: String,
    /// Why the verdict came out this way.
    pub reason: String,
    /// Bounded confidence in `[0, MAX_CONFIDENCE]`.
    pub confidence: f64,
    /// Aggregate quality score in `[0, 100]`.
    pub q_score: f64,
    /// Per-axiom sub-scores in `[0, 100]`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub axiom_scores: BTreeMap<Axiom, f64>,
    /// Ids of the observations the judgment rests on.
    pub observation_refs: Vec<u64>,
    /// Suggested follow-up.
    pub recommendation: String,
    /// Which strategy produced this judgment.
    pub source: JudgmentSource,
    /// Individual backend votes, for consensus-derived judgments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub votes: Vec<Vote>,
    /// Uncertainty classification reported by the bounding invariant.
    pub band: UncertaintyBand,
}

impl Judgment {
    /// Starts a judgment with a fresh id and neutral fields; strategies
    /// fill in the rest before emitting.
    pub fn new(trigger: TriggerKind, subject: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp_ms,
            trigger,
            verdict: Verdict::Growl,
            subject: subject.into(),
            reason: String::new(),
            confidence: 0.0,
            q_score: 0.0,
            axiom_scores: BTreeMap::new(),
            observation_refs: Vec::new(),
            recommendation: String::new(),
            source: JudgmentSource::Static,
            votes: Vec::new(),
            band: UncertaintyBand::Speculative,
        }
    }
}

/// Bounded FIFO log of emitted judgments.
pub struct JudgmentLog {
    capacity: usize,
    entries: VecDeque<Judgment>,
}

impl JudgmentLog {
    /// Creates a log with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_JUDGMENT_CAPACITY)
    }

    /// Creates a log retaining at most `capacity` judgments.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "judgment capacity must be nonzero");
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends a judgment, evicting the oldest past capacity.
    pub fn append(&mut self, judgment: Judgment) {
        self.entries.push_back(judgment);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Looks up a retained judgment by id.
    pub fn get(&self, id: &str) -> Option<&Judgment> {
        self.entries.iter().find(|j| j.id == id)
    }

    /// The most recently appended judgment.
    pub fn last(&self) -> Option<&Judgment> {
        self.entries.back()
    }

    /// All retained judgments, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Judgment> {
        self.entries.iter()
    }

    /// Number of retained judgments.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clears the log.
    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

impl Default for JudgmentLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(trigger: TriggerKind) -> Judgment {
        Judgment::new(trigger, "subject", 1_000)
    }

    #[test]
    fn test_judgment_ids_are_unique() {
        let a = sample(TriggerKind::ErrorPattern);
        let b = sample(TriggerKind::ErrorPattern);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_log_append_and_get() {
        let mut log = JudgmentLog::new();
        let judgment = sample(TriggerKind::Anomaly);
        let id = judgment.id.clone();
        log.append(judgment);
        assert!(log.get(&id).is_some());
        assert!(log.get("missing").is_none());
    }

    #[test]
    fn test_log_evicts_oldest() {
        let mut log = JudgmentLog::with_capacity(2);
        let first = sample(TriggerKind::Security);
        let first_id = first.id.clone();
        log.append(first);
        log.append(sample(TriggerKind::Security));
        log.append(sample(TriggerKind::Security));
        assert_eq!(log.len(), 2);
        assert!(log.get(&first_id).is_none());
    }

    #[test]
    fn test_log_reset() {
        let mut log = JudgmentLog::new();
        log.append(sample(TriggerKind::RapidChange));
        log.reset();
        assert!(log.is_empty());
    }

    #[test]
    fn test_judgment_serializes_flat() {
        let mut judgment = sample(TriggerKind::ErrorPattern);
        judgment.axiom_scores.insert(Axiom::Verify, 55.0);
        let json = serde_json::to_value(&judgment).unwrap();
        assert_eq!(json["trigger"], "error_pattern");
        assert_eq!(json["source"], "static");
        assert_eq!(json["axiom_scores"]["VERIFY"], 55.0);
    }
}
