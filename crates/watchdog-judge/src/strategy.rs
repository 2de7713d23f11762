//! Common strategy types: the item under judgment and the source seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use watchdog_observe::{Severity, Trigger, TriggerKind};

use crate::error::Result;
use crate::judgment::Judgment;

/// What a strategy is asked to judge.
///
/// Carries the trigger category, the subject, and a human-readable
/// summary of the matched observations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgmentItem {
    /// The trigger category.
    pub trigger: TriggerKind,
    /// What is being judged.
    pub subject: String,
    /// Summary of the matched observations.
    pub detail: String,
    /// Ids of the matched observations.
    pub observation_refs: Vec<u64>,
    /// How many observations matched the trigger rule.
    pub match_count: usize,
    /// Severity carried from a security observation.
    pub severity: Option<Severity>,
}

impl JudgmentItem {
    /// Builds an item from a matched trigger.
    pub fn from_trigger(trigger: &Trigger, detail: impl Into<String>) -> Self {
        Self {
            trigger: trigger.kind,
            subject: trigger.subject.clone(),
            detail: detail.into(),
            observation_refs: trigger.observation_refs.clone(),
            match_count: trigger.match_count,
            severity: trigger.severity,
        }
    }
}

/// Anything that can produce a judgment for an item.
///
/// Consensus fans out over a set of these; the deep-escalation backend is
/// one as well. Implementations must never hang — every path resolves to
/// a judgment or a typed error.
#[async_trait]
pub trait SourceJudge: Send + Sync {
    /// Stable identifier used in votes and logs.
    fn id(&self) -> &str;

    /// Judges the item, given extra free-text context.
    async fn judge(&self, item: &JudgmentItem, context: &str) -> Result<Judgment>;
}
