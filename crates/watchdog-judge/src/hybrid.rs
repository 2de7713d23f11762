//! Hybrid escalation: consensus first, a deeper single call on dissent.
//!
//! When the fan-out fails to agree, one higher-cost backend gets a second
//! look — with the full vote and dissent record as added context — under
//! a materially longer timeout, because that call is expected to reason
//! harder. If no deep backend is configured (or it fails too), the weak
//! consensus result is returned with an explicit flag; the pipeline never
//! blocks on deep availability.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::consensus::{ConsensusStrategy, DissentEntry};
use crate::error::Result;
use crate::judgment::{Judgment, JudgmentSource, Vote};
use crate::strategy::{JudgmentItem, SourceJudge};

/// Default timeout for the deep-escalation call.
pub const DEFAULT_DEEP_TIMEOUT: Duration = Duration::from_secs(120);

/// Result of a hybrid judgment.
#[derive(Debug, Clone)]
pub struct HybridOutcome {
    /// The final judgment. Its `source` field records the path taken:
    /// `Consensus`, `Hybrid`, or `ConsensusWeak`.
    pub judgment: Judgment,
    /// Whether the initial consensus round reached agreement.
    pub consensus_reached: bool,
    /// Explicit warning flag: set when the result is an unresolved weak
    /// consensus.
    pub weak: bool,
    /// Agreement ratio of the consensus round.
    pub agreement_ratio: f64,
    /// Dissent record of the consensus round, kept for audit.
    pub dissent: Vec<DissentEntry>,
}

/// Consensus with deep-escalation fallback.
pub struct HybridStrategy {
    consensus: ConsensusStrategy,
    deep: Option<Arc<dyn SourceJudge>>,
    deep_timeout: Duration,
}

impl HybridStrategy {
    /// Creates a hybrid strategy without deep escalation.
    pub fn new(consensus: ConsensusStrategy) -> Self {
        Self {
            consensus,
            deep: None,
            deep_timeout: DEFAULT_DEEP_TIMEOUT,
        }
    }

    /// Configures the deep-escalation backend.
    #[must_use]
    pub fn with_deep(mut self, deep: Arc<dyn SourceJudge>) -> Self {
        self.deep = Some(deep);
        self
    }

    /// Overrides the deep-call timeout.
    #[must_use]
    pub const fn with_deep_timeout(mut self, timeout: Duration) -> Self {
        self.deep_timeout = timeout;
        self
    }

    /// Whether a deep backend is configured.
    pub fn has_deep(&self) -> bool {
        self.deep.is_some()
    }

    /// The underlying consensus strategy, for callers that want a round
    /// without escalation.
    pub fn consensus(&self) -> &ConsensusStrategy {
        &self.consensus
    }

    /// Runs consensus, escalating on disagreement.
    ///
    /// # Errors
    ///
    /// [`NoSourcesAvailable`](crate::JudgeError::NoSourcesAvailable) when
    /// the consensus round collected zero votes; the caller falls back to
    /// static scoring. A failing *deep* call is never an error — the weak
    /// consensus result is returned instead.
    pub async fn judge(&self, item: &JudgmentItem, context: &str) -> Result<HybridOutcome> {
        let outcome = self.consensus.judge(item, context).await?;

        if outcome.consensus_reached {
            debug!(
                agreement = outcome.agreement_ratio,
                "consensus reached, no escalation"
            );
            return Ok(HybridOutcome {
                judgment: outcome.judgment,
                consensus_reached: true,
                weak: false,
                agreement_ratio: outcome.agreement_ratio,
                dissent: outcome.dissent,
            });
        }

        if let Some(deep) = &self.deep {
            info!(
                deep = deep.id(),
                agreement = outcome.agreement_ratio,
                "consensus failed, escalating"
            );
            let escalation_context =
                Self::escalation_context(context, &outcome.votes, &outcome.dissent);

            match tokio::time::timeout(self.deep_timeout, deep.judge(item, &escalation_context))
                .await
            {
                Ok(Ok(mut judgment)) => {
                    judgment.source = JudgmentSource::Hybrid;
                    // Original votes ride along for audit.
                    judgment.votes = outcome.votes;
                    return Ok(HybridOutcome {
                        judgment,
                        consensus_reached: false,
                        weak: false,
                        agreement_ratio: outcome.agreement_ratio,
                        dissent: outcome.dissent,
                    });
                }
                Ok(Err(error)) => {
                    warn!(deep = deep.id(), %error, "deep escalation failed");
                }
                Err(_) => {
                    warn!(
                        deep = deep.id(),
                        timeout_ms = self.deep_timeout.as_millis() as u64,
                        "deep escalation timed out"
                    );
                }
            }
        }

        warn!(
            agreement = outcome.agreement_ratio,
            "returning weak consensus result"
        );
        let mut judgment = outcome.judgment;
        judgment.source = JudgmentSource::ConsensusWeak;
        Ok(HybridOutcome {
            judgment,
            consensus_reached: false,
            weak: true,
            agreement_ratio: outcome.agreement_ratio,
            dissent: outcome.dissent,
        })
    }

    /// Serializes the disagreement for the deep backend to resolve.
    fn escalation_context(context: &str, votes: &[Vote], dissent: &[DissentEntry]) -> String {
        let record = serde_json::json!({
            "votes": votes,
            "dissent": dissent,
        });
        if context.is_empty() {
            format!("The sources disagreed. Resolve the disagreement: {}", record)
        } else {
            format!(
                "{}\nThe sources disagreed. Resolve the disagreement: {}",
                context, record
            )
        }
    }
}
