//! Multi-source consensus judgment.
//!
//! The same item goes to every configured source in parallel; successful
//! answers become votes, failures become abstentions. The majority
//! verdict wins, and agreement strength decides whether consensus was
//! reached against the φ⁻¹ threshold.
//!
//! ## Voting rules
//!
//! - Fan-out is "wait for all, keep successes" — a slow or failing
//!   source never blocks or fails the round, it just abstains.
//! - Tallying is order-independent; tie-breaking is not. Ties between
//!   equal-count verdicts fall to the configured [`TieBreak`] policy,
//!   defaulting to first-successful-response order.
//! - Aggregate score, confidence, and axiom sub-scores are arithmetic
//!   means across *all* votes, majority and dissent alike.
//! - Agreement above the threshold boosts confidence proportionally to
//!   the surplus; agreement below it discounts confidence by the ratio.
//!   The bounding invariant applies either way.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, warn};

use watchdog_observe::Clock;

use crate::axioms::Axiom;
use crate::bound::ConfidenceBounds;
use crate::error::{JudgeError, Result};
use crate::judgment::{Judgment, JudgmentSource, Vote};
use crate::phi::CONSENSUS_THRESHOLD;
use crate::specificity::SpecificityEstimator;
use crate::strategy::{JudgmentItem, SourceJudge};
use crate::verdict::Verdict;

/// Default per-source timeout.
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(30);

/// How equal-count majority ties are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The verdict whose vote arrived first wins.
    FirstSeen,
    /// The tied verdict with the highest mean q-score wins.
    HighestMeanScore,
}

/// Tunables for a consensus round.
#[derive(Debug, Clone)]
pub struct ConsensusPolicy {
    /// Minimum agreement ratio for consensus (inclusive).
    pub threshold: f64,
    /// Per-source timeout.
    pub source_timeout: Duration,
    /// Tie-break policy.
    pub tie_break: TieBreak,
}

impl ConsensusPolicy {
    /// The φ-derived defaults: threshold 0.618, 30 s per source,
    /// first-seen tie-break.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            threshold: CONSENSUS_THRESHOLD,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
            tie_break: TieBreak::FirstSeen,
        }
    }

    /// Sets the agreement threshold.
    ///
    /// # Panics
    ///
    /// Panics if `threshold` is outside `[0, 1]`.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&threshold),
            "threshold must be between 0.0 and 1.0"
        );
        self.threshold = threshold;
        self
    }

    /// Sets the per-source timeout.
    #[must_use]
    pub const fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    /// Sets the tie-break policy.
    #[must_use]
    pub const fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }
}

impl Default for ConsensusPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// A non-majority verdict and how many votes it drew.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DissentEntry {
    /// The dissenting verdict.
    pub verdict: Verdict,
    /// Number of votes it received.
    pub count: usize,
}

/// Result of a consensus round.
#[derive(Debug, Clone)]
pub struct ConsensusOutcome {
    /// Whether the agreement ratio met the threshold.
    pub consensus_reached: bool,
    /// `majority_count / total_votes`.
    pub agreement_ratio: f64,
    /// The aggregated judgment.
    pub judgment: Judgment,
    /// Every successful vote, in arrival order.
    pub votes: Vec<Vote>,
    /// Non-majority verdicts with counts, in arrival order.
    pub dissent: Vec<DissentEntry>,
}

/// Parallel fan-out judgment over N independent sources.
pub struct ConsensusStrategy {
    sources: Vec<Arc<dyn SourceJudge>>,
    policy: ConsensusPolicy,
    clock: Arc<dyn Clock>,
    bounds: ConfidenceBounds,
    specificity: Arc<dyn SpecificityEstimator>,
}

impl ConsensusStrategy {
    /// Creates a strategy over the given sources with default policy.
    pub fn new(
        sources: Vec<Arc<dyn SourceJudge>>,
        clock: Arc<dyn Clock>,
        specificity: Arc<dyn SpecificityEstimator>,
    ) -> Self {
        Self {
            sources,
            policy: ConsensusPolicy::new(),
            clock,
            bounds: ConfidenceBounds::new(),
            specificity,
        }
    }

    /// Overrides the policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ConsensusPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Number of configured sources.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Runs one consensus round.
    ///
    /// # Errors
    ///
    /// [`JudgeError::NoSourcesAvailable`] when no source produced a vote
    /// (none configured, or all abstained). The caller is expected to
    /// fall back to static scoring.
    pub async fn judge(&self, item: &JudgmentItem, context: &str) -> Result<ConsensusOutcome> {
        if self.sources.is_empty() {
            return Err(JudgeError::NoSourcesAvailable);
        }

        let (votes, judgments) = self.fan_out(item, context).await;
        if votes.is_empty() {
            warn!(trigger = %item.trigger, "every consensus source abstained");
            return Err(JudgeError::NoSourcesAvailable);
        }

        Ok(self.aggregate(item, votes, judgments))
    }

    /// Fans the item out to every source, each under its own timeout, and
    /// collects successes in completion order.
    async fn fan_out(
        &self,
        item: &JudgmentItem,
        context: &str,
    ) -> (Vec<Vote>, Vec<Judgment>) {
        let mut set = JoinSet::new();
        for source in &self.sources {
            let source = Arc::clone(source);
            let item = item.clone();
            let context = context.to_string();
            let per_source = self.policy.source_timeout;

            set.spawn(async move {
                let started = Instant::now();
                let result = tokio::time::timeout(per_source, source.judge(&item, &context)).await;
                let latency_ms = started.elapsed().as_millis() as u64;
                let outcome = match result {
                    Ok(inner) => inner,
                    Err(_) => Err(JudgeError::Timeout {
                        source_id: source.id().to_string(),
                        after_ms: per_source.as_millis() as u64,
                    }),
                };
                (source.id().to_string(), outcome, latency_ms)
            });
        }

        let mut votes = Vec::new();
        let mut judgments = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((source_id, Ok(judgment), latency_ms)) => {
                    debug!(source = %source_id, verdict = %judgment.verdict, latency_ms, "vote collected");
                    votes.push(Vote {
                        source_id,
                        verdict: judgment.verdict,
                        q_score: judgment.q_score,
                        confidence: judgment.confidence,
                        latency_ms,
                    });
                    judgments.push(judgment);
                }
                Ok((source_id, Err(error), _)) => {
                    warn!(source = %source_id, %error, "source abstained");
                }
                Err(error) => {
                    warn!(%error, "source task aborted");
                }
            }
        }

        (votes, judgments)
    }

    fn aggregate(
        &self,
        item: &JudgmentItem,
        votes: Vec<Vote>,
        judgments: Vec<Judgment>,
    ) -> ConsensusOutcome {
        let total = votes.len();
        let tally = Self::tally(&votes);
        let majority = self.pick_majority(&tally, &votes);
        let majority_count = tally
            .iter()
            .find(|(v, _)| *v == majority)
            .map(|(_, c)| *c)
            .unwrap_or(0);

        let agreement_ratio = majority_count as f64 / total as f64;
        let consensus_reached = agreement_ratio >= self.policy.threshold;

        let mean_q = votes.iter().map(|v| v.q_score).sum::<f64>() / total as f64;
        let mean_confidence = votes.iter().map(|v| v.confidence).sum::<f64>() / total as f64;

        let mut axiom_scores = BTreeMap::new();
        for axiom in Axiom::ALL {
            let scores: Vec<f64> = judgments
                .iter()
                .filter_map(|j| j.axiom_scores.get(&axiom).copied())
                .collect();
            if !scores.is_empty() {
                axiom_scores.insert(axiom, scores.iter().sum::<f64>() / scores.len() as f64);
            }
        }

        // Agreement surplus boosts confidence; dissent discounts it.
        let desired = if consensus_reached {
            mean_confidence * (1.0 + (agreement_ratio - self.policy.threshold))
        } else {
            mean_confidence * agreement_ratio
        };

        let reason = format!(
            "{}/{} sources voted {} (agreement {:.0}%)",
            majority_count,
            total,
            majority,
            agreement_ratio * 100.0
        );
        let recommendation = judgments
            .iter()
            .find(|j| j.verdict == majority)
            .map(|j| j.recommendation.clone())
            .unwrap_or_default();

        let bounded = self.bounds.bound(desired, self.specificity.estimate(&reason));

        let dissent: Vec<DissentEntry> = tally
            .iter()
            .filter(|(v, _)| *v != majority)
            .map(|(verdict, count)| DissentEntry {
                verdict: *verdict,
                count: *count,
            })
            .collect();

        debug!(
            majority = %majority,
            agreement_ratio,
            consensus_reached,
            votes = total,
            "consensus round aggregated"
        );

        let mut judgment = Judgment::new(item.trigger, &item.subject, self.clock.now_millis());
        judgment.verdict = majority;
        judgment.reason = reason;
        judgment.confidence = bounded.confidence;
        judgment.q_score = mean_q;
        judgment.axiom_scores = axiom_scores;
        judgment.observation_refs = item.observation_refs.clone();
        judgment.recommendation = recommendation;
        judgment.source = JudgmentSource::Consensus;
        judgment.votes = votes.clone();
        judgment.band = bounded.band;

        ConsensusOutcome {
            consensus_reached,
            agreement_ratio,
            judgment,
            votes,
            dissent,
        }
    }

    /// Verdict counts in first-seen order.
    fn tally(votes: &[Vote]) -> Vec<(Verdict, usize)> {
        let mut tally: Vec<(Verdict, usize)> = Vec::new();
        for vote in votes {
            match tally.iter_mut().find(|(v, _)| *v == vote.verdict) {
                Some(entry) => entry.1 += 1,
                None => tally.push((vote.verdict, 1)),
            }
        }
        tally
    }

    fn pick_majority(&self, tally: &[(Verdict, usize)], votes: &[Vote]) -> Verdict {
        let top = tally.iter().map(|(_, c)| *c).max().unwrap_or(0);
        let tied: Vec<Verdict> = tally
            .iter()
            .filter(|(_, c)| *c == top)
            .map(|(v, _)| *v)
            .collect();

        if tied.len() == 1 {
            return tied[0];
        }

        // `tally` preserves arrival order, so the first tied entry is the
        // first-seen verdict.
        let first_seen = tied[0];
        match self.policy.tie_break {
            TieBreak::FirstSeen => first_seen,
            TieBreak::HighestMeanScore => {
                let mean_for = |verdict: Verdict| {
                    let scores: Vec<f64> = votes
                        .iter()
                        .filter(|v| v.verdict == verdict)
                        .map(|v| v.q_score)
                        .collect();
                    scores.iter().sum::<f64>() / scores.len() as f64
                };
                tied.into_iter()
                    .max_by(|a, b| {
                        mean_for(*a)
                            .partial_cmp(&mean_for(*b))
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .unwrap_or(first_seen)
            }
        }
    }
}
