//! The unified watchdog facade.
//!
//! [`Watchdog`] wires the perception layer (store, thresholds, trigger
//! evaluator) to the judging layer (static / inference / consensus /
//! hybrid) and the calibration loop. One call drives the whole pipeline:
//!
//! 1. record the observation,
//! 2. evaluate triggers under the cooldown,
//! 3. on a trigger, run the configured strategy — degrading
//!    consensus → inference → static unless fallback is disabled,
//! 4. emit the bounded judgment, stamp the cooldown, persist.
//!
//! A triggered observation therefore always yields a judgment, unless
//! the configuration explicitly forbids degradation.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use watchdog_judge::{
    ConsensusPolicy, ConsensusStrategy, HybridStrategy, InferenceOptions, InferenceStrategy,
    InferenceTransport, Judgment, JudgmentItem, JudgmentLog, JudgmentSource, LexicalSpecificity,
    SourceJudge, SpecificityEstimator, StaticStrategy, Verdict,
};
use watchdog_observe::{
    Clock, Observation, ObservationStore, SystemClock, ThresholdProfile, Trigger,
    TriggerEvaluator, TriggerPolicy,
};
use watchdog_store::{CalibrationState, StateStore};

use crate::calibration::CalibrationLoop;
use crate::config::{StrategyMode, WatchdogConfig};
use crate::error::{Result, WatchdogError};

/// Event published when a background refinement of an emitted judgment
/// completes.
#[derive(Debug, Clone)]
pub struct JudgmentRefined {
    /// Id of the judgment that was refined.
    pub original_id: String,
    /// The refined judgment (not appended to the log automatically).
    pub refined: Judgment,
}

/// The autonomous judgment pipeline.
///
/// Explicitly constructed and self-contained: tests build isolated
/// instances with a manual clock instead of sharing process state.
///
/// # Example
///
/// ```rust,ignore
/// let mut watchdog = Watchdog::new(WatchdogConfig::default())?;
///
/// let judgment = watchdog
///     .observe(Observation::new(ObservationKind::Error, "Edit:syntax"))
///     .await?;
/// if let Some(judgment) = judgment {
///     println!("{}: {}", judgment.verdict, judgment.reason);
/// }
/// ```
pub struct Watchdog {
    config: WatchdogConfig,
    clock: Arc<dyn Clock>,
    specificity: Arc<dyn SpecificityEstimator>,

    store: ObservationStore,
    profile: ThresholdProfile,
    evaluator: TriggerEvaluator,

    static_strategy: StaticStrategy,
    inference: Option<Arc<InferenceStrategy>>,
    sources: Vec<Arc<dyn SourceJudge>>,
    deep: Option<Arc<dyn SourceJudge>>,
    hybrid: Option<HybridStrategy>,

    log: JudgmentLog,
    state_store: Option<StateStore>,
    calibration: CalibrationLoop,
    refined_tx: Option<mpsc::Sender<JudgmentRefined>>,
}

impl Watchdog {
    /// Creates a pipeline on the system clock.
    pub fn new(config: WatchdogConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a pipeline on an injected clock.
    pub fn with_clock(config: WatchdogConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let specificity: Arc<dyn SpecificityEstimator> = Arc::new(LexicalSpecificity::new());

        let policy = TriggerPolicy::new()
            .with_cooldown_ms(config.trigger.cooldown_secs * 1_000)
            .with_window_ms(config.trigger.window_secs * 1_000)
            .with_streak_dedup_ms(config.trigger.streak_dedup_secs * 1_000);

        let store =
            ObservationStore::with_capacity(clock.clone(), config.trigger.observation_capacity);
        let profile = ThresholdProfile::new();

        let state_store = if config.store.persist {
            Some(StateStore::open(&config.store.db_path)?)
        } else {
            None
        };

        let mut calibration_state = CalibrationState::default();
        if let Some(state_store) = &state_store {
            if let Some(snapshot) = state_store.load_profile()? {
                profile.restore(&snapshot);
                debug!("threshold profile restored from store");
            }
            if let Some(persisted) = state_store.load_calibration()? {
                calibration_state = persisted;
            }
        }

        info!(mode = ?config.strategy.mode, "watchdog initialized");

        Ok(Self {
            static_strategy: StaticStrategy::new(clock.clone(), specificity.clone()),
            evaluator: TriggerEvaluator::new(policy),
            log: JudgmentLog::with_capacity(config.trigger.judgment_capacity),
            calibration: CalibrationLoop::with_state(
                config.calibration.clone(),
                calibration_state,
            ),
            inference: None,
            sources: Vec::new(),
            deep: None,
            hybrid: None,
            refined_tx: None,
            store,
            profile,
            state_store,
            specificity,
            clock,
            config,
        })
    }

    /// Registers the single inference backend (used by
    /// [`StrategyMode::Inference`] and background refinement).
    #[must_use]
    pub fn with_inference(mut self, transport: Arc<dyn InferenceTransport>) -> Self {
        let options = InferenceOptions {
            timeout: std::time::Duration::from_secs(self.config.consensus.source_timeout_secs),
            ..InferenceOptions::default()
        };
        self.inference = Some(Arc::new(
            InferenceStrategy::new(transport, self.clock.clone(), self.specificity.clone())
                .with_options(options),
        ));
        self
    }

    /// Registers the consensus source set.
    #[must_use]
    pub fn with_sources(mut self, sources: Vec<Arc<dyn SourceJudge>>) -> Self {
        self.sources = sources;
        self.rebuild_hybrid();
        self
    }

    /// Registers the deep-escalation backend.
    #[must_use]
    pub fn with_deep(mut self, deep: Arc<dyn SourceJudge>) -> Self {
        self.deep = Some(deep);
        self.rebuild_hybrid();
        self
    }

    /// Swaps in a domain-specific specificity estimator.
    #[must_use]
    pub fn with_specificity(mut self, specificity: Arc<dyn SpecificityEstimator>) -> Self {
        self.specificity = specificity.clone();
        self.static_strategy = StaticStrategy::new(self.clock.clone(), specificity);
        self.rebuild_hybrid();
        self
    }

    fn rebuild_hybrid(&mut self) {
        if self.sources.is_empty() {
            self.hybrid = None;
            return;
        }
        let policy = ConsensusPolicy::new()
            .with_threshold(self.config.consensus.threshold)
            .with_source_timeout(std::time::Duration::from_secs(
                self.config.consensus.source_timeout_secs,
            ))
            .with_tie_break(self.config.consensus.tie_break);
        let consensus = ConsensusStrategy::new(
            self.sources.clone(),
            self.clock.clone(),
            self.specificity.clone(),
        )
        .with_policy(policy);

        let mut hybrid = HybridStrategy::new(consensus).with_deep_timeout(
            std::time::Duration::from_secs(self.config.consensus.deep_timeout_secs),
        );
        if let Some(deep) = &self.deep {
            hybrid = hybrid.with_deep(deep.clone());
        }
        self.hybrid = Some(hybrid);
    }

    /// Feeds one observation through the full pipeline.
    ///
    /// Returns the emitted judgment when a trigger fired, `None` when
    /// nothing fired (no rule matched, or the cooldown is open).
    pub async fn observe(&mut self, draft: Observation) -> Result<Option<Judgment>> {
        let stored = self.store.record(draft);
        debug!(id = stored.id, kind = %stored.kind, "observation recorded");

        let Some(trigger) = self.evaluator.evaluate(&self.store, &self.profile, &stored) else {
            return Ok(None);
        };
        info!(kind = %trigger.kind, subject = %trigger.subject, "trigger fired");

        let item = self.build_item(&trigger);
        let judgment = self.run_strategy(&item).await?;
        self.emit(judgment).map(Some)
    }

    /// Ingests correctness feedback for an emitted judgment.
    ///
    /// # Errors
    ///
    /// [`WatchdogError::JudgmentNotFound`] when the id is not in the
    /// retained log — reported, non-fatal.
    pub fn record_feedback(
        &mut self,
        judgment_id: &str,
        was_correct: bool,
        correction: Option<Verdict>,
    ) -> Result<CalibrationState> {
        let (trigger, emitted) = match self.log.get(judgment_id) {
            Some(judgment) => (judgment.trigger, judgment.verdict),
            None => return Err(WatchdogError::JudgmentNotFound(judgment_id.to_string())),
        };

        let state =
            self.calibration
                .ingest(&self.profile, trigger, emitted, was_correct, correction);

        if let Some(state_store) = &self.state_store {
            state_store.save_profile(&self.profile)?;
            state_store.save_calibration(&state)?;
        }
        Ok(state)
    }

    /// Opens the refinement channel. Events arrive only when
    /// `strategy.refine_in_background` is on and an inference backend is
    /// registered.
    pub fn refinements(&mut self) -> mpsc::Receiver<JudgmentRefined> {
        let (tx, rx) = mpsc::channel(16);
        self.refined_tx = Some(tx);
        rx
    }

    /// The retained judgment log.
    pub fn judgment_log(&self) -> &JudgmentLog {
        &self.log
    }

    /// The adaptive threshold profile.
    pub fn profile(&self) -> &ThresholdProfile {
        &self.profile
    }

    /// The current calibration state.
    pub fn calibration_state(&self) -> CalibrationState {
        self.calibration.state()
    }

    /// Number of retained observations.
    pub fn observation_count(&self) -> usize {
        self.store.len()
    }

    /// Clears all in-memory state: observations, judgments, cooldown,
    /// thresholds, calibration.
    pub fn reset(&mut self) {
        self.store.reset();
        self.evaluator.reset();
        self.log.reset();
        self.profile.reset();
        self.calibration.reset();
    }

    fn build_item(&self, trigger: &Trigger) -> JudgmentItem {
        let detail: Vec<String> = trigger
            .observation_refs
            .iter()
            .filter_map(|id| self.store.get(*id))
            .take(5)
            .map(|o| format!("{} {}", o.kind, o.signature))
            .collect();
        JudgmentItem::from_trigger(trigger, detail.join("; "))
    }

    /// Runs the configured strategy with the degradation ladder.
    async fn run_strategy(&self, item: &JudgmentItem) -> Result<Judgment> {
        match self.config.strategy.mode {
            StrategyMode::Static => Ok(self.static_strategy.score(item)?),
            StrategyMode::Inference => self.run_inference(item).await,
            StrategyMode::Consensus | StrategyMode::Hybrid => self.run_consensus(item).await,
        }
    }

    async fn run_inference(&self, item: &JudgmentItem) -> Result<Judgment> {
        if let Some(inference) = &self.inference {
            match inference.judge(item, "").await {
                Ok(judgment) => return Ok(judgment),
                Err(error) if error.is_abstention() => {
                    if !self.config.strategy.fallback_enabled {
                        return Err(error.into());
                    }
                    warn!(%error, "inference failed, degrading to static");
                }
                Err(error) => return Err(error.into()),
            }
        } else if !self.config.strategy.fallback_enabled {
            return Err(WatchdogError::Config(
                "inference mode selected but no transport registered".to_string(),
            ));
        }
        Ok(self.static_strategy.score(item)?)
    }

    async fn run_consensus(&self, item: &JudgmentItem) -> Result<Judgment> {
        if let Some(hybrid) = &self.hybrid {
            let escalate = self.config.strategy.mode == StrategyMode::Hybrid;
            let result = if escalate {
                hybrid.judge(item, "").await.map(|outcome| outcome.judgment)
            } else {
                hybrid
                    .consensus()
                    .judge(item, "")
                    .await
                    .map(|outcome| outcome.judgment)
            };
            match result {
                Ok(judgment) => return Ok(judgment),
                Err(error) => {
                    if !self.config.strategy.fallback_enabled {
                        return Err(error.into());
                    }
                    warn!(%error, "consensus failed, degrading to static");
                }
            }
        } else if !self.config.strategy.fallback_enabled {
            return Err(WatchdogError::Config(
                "consensus mode selected but no sources registered".to_string(),
            ));
        }
        Ok(self.static_strategy.score(item)?)
    }

    fn emit(&mut self, judgment: Judgment) -> Result<Judgment> {
        self.evaluator
            .note_emitted(judgment.trigger, judgment.timestamp_ms);

        if let Some(state_store) = &self.state_store {
            state_store.append_judgment(&judgment)?;
        }
        self.log.append(judgment.clone());

        info!(
            id = %judgment.id,
            verdict = %judgment.verdict,
            source = %judgment.source,
            confidence = judgment.confidence,
            "judgment emitted"
        );

        self.spawn_refinement(&judgment);
        Ok(judgment)
    }

    /// Schedules the fire-and-forget refinement pass. The emitted
    /// judgment is already final; the refinement only publishes an event.
    fn spawn_refinement(&self, judgment: &Judgment) {
        if !self.config.strategy.refine_in_background {
            return;
        }
        if judgment.source != JudgmentSource::Static {
            return;
        }
        let (Some(inference), Some(tx)) = (self.inference.clone(), self.refined_tx.clone())
        else {
            return;
        };

        let item = JudgmentItem {
            trigger: judgment.trigger,
            subject: judgment.subject.clone(),
            detail: judgment.reason.clone(),
            observation_refs: judgment.observation_refs.clone(),
            match_count: judgment.observation_refs.len().max(1),
            severity: None,
        };
        let original_id = judgment.id.clone();

        tokio::spawn(async move {
            match inference.judge(&item, "Refine this earlier rule-based judgment.").await {
                Ok(refined) => {
                    let _ = tx
                        .send(JudgmentRefined {
                            original_id,
                            refined,
                        })
                        .await;
                }
                Err(error) => debug!(%error, "background refinement failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyMode;
    use std::sync::Arc;
    use watchdog_observe::{ManualClock, ObservationKind};

    fn watchdog() -> (Arc<ManualClock>, Watchdog) {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let watchdog = Watchdog::with_clock(WatchdogConfig::default(), clock.clone()).unwrap();
        (clock, watchdog)
    }

    #[tokio::test]
    async fn test_quiet_observation_yields_nothing() {
        let (_, mut watchdog) = watchdog();
        let result = watchdog
            .observe(Observation::new(ObservationKind::Success, "Task"))
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(watchdog.observation_count(), 1);
    }

    #[tokio::test]
    async fn test_error_pattern_emits_growl() {
        let (_, mut watchdog) = watchdog();
        for _ in 0..2 {
            let result = watchdog
                .observe(Observation::new(ObservationKind::Error, "Edit:syntax"))
                .await
                .unwrap();
            assert!(result.is_none());
        }
        let judgment = watchdog
            .observe(Observation::new(ObservationKind::Error, "Edit:syntax"))
            .await
            .unwrap()
            .expect("third matching error should emit");
        assert_eq!(judgment.verdict, Verdict::Growl);
        assert_eq!(judgment.observation_refs.len(), 3);
        assert_eq!(watchdog.judgment_log().len(), 1);
    }

    #[tokio::test]
    async fn test_feedback_unknown_id_is_not_found() {
        let (_, mut watchdog) = watchdog();
        let err = watchdog.record_feedback("missing", true, None).unwrap_err();
        assert!(matches!(err, WatchdogError::JudgmentNotFound(_)));
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let (_, mut watchdog) = watchdog();
        watchdog
            .observe(Observation::new(ObservationKind::Anomaly, "spike"))
            .await
            .unwrap();
        watchdog.reset();
        assert_eq!(watchdog.observation_count(), 0);
        assert!(watchdog.judgment_log().is_empty());
    }

    #[tokio::test]
    async fn test_consensus_mode_without_sources_degrades_to_static() {
        let mut config = WatchdogConfig::default();
        config.strategy.mode = StrategyMode::Hybrid;
        let clock = Arc::new(ManualClock::new(1_000_000));
        let mut watchdog = Watchdog::with_clock(config, clock).unwrap();

        let judgment = watchdog
            .observe(Observation::new(ObservationKind::Anomaly, "spike"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(judgment.source, JudgmentSource::Static);
    }

    #[tokio::test]
    async fn test_consensus_mode_no_fallback_surfaces_config_error() {
        let mut config = WatchdogConfig::default();
        config.strategy.mode = StrategyMode::Consensus;
        config.strategy.fallback_enabled = false;
        let clock = Arc::new(ManualClock::new(1_000_000));
        let mut watchdog = Watchdog::with_clock(config, clock).unwrap();

        let err = watchdog
            .observe(Observation::new(ObservationKind::Anomaly, "spike"))
            .await
            .unwrap_err();
        assert!(matches!(err, WatchdogError::Config(_)));
    }
}
