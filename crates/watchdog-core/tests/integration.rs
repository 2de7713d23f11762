//! # Watchdog pipeline integration tests
//!
//! End-to-end checks of the pipeline's core guarantees.
//!
//! | Guarantee | Test |
//! |-----------|------|
//! | Error pattern end-to-end | `test_error_pattern_end_to_end` |
//! | Cooldown between emissions | `test_cooldown_spacing` |
//! | Confidence hard cap | `test_confidence_never_exceeds_cap` |
//! | Threshold clamp range | `test_thresholds_bounded_under_feedback` |
//! | Idempotent reset | `test_reset_is_idempotent` |
//! | Feedback EMA | `test_feedback_updates_accuracy_ema` |
//! | Durable state | `test_profile_survives_restart` |

use std::sync::Arc;

use watchdog_core::{
    Observation, ObservationKind, Severity, ThresholdKey, TriggerKind, Verdict, Watchdog,
    WatchdogConfig, WatchdogError,
};
use watchdog_observe::ManualClock;

const COOLDOWN_MS: u64 = 30_000;

fn pipeline() -> (Arc<ManualClock>, Watchdog) {
    let clock = Arc::new(ManualClock::new(1_000_000));
    let watchdog = Watchdog::with_clock(WatchdogConfig::default(), clock.clone()).unwrap();
    (clock, watchdog)
}

#[tokio::test]
async fn test_error_pattern_end_to_end() {
    let (clock, mut watchdog) = pipeline();

    // Two matching errors: below the default threshold of 3.
    for _ in 0..2 {
        let result = watchdog
            .observe(Observation::new(ObservationKind::Error, "Edit:syntax"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    // The third must emit a GROWL with all three refs.
    let judgment = watchdog
        .observe(Observation::new(ObservationKind::Error, "Edit:syntax"))
        .await
        .unwrap()
        .expect("third matching error should emit a judgment");
    assert_eq!(judgment.verdict, Verdict::Growl);
    assert_eq!(judgment.trigger, TriggerKind::ErrorPattern);
    assert_eq!(judgment.observation_refs.len(), 3);
    assert_eq!(judgment.subject, "Edit:syntax");

    // A fourth identical error inside the cooldown yields nothing.
    clock.advance(1_000);
    let result = watchdog
        .observe(Observation::new(ObservationKind::Error, "Edit:syntax"))
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_cooldown_spacing() {
    let (clock, mut watchdog) = pipeline();
    let mut emitted = Vec::new();

    // Anomalies trigger immediately, so each one is a candidate.
    for _ in 0..20 {
        if let Some(judgment) = watchdog
            .observe(Observation::new(ObservationKind::Anomaly, "spike"))
            .await
            .unwrap()
        {
            emitted.push(judgment.timestamp_ms);
        }
        clock.advance(7_000);
    }

    assert!(emitted.len() >= 2, "expected multiple emissions");
    for pair in emitted.windows(2) {
        assert!(
            pair[1] - pair[0] >= COOLDOWN_MS,
            "judgments {}ms apart, cooldown is {}ms",
            pair[1] - pair[0],
            COOLDOWN_MS
        );
    }
}

#[tokio::test]
async fn test_confidence_never_exceeds_cap() {
    let (clock, mut watchdog) = pipeline();
    let cap = watchdog_judge::phi::MAX_CONFIDENCE;

    let observations = [
        Observation::new(ObservationKind::Security, "TokenLeak").with_severity(Severity::Critical),
        Observation::new(ObservationKind::Anomaly, "latency"),
        Observation::new(ObservationKind::Security, "WeakHash").with_severity(Severity::Warning),
    ];

    for observation in observations {
        clock.advance(COOLDOWN_MS + 1_000);
        if let Some(judgment) = watchdog.observe(observation).await.unwrap() {
            assert!(
                judgment.confidence <= cap + 1e-9,
                "confidence {} above cap",
                judgment.confidence
            );
        }
    }
    assert!(!watchdog.judgment_log().is_empty());
}

#[tokio::test]
async fn test_thresholds_bounded_under_feedback() {
    let (clock, mut watchdog) = pipeline();

    // Emit one judgment to have something to give feedback on.
    for _ in 0..3 {
        watchdog
            .observe(Observation::new(ObservationKind::Error, "Edit:syntax"))
            .await
            .unwrap();
    }
    let id = watchdog.judgment_log().last().unwrap().id.clone();
    clock.advance(COOLDOWN_MS);

    // Hammer the calibration loop with a long adversarial sequence.
    for i in 0..300 {
        let correction = if i % 4 == 0 { Some(Verdict::Howl) } else { None };
        watchdog
            .record_feedback(&id, i % 3 == 0, correction)
            .unwrap();
    }

    for key in ThresholdKey::ALL {
        let value = watchdog.profile().get(key);
        assert!(
            (1.0..=20.0).contains(&value),
            "{} escaped its range: {}",
            key,
            value
        );
    }
}

#[tokio::test]
async fn test_reset_is_idempotent() {
    let (_, mut watchdog) = pipeline();
    watchdog
        .observe(Observation::new(ObservationKind::Anomaly, "spike"))
        .await
        .unwrap();

    watchdog.reset();
    assert_eq!(watchdog.observation_count(), 0);
    assert!(watchdog.judgment_log().is_empty());

    // A second reset changes nothing.
    watchdog.reset();
    assert_eq!(watchdog.observation_count(), 0);
}

#[tokio::test]
async fn test_feedback_updates_accuracy_ema() {
    let (_, mut watchdog) = pipeline();
    watchdog
        .observe(Observation::new(ObservationKind::Anomaly, "spike"))
        .await
        .unwrap();
    let id = watchdog.judgment_log().last().unwrap().id.clone();

    let first = watchdog.record_feedback(&id, true, None).unwrap();
    assert_eq!(first.accuracy_samples, 1);
    assert!((first.accuracy_ema - 1.0).abs() < 1e-9);

    let second = watchdog.record_feedback(&id, false, None).unwrap();
    assert_eq!(second.accuracy_samples, 2);
    // 0.3·0 + 0.7·1.0
    assert!((second.accuracy_ema - 0.7).abs() < 1e-9);
}

#[tokio::test]
async fn test_feedback_for_unknown_judgment() {
    let (_, mut watchdog) = pipeline();
    let err = watchdog
        .record_feedback("no-such-judgment", true, None)
        .unwrap_err();
    assert!(matches!(err, WatchdogError::JudgmentNotFound(_)));
}

#[tokio::test]
async fn test_profile_survives_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut config = WatchdogConfig::default();
    config.store.persist = true;
    config.store.db_path = dir.path().join("state.db");

    let clock = Arc::new(ManualClock::new(1_000_000));
    {
        let mut watchdog = Watchdog::with_clock(config.clone(), clock.clone()).unwrap();
        watchdog
            .observe(Observation::new(ObservationKind::Anomaly, "spike"))
            .await
            .unwrap();
        let id = watchdog.judgment_log().last().unwrap().id.clone();
        // Two misses nudge a threshold... anomaly has no threshold, so
        // use error-pattern feedback instead via a second judgment.
        clock.advance(COOLDOWN_MS + 1_000);
        for _ in 0..3 {
            watchdog
                .observe(Observation::new(ObservationKind::Error, "Edit:syntax"))
                .await
                .unwrap();
        }
        let error_id = watchdog.judgment_log().last().unwrap().id.clone();
        assert_ne!(id, error_id);
        watchdog.record_feedback(&error_id, false, None).unwrap();
        watchdog.record_feedback(&error_id, false, None).unwrap();
        assert!(watchdog.profile().get(ThresholdKey::ErrorCount) > 3.0);
    }

    // A new pipeline over the same database picks the profile back up.
    let watchdog = Watchdog::with_clock(config, clock).unwrap();
    assert!(watchdog.profile().get(ThresholdKey::ErrorCount) > 3.0);
}
