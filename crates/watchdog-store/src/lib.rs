//! # Watchdog Store
//!
//! Durable state for the watchdog pipeline, backed by Sled. Three trees:
//!
//! | Tree | Key | Value | Purpose |
//! |------|-----|-------|---------|
//! | `profile` | — (single record) | threshold snapshot | adaptive thresholds survive restarts |
//! | `calibration` | — (single record) | calibration state | accuracy EMA survives restarts |
//! | `judgments` | timestamp ‖ id | serialized judgment | audit trail |
//!
//! The contract is deliberately small — load, save, append, flush — with
//! at-least-once semantics: every write is followed by a flush, and a
//! crash between write and flush loses at most the unflushed write.
//! Everything in-memory remains authoritative; the store is a mirror.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use watchdog_judge::Judgment;
use watchdog_observe::ThresholdProfile;

/// Tree holding the threshold profile snapshot.
const PROFILE_TREE: &str = "profile";

/// Tree holding the calibration state.
const CALIBRATION_TREE: &str = "calibration";

/// Tree holding the judgment audit log.
const JUDGMENT_TREE: &str = "judgments";

/// Key for single-record trees.
const STATE_KEY: &[u8] = b"state";

/// Errors from the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to open, read, or write the database.
    #[error("database error: {0}")]
    Database(#[from] sled::Error),

    /// Failed to serialize or deserialize a record.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Smoothed feedback accuracy, persisted across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CalibrationState {
    /// Number of feedback events ingested.
    pub accuracy_samples: u64,
    /// Exponential moving average of correctness in `[0, 1]`.
    pub accuracy_ema: f64,
}

/// Sled-backed mirror of the pipeline's durable state.
///
/// The underlying database is thread-safe; clones share the same trees.
#[derive(Clone)]
pub struct StateStore {
    db: sled::Db,
    profile: sled::Tree,
    calibration: sled::Tree,
    judgments: sled::Tree,
}

impl StateStore {
    /// Opens or creates a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Creates an in-memory store for testing; contents vanish on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self> {
        let profile = db.open_tree(PROFILE_TREE)?;
        let calibration = db.open_tree(CALIBRATION_TREE)?;
        let judgments = db.open_tree(JUDGMENT_TREE)?;
        Ok(Self {
            db,
            profile,
            calibration,
            judgments,
        })
    }

    /// Persists the current threshold snapshot.
    pub fn save_profile(&self, profile: &ThresholdProfile) -> Result<()> {
        let snapshot = profile.snapshot();
        let bytes = serde_json::to_vec(&snapshot)?;
        self.profile.insert(STATE_KEY, bytes)?;
        self.profile.flush()?;
        Ok(())
    }

    /// Loads the persisted threshold snapshot, if any.
    pub fn load_profile(&self) -> Result<Option<BTreeMap<String, f64>>> {
        match self.profile.get(STATE_KEY)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Persists the calibration state.
    pub fn save_calibration(&self, state: &CalibrationState) -> Result<()> {
        let bytes = serde_json::to_vec(state)?;
        self.calibration.insert(STATE_KEY, bytes)?;
        self.calibration.flush()?;
        Ok(())
    }

    /// Loads the persisted calibration state, if any.
    pub fn load_calibration(&self) -> Result<Option<CalibrationState>> {
        match self.calibration.get(STATE_KEY)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Appends a judgment to the audit log.
    ///
    /// Keys are `timestamp_ms` (big-endian) followed by the judgment id,
    /// so iteration order is chronological.
    pub fn append_judgment(&self, judgment: &Judgment) -> Result<()> {
        let mut key = judgment.timestamp_ms.to_be_bytes().to_vec();
        key.extend_from_slice(judgment.id.as_bytes());
        let bytes = serde_json::to_vec(judgment)?;
        self.judgments.insert(key, bytes)?;
        self.judgments.flush()?;
        Ok(())
    }

    /// The most recent `limit` judgments, newest first.
    pub fn recent_judgments(&self, limit: usize) -> Result<Vec<Judgment>> {
        let mut out = Vec::with_capacity(limit);
        for entry in self.judgments.iter().rev().take(limit) {
            let (_, bytes) = entry?;
            out.push(serde_json::from_slice(&bytes)?);
        }
        Ok(out)
    }

    /// Number of judgments in the audit log.
    pub fn judgment_count(&self) -> usize {
        self.judgments.len()
    }

    /// Flushes all trees to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use watchdog_observe::{ThresholdKey, TriggerKind};

    fn sample_judgment(timestamp_ms: u64) -> Judgment {
        let mut judgment = Judgment::new(TriggerKind::ErrorPattern, "Edit:syntax", timestamp_ms);
        judgment.q_score = 45.0;
        judgment.confidence = 0.4;
        judgment
    }

    #[test]
    fn test_profile_roundtrip() {
        let store = StateStore::temporary().unwrap();
        let profile = ThresholdProfile::new();
        profile.nudge(ThresholdKey::ErrorCount, 1.0);

        store.save_profile(&profile).unwrap();
        let snapshot = store.load_profile().unwrap().unwrap();
        assert_eq!(snapshot.get("error.count"), Some(&4.0));

        let restored = ThresholdProfile::new();
        restored.restore(&snapshot);
        assert_eq!(restored.get(ThresholdKey::ErrorCount), 4.0);
    }

    #[test]
    fn test_load_profile_absent() {
        let store = StateStore::temporary().unwrap();
        assert!(store.load_profile().unwrap().is_none());
    }

    #[test]
    fn test_calibration_roundtrip() {
        let store = StateStore::temporary().unwrap();
        let state = CalibrationState {
            accuracy_samples: 12,
            accuracy_ema: 0.75,
        };
        store.save_calibration(&state).unwrap();
        let loaded = store.load_calibration().unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_judgments_append_and_order() {
        let store = StateStore::temporary().unwrap();
        store.append_judgment(&sample_judgment(1_000)).unwrap();
        store.append_judgment(&sample_judgment(3_000)).unwrap();
        store.append_judgment(&sample_judgment(2_000)).unwrap();

        let recent = store.recent_judgments(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].timestamp_ms, 3_000);
        assert_eq!(recent[1].timestamp_ms, 2_000);
        assert_eq!(store.judgment_count(), 3);
    }

    #[test]
    fn test_on_disk_store_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state.db");

        {
            let store = StateStore::open(&path).unwrap();
            let profile = ThresholdProfile::new();
            profile.nudge(ThresholdKey::SuccessCount, -1.0);
            store.save_profile(&profile).unwrap();
            store.flush().unwrap();
        }

        let store = StateStore::open(&path).unwrap();
        let snapshot = store.load_profile().unwrap().unwrap();
        assert_eq!(snapshot.get("success.count"), Some(&4.0));
    }
}
