//! Append-only, capacity-bounded observation log.
//!
//! The store is deliberately dumb: it stamps, appends, evicts oldest-first,
//! and answers window queries. It never decides anything — the trigger
//! evaluator reads it synchronously after every record.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::clock::Clock;
use crate::observation::Observation;

/// Default number of retained observations.
pub const DEFAULT_OBSERVATION_CAPACITY: usize = 100;

/// Bounded in-memory log of recent observations.
///
/// Insertion order is preserved; once `capacity` is exceeded the oldest
/// entries are dropped. Identifiers are monotonic for the lifetime of the
/// store (they survive eviction, not [`reset`](Self::reset)).
pub struct ObservationStore {
    clock: Arc<dyn Clock>,
    capacity: usize,
    next_id: u64,
    entries: VecDeque<Observation>,
}

impl ObservationStore {
    /// Creates a store with the default capacity.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_capacity(clock, DEFAULT_OBSERVATION_CAPACITY)
    }

    /// Creates a store retaining at most `capacity` observations.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(clock: Arc<dyn Clock>, capacity: usize) -> Self {
        assert!(capacity > 0, "observation capacity must be nonzero");
        Self {
            clock,
            capacity,
            next_id: 0,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Records an observation: assigns the next id and the current
    /// timestamp, appends, and evicts from the front past capacity.
    ///
    /// Returns the stored copy (with id and timestamp filled in).
    pub fn record(&mut self, mut observation: Observation) -> Observation {
        self.next_id += 1;
        observation.id = self.next_id;
        observation.timestamp_ms = self.clock.now_millis();

        self.entries.push_back(observation.clone());
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }

        observation
    }

    /// All retained observations recorded at or after `since_ms`, oldest
    /// first.
    pub fn recent(&self, since_ms: u64) -> Vec<&Observation> {
        self.entries
            .iter()
            .filter(|o| o.timestamp_ms >= since_ms)
            .collect()
    }

    /// Looks up a retained observation by id.
    pub fn get(&self, id: u64) -> Option<&Observation> {
        self.entries.iter().find(|o| o.id == id)
    }

    /// Number of retained observations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The id most recently assigned, or zero if nothing was recorded.
    pub fn last_id(&self) -> u64 {
        self.next_id
    }

    /// Clears all retained observations and the id counter.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.next_id = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::observation::ObservationKind;

    fn store_at(start_ms: u64) -> (Arc<ManualClock>, ObservationStore) {
        let clock = Arc::new(ManualClock::new(start_ms));
        let store = ObservationStore::new(clock.clone());
        (clock, store)
    }

    #[test]
    fn test_record_assigns_id_and_timestamp() {
        let (_, mut store) = store_at(5_000);
        let stored = store.record(Observation::new(ObservationKind::Error, "Edit:syntax"));
        assert_eq!(stored.id, 1);
        assert_eq!(stored.timestamp_ms, 5_000);
    }

    #[test]
    fn test_ids_are_monotonic() {
        let (_, mut store) = store_at(0);
        let a = store.record(Observation::new(ObservationKind::Success, "Task"));
        let b = store.record(Observation::new(ObservationKind::Success, "Task"));
        assert!(b.id > a.id);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let clock = Arc::new(ManualClock::new(0));
        let mut store = ObservationStore::with_capacity(clock, 3);
        for i in 0..5 {
            store.record(Observation::new(ObservationKind::Error, format!("sig-{}", i)));
        }
        assert_eq!(store.len(), 3);
        // Oldest two evicted; the store starts at the third record.
        assert!(store.get(1).is_none());
        assert!(store.get(2).is_none());
        assert!(store.get(3).is_some());
    }

    #[test]
    fn test_recent_filters_by_timestamp() {
        let (clock, mut store) = store_at(1_000);
        store.record(Observation::new(ObservationKind::Error, "old"));
        clock.advance(10_000);
        store.record(Observation::new(ObservationKind::Error, "new"));

        let window = store.recent(5_000);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].signature, "new");
    }

    #[test]
    fn test_reset_then_recent_is_empty() {
        let (_, mut store) = store_at(0);
        store.record(Observation::new(ObservationKind::Anomaly, "spike"));
        store.reset();
        assert!(store.recent(0).is_empty());
        assert_eq!(store.last_id(), 0);
    }

    #[test]
    #[should_panic(expected = "observation capacity must be nonzero")]
    fn test_zero_capacity_rejected() {
        let clock = Arc::new(ManualClock::new(0));
        let _ = ObservationStore::with_capacity(clock, 0);
    }
}
