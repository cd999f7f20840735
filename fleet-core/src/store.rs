//! Latest-sample-per-vehicle store
//!
//! `merge` is the only mutation. Entries are never removed: a vehicle that
//! goes silent stays resident and is simply classified inactive on read.
//!
//! Ordering rule: a sample replaces the stored one only if its timestamp is
//! not older (last writer wins by sample time, not arrival order), so
//! redelivered or reordered samples can't roll a vehicle back in time.

use crate::model::{TelemetrySample, VehicleState};
use crate::staleness::StalenessClassifier;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// What `merge` did with a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First sample for this vehicle
    Inserted,
    /// Replaced the stored sample (same or newer timestamp)
    Updated,
    /// Older than the stored sample; discarded
    Stale,
}

/// Per-batch tally of merge outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSummary {
    pub inserted: usize,
    pub updated: usize,
    pub stale: usize,
}

impl MergeSummary {
    pub fn record(&mut self, outcome: MergeOutcome) {
        match outcome {
            MergeOutcome::Inserted => self.inserted += 1,
            MergeOutcome::Updated => self.updated += 1,
            MergeOutcome::Stale => self.stale += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.inserted + self.updated + self.stale
    }
}

/// Holds the latest known sample per vehicle, in first-seen order
#[derive(Debug, Clone, Default)]
pub struct VehicleStateStore {
    classifier: StalenessClassifier,
    samples: Vec<TelemetrySample>,
    index: HashMap<String, usize>,
}

impl VehicleStateStore {
    pub fn new(classifier: StalenessClassifier) -> Self {
        Self {
            classifier,
            samples: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn merge(&mut self, sample: TelemetrySample) -> MergeOutcome {
        match self.index.get(&sample.vehicle_id) {
            None => {
                self.index
                    .insert(sample.vehicle_id.clone(), self.samples.len());
                self.samples.push(sample);
                MergeOutcome::Inserted
            }
            Some(&idx) => {
                let stored = &mut self.samples[idx];
                if sample.timestamp >= stored.timestamp {
                    *stored = sample;
                    MergeOutcome::Updated
                } else {
                    debug!(
                        vehicle_id = %sample.vehicle_id,
                        incoming = %sample.timestamp,
                        stored = %stored.timestamp,
                        "Discarding out-of-order sample"
                    );
                    MergeOutcome::Stale
                }
            }
        }
    }

    /// Merge a batch in order, returning the tally
    pub fn merge_all<I>(&mut self, samples: I) -> MergeSummary
    where
        I: IntoIterator<Item = TelemetrySample>,
    {
        let mut summary = MergeSummary::default();
        for sample in samples {
            summary.record(self.merge(sample));
        }
        summary
    }

    /// State of one vehicle, classified at `now`
    pub fn get(&self, vehicle_id: &str, now: DateTime<Utc>) -> Option<VehicleState> {
        self.index
            .get(vehicle_id)
            .map(|&idx| self.state_of(&self.samples[idx], now))
    }

    /// Every vehicle ever seen, in first-seen order, classified at `now`
    pub fn all(&self, now: DateTime<Utc>) -> Vec<VehicleState> {
        self.samples
            .iter()
            .map(|sample| self.state_of(sample, now))
            .collect()
    }

    pub fn latest_sample(&self, vehicle_id: &str) -> Option<&TelemetrySample> {
        self.index.get(vehicle_id).map(|&idx| &self.samples[idx])
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn state_of(&self, sample: &TelemetrySample, now: DateTime<Utc>) -> VehicleState {
        VehicleState {
            vehicle_id: sample.vehicle_id.clone(),
            latest_sample: sample.clone(),
            derived_status: self.classifier.classify_sample(sample, now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Signals, VehicleStatus};
    use crate::units::KilometersPerHour;
    use chrono::{TimeDelta, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn sample(id: &str, secs: i64, speed: f64) -> TelemetrySample {
        TelemetrySample::new(id, at(secs)).with_signals(Signals {
            speed: KilometersPerHour(speed),
            ..Default::default()
        })
    }

    #[test]
    fn test_merge_inserts_then_updates() {
        let mut store = VehicleStateStore::default();
        assert_eq!(store.merge(sample("V1", 1, 10.0)), MergeOutcome::Inserted);
        assert_eq!(store.merge(sample("V1", 2, 20.0)), MergeOutcome::Updated);
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.latest_sample("V1").unwrap().signals.speed,
            KilometersPerHour(20.0)
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let s = sample("V1", 5, 42.0);

        let mut once = VehicleStateStore::default();
        once.merge(s.clone());

        let mut twice = VehicleStateStore::default();
        twice.merge(s.clone());
        twice.merge(s);

        assert_eq!(once.all(at(6)), twice.all(at(6)));
    }

    #[test]
    fn test_merge_order_independent() {
        let s1 = sample("V1", 1, 10.0);
        let s2 = sample("V1", 2, 20.0);

        let mut forward = VehicleStateStore::default();
        forward.merge(s1.clone());
        forward.merge(s2.clone());

        let mut reverse = VehicleStateStore::default();
        reverse.merge(s2.clone());
        assert_eq!(reverse.merge(s1), MergeOutcome::Stale);

        assert_eq!(forward.all(at(3)), reverse.all(at(3)));
        assert_eq!(reverse.latest_sample("V1"), Some(&s2));
    }

    #[test]
    fn test_equal_timestamp_replaces() {
        let mut store = VehicleStateStore::default();
        store.merge(sample("V1", 7, 10.0));
        assert_eq!(store.merge(sample("V1", 7, 11.0)), MergeOutcome::Updated);
        assert_eq!(
            store.latest_sample("V1").unwrap().signals.speed,
            KilometersPerHour(11.0)
        );
    }

    #[test]
    fn test_all_keeps_first_seen_order() {
        let mut store = VehicleStateStore::default();
        store.merge(sample("C", 1, 0.0));
        store.merge(sample("A", 1, 0.0));
        store.merge(sample("B", 1, 0.0));
        store.merge(sample("A", 2, 0.0));
        store.merge(sample("C", 3, 0.0));

        let ids: Vec<String> = store.all(at(4)).into_iter().map(|s| s.vehicle_id).collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_silent_vehicle_stays_resident() {
        let mut store = VehicleStateStore::new(StalenessClassifier::new(TimeDelta::seconds(60)));
        store.merge(sample("V1", 0, 30.0));

        let fresh = store.get("V1", at(10)).unwrap();
        assert_eq!(fresh.derived_status, VehicleStatus::Active);

        let stale = store.get("V1", at(3_600)).unwrap();
        assert_eq!(stale.derived_status, VehicleStatus::Inactive);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_unknown_vehicle() {
        let store = VehicleStateStore::default();
        assert!(store.get("nope", at(0)).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_merge_all_summary() {
        let mut store = VehicleStateStore::default();
        let summary = store.merge_all(vec![
            sample("V1", 2, 0.0),
            sample("V2", 2, 0.0),
            sample("V1", 1, 0.0),
            sample("V2", 3, 0.0),
        ]);
        assert_eq!(
            summary,
            MergeSummary {
                inserted: 2,
                updated: 1,
                stale: 1
            }
        );
        assert_eq!(summary.total(), 4);
    }
}
