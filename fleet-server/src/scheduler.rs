//! Polling scheduler
//!
//! This module handles:
//! - Fetching samples from the configured source on a fixed interval
//! - Merging them into the engine (the engine's only writer)
//! - Publishing each new snapshot to readers
//! - Tracking cycle status for `/api/status`
//!
//! Phase cycle: `Idle → Fetching → Merging → Ready → (interval) → Fetching …`.
//! A failed fetch puts the phase back where it was and leaves the published
//! snapshot untouched.

use chrono::{DateTime, Utc};
use fleet_core::model::VehicleState;
use fleet_core::staleness::StalenessClassifier;
use fleet_core::store::MergeSummary;
use fleet_core::{EngineConfig, FleetEngine, FleetSnapshot, SourceError, TelemetrySource};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::{timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerPhase {
    /// No successful cycle yet
    Idle,
    Fetching,
    Merging,
    /// A snapshot is published
    Ready,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    pub at: DateTime<Utc>,
    pub error: String,
    pub timed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub phase: SchedulerPhase,
    pub source: String,
    pub poll_interval_secs: u64,
    pub completed_cycles: u64,
    pub failed_cycles: u64,
    pub consecutive_failures: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<FailureRecord>,
    pub last_merge: Option<MergeSummary>,
}

pub struct PollingScheduler {
    engine: FleetEngine,
    source: Arc<dyn TelemetrySource>,
    poll_interval: Duration,
    fetch_timeout: Duration,
    published: bool,
    snapshot_tx: watch::Sender<Arc<FleetSnapshot>>,
    status: Arc<RwLock<SchedulerStatus>>,
}

/// Read side of the scheduler: cheap to clone, never blocks on a cycle
#[derive(Clone)]
pub struct SchedulerHandle {
    snapshot_rx: watch::Receiver<Arc<FleetSnapshot>>,
    status: Arc<RwLock<SchedulerStatus>>,
    classifier: StalenessClassifier,
}

impl PollingScheduler {
    /// Create a scheduler and publish an empty snapshot
    pub fn new(config: &EngineConfig, source: Arc<dyn TelemetrySource>) -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(FleetSnapshot::empty(Utc::now())));
        let status = SchedulerStatus {
            phase: SchedulerPhase::Idle,
            source: source.name().to_string(),
            poll_interval_secs: config.poll_interval_secs,
            completed_cycles: 0,
            failed_cycles: 0,
            consecutive_failures: 0,
            last_success: None,
            last_failure: None,
            last_merge: None,
        };

        Self {
            engine: FleetEngine::new(config),
            source,
            poll_interval: config.poll_interval(),
            fetch_timeout: config.fetch_timeout(),
            published: false,
            snapshot_tx,
            status: Arc::new(RwLock::new(status)),
        }
    }

    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            snapshot_rx: self.snapshot_tx.subscribe(),
            status: self.status.clone(),
            classifier: self.engine.classifier(),
        }
    }

    pub fn engine(&self) -> &FleetEngine {
        &self.engine
    }

    /// Run one fetch → merge → publish cycle
    pub async fn poll_once(&mut self) -> Result<MergeSummary, SourceError> {
        self.set_phase(SchedulerPhase::Fetching).await;

        let fetched = match timeout(self.fetch_timeout, self.source.fetch_all()).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout(self.fetch_timeout)),
        };

        let raws = match fetched {
            Ok(raws) => raws,
            Err(e) => {
                self.record_failure(&e).await;
                return Err(e);
            }
        };

        self.set_phase(SchedulerPhase::Merging).await;

        let now = Utc::now();
        let summary = self.engine.ingest(&raws, now);
        let snapshot = Arc::new(self.engine.snapshot(now));

        if summary.inserted + summary.updated > 0 {
            info!(
                "Cycle merged {} sample(s): {} new, {} updated, {} stale; {}/{} active, {} alert(s)",
                summary.total(),
                summary.inserted,
                summary.updated,
                summary.stale,
                snapshot.metrics.active_vehicles,
                snapshot.metrics.total_vehicles,
                snapshot.alerts.len()
            );
        } else {
            debug!(
                "Cycle brought no new samples ({} fetched, {} stale)",
                raws.len(),
                summary.stale
            );
        }

        self.snapshot_tx.send_replace(snapshot);
        self.published = true;

        let mut status = self.status.write().await;
        status.phase = SchedulerPhase::Ready;
        status.completed_cycles += 1;
        status.consecutive_failures = 0;
        status.last_success = Some(now);
        status.last_merge = Some(summary);

        Ok(summary)
    }

    /// Main scheduler loop; returns once `cancel` fires
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            "Polling scheduler started (source: {}, interval: {:?}, timeout: {:?})",
            self.source.name(),
            self.poll_interval,
            self.fetch_timeout
        );

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            // Stop also abandons an in-flight fetch
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.poll_once() => {}
            }
        }

        let resting = self.resting_phase();
        self.set_phase(resting).await;
        info!("Polling scheduler stopped");
    }

    fn resting_phase(&self) -> SchedulerPhase {
        if self.published {
            SchedulerPhase::Ready
        } else {
            SchedulerPhase::Idle
        }
    }

    async fn set_phase(&self, phase: SchedulerPhase) {
        self.status.write().await.phase = phase;
    }

    async fn record_failure(&self, error: &SourceError) {
        let mut status = self.status.write().await;
        status.phase = self.resting_phase();
        status.failed_cycles += 1;
        status.consecutive_failures += 1;
        status.last_failure = Some(FailureRecord {
            at: Utc::now(),
            error: error.to_string(),
            timed_out: error.is_timeout(),
        });

        warn!(
            "Fetch from {} failed ({} in a row), keeping last snapshot: {}",
            self.source.name(),
            status.consecutive_failures,
            error
        );
    }
}

impl SchedulerHandle {
    /// The last published snapshot
    pub fn snapshot(&self) -> Arc<FleetSnapshot> {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver that wakes on every publish
    pub fn subscribe(&self) -> watch::Receiver<Arc<FleetSnapshot>> {
        self.snapshot_rx.clone()
    }

    pub async fn status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }

    /// One vehicle from the published snapshot, classified at `now`
    pub fn vehicle(&self, vehicle_id: &str, now: DateTime<Utc>) -> Option<VehicleState> {
        self.snapshot()
            .vehicle(vehicle_id)
            .map(|state| self.classifier.reclassify(state, now))
    }
}
