//! Telemetry Collector
//!
//! Periodic task that polls the probe chain, records snapshots joined with
//! the latest frame, and optionally runs the anomaly detector. Runs
//! concurrently with the render loop and stops within one tick of the stop
//! signal.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::anomaly::{ArtifactDetector, ANOMALY_WINDOW};
use crate::probe::ProbeChain;
use crate::signal::StopSignal;
use crate::telemetry::SharedState;

/// Result of a single collector tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// A non-empty snapshot was recorded
    pub recorded: bool,
    /// Capture time of a newly flagged frame
    pub anomaly: Option<DateTime<Utc>>,
}

/// Totals returned when the collector stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectorSummary {
    pub ticks: u64,
    pub snapshots_recorded: u64,
    pub anomalies: u64,
}

pub struct TelemetryCollector {
    state: Arc<SharedState>,
    probes: Arc<ProbeChain>,
    interval: Duration,
    detector: Option<ArtifactDetector>,
}

impl TelemetryCollector {
    pub fn new(state: Arc<SharedState>, probes: Arc<ProbeChain>, interval: Duration) -> Self {
        Self {
            state,
            probes,
            interval,
            detector: None,
        }
    }

    /// Enables frame-spike detection on every tick
    pub fn with_artifact_detection(mut self, enabled: bool) -> Self {
        self.detector = enabled.then(ArtifactDetector::new);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Performs one collection step
    pub async fn tick(&mut self) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        // Probes may shell out or read sysfs; keep that off the async workers.
        let probes = Arc::clone(&self.probes);
        let snapshot = match tokio::task::spawn_blocking(move || probes.sample()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Probe task failed: {}", e);
                None
            }
        };

        match snapshot {
            Some(snapshot) => {
                outcome.recorded = self.state.record_snapshot(snapshot).await;
            }
            None => debug!("No hardware telemetry this tick"),
        }

        if let Some(detector) = self.detector.as_mut() {
            let frames = self.state.recent_frames(ANOMALY_WINDOW).await;
            if let Some(at) = detector.check(&frames) {
                let frame_time = frames.last().map(|f| f.duration_ms).unwrap_or_default();
                warn!(
                    frame_time_ms = frame_time,
                    "Frame time spike detected, counting as artifact"
                );
                self.state.record_error(at).await;
                outcome.anomaly = Some(at);
            }
        }

        outcome
    }

    /// Ticks until the stop signal is raised
    pub async fn run(mut self, stop: StopSignal) -> CollectorSummary {
        let mut summary = CollectorSummary::default();
        // First collection one interval in, so it joins against a real frame.
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(
            interval_ms = self.interval.as_millis() as u64,
            probes = ?self.probes.probe_names(),
            "Telemetry collector started"
        );

        loop {
            tokio::select! {
                _ = stop.stopped() => break,
                _ = ticker.tick() => {}
            }
            if stop.is_stopped() {
                break;
            }

            let outcome = self.tick().await;
            summary.ticks += 1;
            if outcome.recorded {
                summary.snapshots_recorded += 1;
            }
            if outcome.anomaly.is_some() {
                summary.anomalies += 1;
            }
        }

        info!(
            ticks = summary.ticks,
            snapshots = summary.snapshots_recorded,
            anomalies = summary.anomalies,
            "Telemetry collector stopped"
        );
        summary
    }

    /// Runs the collector on its own task
    pub fn spawn(self, stop: StopSignal) -> JoinHandle<CollectorSummary> {
        tokio::spawn(self.run(stop))
    }
}

// =============================================================================
// Tests
// =============================================================================
