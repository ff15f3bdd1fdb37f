//! Test Results
//!
//! Final, immutable summary of a run. Computed once from point-in-time
//! copies of the shared buffers; nothing here holds a lock while sorting or
//! aggregating.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TestConfig;
use crate::frames::RunningStatsSnapshot;
use crate::fs::write_json_atomic;
use crate::scoring::{benchmark_score, stability_score, BenchmarkRating, StabilityRating};
use crate::stats::{fps_percentiles, mean, MIN_RELIABLE_SAMPLES};
use crate::telemetry::{SharedState, TelemetrySnapshot};
use crate::CoreResult;

// =============================================================================
// System Info
// =============================================================================

/// Host the run executed on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub hostname: String,
    pub logical_cpus: usize,
}

impl SystemInfo {
    pub fn detect() -> Self {
        Self {
            hostname: hostname::get()
                .map(|h| h.to_string_lossy().to_string())
                .unwrap_or_else(|_| "unknown".to_string()),
            logical_cpus: num_cpus::get(),
        }
    }
}

// =============================================================================
// Run Context
// =============================================================================

/// Identity and timing of a run, known to the orchestrator
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub backend: String,
    pub config: TestConfig,
}

// =============================================================================
// Test Results
// =============================================================================

/// Run summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResults {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub backend: String,
    pub config: TestConfig,
    pub system: SystemInfo,
    /// Vendor reported by the last recorded snapshot
    pub probe: Option<String>,

    pub frame_count: u64,
    pub average_fps: f64,
    pub min_fps: f64,
    pub max_fps: f64,
    /// Mean over the retained frame-time window
    pub average_frame_time_ms: f64,
    /// Keys `"1%"`, `"5%"`, `"95%"`, `"99%"`
    pub percentile_fps: BTreeMap<String, f64>,
    /// False when the frame window held too few samples for the percentiles
    /// to mean anything
    pub percentiles_reliable: bool,

    pub max_temperature: Option<u32>,
    pub avg_power: Option<f64>,
    pub max_power: Option<f64>,
    pub throttle_events: u64,

    pub error_count: u64,
    pub last_anomaly_at: Option<DateTime<Utc>>,

    pub stability_score: f64,
    pub stability_rating: StabilityRating,
    pub benchmark_score: u64,
    pub benchmark_rating: BenchmarkRating,
}

impl TestResults {
    /// Aggregates copies of the run's buffers
    pub fn compute(
        context: RunContext,
        frame_times_ms: &[f64],
        running: RunningStatsSnapshot,
        telemetry: &TelemetrySnapshot,
    ) -> Self {
        let max_temperature = telemetry.log.iter().filter_map(|e| e.gpu_temp_c).max();

        let power: Vec<f64> = telemetry.log.iter().filter_map(|e| e.power_watts).collect();
        let avg_power = (!power.is_empty()).then(|| mean(&power));
        let max_power = power.iter().copied().reduce(f64::max);

        let throttle_events = telemetry.snapshots.iter().filter(|s| s.throttling).count() as u64;
        let probe = telemetry.snapshots.last().map(|s| s.vendor.clone());

        let error_count = telemetry.errors.count;
        let stability = stability_score(frame_times_ms, error_count);
        let benchmark = benchmark_score(
            running.average_fps,
            context.config.resolution.pixels(),
            context.config.quality,
            stability,
        );

        let duration_secs =
            (context.finished_at - context.started_at).num_milliseconds().max(0) as f64 / 1000.0;

        Self {
            run_id: context.run_id,
            started_at: context.started_at,
            finished_at: context.finished_at,
            duration_secs,
            backend: context.backend,
            config: context.config,
            system: SystemInfo::detect(),
            probe,
            frame_count: running.frame_count,
            average_fps: running.average_fps,
            min_fps: running.min_fps_or_zero(),
            max_fps: running.max_fps,
            average_frame_time_ms: mean(frame_times_ms),
            percentile_fps: fps_percentiles(frame_times_ms),
            percentiles_reliable: frame_times_ms.len() >= MIN_RELIABLE_SAMPLES,
            max_temperature,
            avg_power,
            max_power,
            throttle_events,
            error_count,
            last_anomaly_at: telemetry.errors.last_detected_at,
            stability_score: stability,
            stability_rating: StabilityRating::from_score(stability),
            benchmark_score: benchmark,
            benchmark_rating: BenchmarkRating::from_score(benchmark),
        }
    }

    /// Takes lock-protected copies of `state` and aggregates them
    pub async fn from_state(context: RunContext, state: &SharedState) -> Self {
        let frame_times = state.frame_times().await;
        let telemetry = state.telemetry_snapshot().await;
        let running = state.running_stats();
        Self::compute(context, &frame_times, running, &telemetry)
    }

    /// Writes the results as pretty JSON
    pub fn write_json(&self, path: &Path) -> CoreResult<()> {
        write_json_atomic(path, self)
    }
}

// =============================================================================
// Tests
// =============================================================================
