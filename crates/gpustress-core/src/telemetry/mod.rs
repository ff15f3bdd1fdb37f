//! Telemetry State
//!
//! The shared state both execution contexts of a run work on:
//!
//! - frame group: the frame-time window, written by the render loop
//! - telemetry group: hardware snapshots, the performance log and the error
//!   log, written by the collector (and by the render loop for frame errors)
//! - running stats: lock-free counters owned by the render loop
//!
//! Each group sits behind its own `RwLock`. Writers hold the lock for a single
//! append; readers hold it only long enough to clone a point-in-time copy, so
//! sorting and export never run under a lock.

pub mod collector;

pub use collector::{CollectorSummary, TelemetryCollector, TickOutcome};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::buffer::RingBuffer;
use crate::config::TestConfig;
use crate::frames::{FrameSample, RunningStats, RunningStatsSnapshot};
use crate::probe::HardwareSnapshot;

// =============================================================================
// Log Types
// =============================================================================

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Latest frame joined with the latest hardware snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceLogEntry {
    pub captured_at: DateTime<Utc>,
    /// 0 when no frame had completed yet
    pub frame_time_ms: f64,
    pub fps: f64,
    pub gpu_temp_c: Option<u32>,
    pub power_watts: Option<f64>,
    pub memory_used_bytes: Option<u64>,
    pub graphics_clock_mhz: Option<u32>,
    pub memory_clock_mhz: Option<u32>,
}

impl PerformanceLogEntry {
    pub fn join(snapshot: &HardwareSnapshot, frame: Option<&FrameSample>) -> Self {
        Self {
            captured_at: snapshot.captured_at,
            frame_time_ms: frame.map(|f| f.duration_ms).unwrap_or(0.0),
            fps: frame.map(|f| f.fps()).unwrap_or(0.0),
            gpu_temp_c: snapshot.temperature_c,
            power_watts: snapshot.power_watts,
            memory_used_bytes: snapshot.memory_used_bytes,
            graphics_clock_mhz: snapshot.graphics_clock_mhz,
            memory_clock_mhz: snapshot.memory_clock_mhz,
        }
    }

    pub fn memory_used_mb(&self) -> Option<f64> {
        self.memory_used_bytes.map(|bytes| bytes as f64 / BYTES_PER_MB)
    }
}

/// Monotonic error counter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLog {
    pub count: u64,
    pub last_detected_at: Option<DateTime<Utc>>,
}

impl ErrorLog {
    pub fn record(&mut self, at: DateTime<Utc>) {
        self.count += 1;
        self.last_detected_at = Some(at);
    }
}

/// Buffers guarded by the telemetry lock
#[derive(Debug)]
pub struct TelemetryBuffers {
    pub snapshots: RingBuffer<HardwareSnapshot>,
    pub log: RingBuffer<PerformanceLogEntry>,
    pub errors: ErrorLog,
}

/// Consistent copy of the telemetry group
#[derive(Debug, Clone)]
pub struct TelemetrySnapshot {
    pub snapshots: Vec<HardwareSnapshot>,
    pub log: Vec<PerformanceLogEntry>,
    pub errors: ErrorLog,
}

// =============================================================================
// Shared State
// =============================================================================

/// State shared by the render loop, the collector and the report path
#[derive(Debug)]
pub struct SharedState {
    frames: RwLock<RingBuffer<FrameSample>>,
    telemetry: RwLock<TelemetryBuffers>,
    running: RunningStats,
}

impl SharedState {
    /// Sizes buffers from the run configuration
    pub fn new(config: &TestConfig) -> Self {
        Self::with_capacities(
            config.frame_buffer_capacity,
            config.snapshot_buffer_capacity,
            config.log_capacity,
        )
    }

    pub fn with_capacities(frames: usize, snapshots: usize, log: usize) -> Self {
        Self {
            frames: RwLock::new(RingBuffer::new(frames)),
            telemetry: RwLock::new(TelemetryBuffers {
                snapshots: RingBuffer::new(snapshots),
                log: RingBuffer::new(log),
                errors: ErrorLog::default(),
            }),
            running: RunningStats::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Frame group
    // -------------------------------------------------------------------------

    /// Appends a frame and folds it into the running stats.
    ///
    /// The stats update happens under the frame lock so they only ever see
    /// one writer.
    pub async fn record_frame(&self, sample: FrameSample) {
        let mut frames = self.frames.write().await;
        frames.push(sample);
        self.running.record(&sample);
    }

    /// Lock-free read for live display
    pub fn running_stats(&self) -> RunningStatsSnapshot {
        self.running.snapshot()
    }

    pub async fn latest_frame(&self) -> Option<FrameSample> {
        self.frames.read().await.latest().copied()
    }

    /// The newest `n` frames, oldest first
    pub async fn recent_frames(&self, n: usize) -> Vec<FrameSample> {
        self.frames.read().await.tail(n)
    }

    pub async fn frame_times(&self) -> Vec<f64> {
        let frames = self.frames.read().await;
        frames.iter().map(|f| f.duration_ms).collect()
    }

    // -------------------------------------------------------------------------
    // Telemetry group
    // -------------------------------------------------------------------------

    /// Records a snapshot and its joined log entry.
    ///
    /// Snapshots without any reading are dropped; returns whether anything
    /// was recorded.
    pub async fn record_snapshot(&self, snapshot: HardwareSnapshot) -> bool {
        if snapshot.is_empty() {
            return false;
        }

        let latest_frame = self.latest_frame().await;
        let entry = PerformanceLogEntry::join(&snapshot, latest_frame.as_ref());

        let mut telemetry = self.telemetry.write().await;
        telemetry.snapshots.push(snapshot);
        telemetry.log.push(entry);
        true
    }

    pub async fn record_error(&self, at: DateTime<Utc>) {
        self.telemetry.write().await.errors.record(at);
    }

    pub async fn error_count(&self) -> u64 {
        self.telemetry.read().await.errors.count
    }

    pub async fn hardware_snapshots(&self) -> Vec<HardwareSnapshot> {
        self.telemetry.read().await.snapshots.snapshot()
    }

    pub async fn latest_snapshot(&self) -> Option<HardwareSnapshot> {
        self.telemetry.read().await.snapshots.latest().cloned()
    }

    pub async fn performance_log(&self) -> Vec<PerformanceLogEntry> {
        self.telemetry.read().await.log.snapshot()
    }

    /// Copies all three telemetry buffers under one read guard
    pub async fn telemetry_snapshot(&self) -> TelemetrySnapshot {
        let telemetry = self.telemetry.read().await;
        TelemetrySnapshot {
            snapshots: telemetry.snapshots.snapshot(),
            log: telemetry.log.snapshot(),
            errors: telemetry.errors.clone(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
