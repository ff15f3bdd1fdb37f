//! Frame Samples & Running Statistics
//!
//! `FrameSample` is what the render loop produces once per frame.
//! `RunningStats` is the render loop's own incrementally updated summary. It
//! is written by the render loop only and read lock-free by display code, so
//! readers may briefly observe fields from two different frames.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stats::fps_from_frame_time;

/// One measured frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSample {
    pub captured_at: DateTime<Utc>,
    pub duration_ms: f64,
}

impl FrameSample {
    pub fn new(duration_ms: f64) -> Self {
        Self {
            captured_at: Utc::now(),
            duration_ms,
        }
    }

    pub fn fps(&self) -> f64 {
        fps_from_frame_time(self.duration_ms)
    }
}

/// Plain copy of [`RunningStats`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningStatsSnapshot {
    pub frame_count: u64,
    pub current_fps: f64,
    pub average_fps: f64,
    /// +∞ until the first frame completes
    pub min_fps: f64,
    pub max_fps: f64,
}

impl RunningStatsSnapshot {
    /// Minimum FPS, or 0 before any frame
    pub fn min_fps_or_zero(&self) -> f64 {
        if self.min_fps.is_finite() {
            self.min_fps
        } else {
            0.0
        }
    }
}

/// Lock-free per-frame counters
#[derive(Debug)]
pub struct RunningStats {
    frame_count: AtomicU64,
    total_frame_time_ms: AtomicU64,
    current_fps: AtomicU64,
    min_fps: AtomicU64,
    max_fps: AtomicU64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self {
            frame_count: AtomicU64::new(0),
            total_frame_time_ms: AtomicU64::new(0f64.to_bits()),
            current_fps: AtomicU64::new(0f64.to_bits()),
            min_fps: AtomicU64::new(f64::INFINITY.to_bits()),
            max_fps: AtomicU64::new(0f64.to_bits()),
        }
    }

    /// Folds one frame into the counters. Single writer only.
    pub fn record(&self, sample: &FrameSample) {
        let fps = sample.fps();

        let total = load_f64(&self.total_frame_time_ms) + sample.duration_ms.max(0.0);
        store_f64(&self.total_frame_time_ms, total);

        let min = load_f64(&self.min_fps).min(fps);
        let max = load_f64(&self.max_fps).max(fps);
        store_f64(&self.min_fps, min);
        store_f64(&self.max_fps, max);
        store_f64(&self.current_fps, fps);

        self.frame_count.fetch_add(1, Ordering::Release);
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> RunningStatsSnapshot {
        let frame_count = self.frame_count();
        let total_ms = load_f64(&self.total_frame_time_ms);
        let average_fps = if total_ms > 0.0 {
            frame_count as f64 * 1000.0 / total_ms
        } else {
            0.0
        };

        RunningStatsSnapshot {
            frame_count,
            current_fps: load_f64(&self.current_fps),
            average_fps,
            min_fps: load_f64(&self.min_fps),
            max_fps: load_f64(&self.max_fps),
        }
    }
}

impl Default for RunningStats {
    fn default() -> Self {
        Self::new()
    }
}

fn load_f64(cell: &AtomicU64) -> f64 {
    f64::from_bits(cell.load(Ordering::Relaxed))
}

fn store_f64(cell: &AtomicU64, value: f64) {
    cell.store(value.to_bits(), Ordering::Relaxed);
}
