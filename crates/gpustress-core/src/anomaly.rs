//! Artifact/Anomaly Detector
//!
//! Flags a frame that is both much slower than its recent neighbourhood and
//! slow in absolute terms. Requiring both keeps a uniformly slow window from
//! producing a stream of detections. Detection never alters the samples.

use chrono::{DateTime, Utc};

use crate::frames::FrameSample;
use crate::stats::mean;

/// Samples in the rolling neighbourhood
pub const ANOMALY_WINDOW: usize = 10;

/// Latest frame must exceed this multiple of the window mean
pub const ANOMALY_SPIKE_RATIO: f64 = 3.0;

/// Latest frame must also exceed this absolute frame time (ms)
pub const ANOMALY_FLOOR_MS: f64 = 100.0;

/// Whether the most recent frame time is an anomaly.
///
/// The window is the last [`ANOMALY_WINDOW`] samples, including the latest.
pub fn detect(frame_times_ms: &[f64]) -> bool {
    if frame_times_ms.len() < ANOMALY_WINDOW {
        return false;
    }
    let window = &frame_times_ms[frame_times_ms.len() - ANOMALY_WINDOW..];
    let latest = window[ANOMALY_WINDOW - 1];
    let rolling_mean = mean(window);

    latest > ANOMALY_SPIKE_RATIO * rolling_mean && latest > ANOMALY_FLOOR_MS
}

/// Stateful wrapper that reports each offending frame once
#[derive(Debug, Default)]
pub struct ArtifactDetector {
    last_flagged: Option<DateTime<Utc>>,
}

impl ArtifactDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stateless spike rule over a frame-time window
    pub fn detect(frame_times_ms: &[f64]) -> bool {
        detect(frame_times_ms)
    }

    /// Checks the newest frame; returns its capture time if it is a new anomaly
    pub fn check(&mut self, frames: &[FrameSample]) -> Option<DateTime<Utc>> {
        let latest = frames.last()?;
        if self.last_flagged == Some(latest.captured_at) {
            return None;
        }

        let times: Vec<f64> = frames.iter().map(|f| f.duration_ms).collect();
        if detect(&times) {
            self.last_flagged = Some(latest.captured_at);
            Some(latest.captured_at)
        } else {
            None
        }
    }
}
