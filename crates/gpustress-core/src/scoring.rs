//! Stability & Benchmark Scoring
//!
//! Reduces frame-time dispersion, detected anomalies and throughput into the
//! two headline numbers of a run, plus the qualitative bands shown next to
//! them.
//!
//! The penalty coefficients and rating thresholds are tunable policy, not
//! physical constants.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{QualityLevel, Resolution};
use crate::stats::{coefficient_of_variation, MIN_RELIABLE_SAMPLES};

/// Score points lost per unit of coefficient of variation
pub const CV_PENALTY: f64 = 10.0;

/// Score points lost per detected anomaly or frame error
pub const ERROR_PENALTY: f64 = 5.0;

// =============================================================================
// Stability Score
// =============================================================================

/// Frame pacing health in `[0, 100]`.
///
/// Fewer than ten samples is not evidence of instability and scores 100.
pub fn stability_score(frame_times_ms: &[f64], error_count: u64) -> f64 {
    if frame_times_ms.len() < MIN_RELIABLE_SAMPLES {
        return 100.0;
    }

    let cv = coefficient_of_variation(frame_times_ms);
    let base = (100.0 - cv * CV_PENALTY).max(0.0);
    (base - error_count as f64 * ERROR_PENALTY).clamp(0.0, 100.0)
}

// =============================================================================
// Benchmark Score
// =============================================================================

/// Comparable throughput score normalised to 1080p.
///
/// Each step truncates before the next multiplication; the order is part of
/// the score definition and must not be rearranged.
pub fn benchmark_score(
    avg_fps: f64,
    resolution_pixels: u64,
    quality: QualityLevel,
    stability_score: f64,
) -> u64 {
    let mut base = (avg_fps * 10.0).floor();
    base = (base * resolution_pixels as f64 / Resolution::FULL_HD.pixels() as f64).floor();
    base = (base * (quality.ordinal() + 1) as f64).floor();
    base = (base * stability_score / 100.0).floor();

    if base.is_finite() {
        base.max(0.0) as u64
    } else {
        0
    }
}

// =============================================================================
// Ratings
// =============================================================================

/// Qualitative band for a stability score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StabilityRating {
    Poor,
    Unstable,
    Fair,
    Good,
    Excellent,
}

impl StabilityRating {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 95.0 => StabilityRating::Excellent,
            s if s >= 85.0 => StabilityRating::Good,
            s if s >= 70.0 => StabilityRating::Fair,
            s if s >= 50.0 => StabilityRating::Unstable,
            _ => StabilityRating::Poor,
        }
    }
}

impl fmt::Display for StabilityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StabilityRating::Excellent => write!(f, "Excellent"),
            StabilityRating::Good => write!(f, "Good"),
            StabilityRating::Fair => write!(f, "Fair"),
            StabilityRating::Unstable => write!(f, "Unstable"),
            StabilityRating::Poor => write!(f, "Poor"),
        }
    }
}

/// Qualitative band for a benchmark score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BenchmarkRating {
    Low,
    Average,
    Good,
    Excellent,
    Exceptional,
}

impl BenchmarkRating {
    pub fn from_score(score: u64) -> Self {
        match score {
            15_000.. => BenchmarkRating::Exceptional,
            8_000.. => BenchmarkRating::Excellent,
            4_000.. => BenchmarkRating::Good,
            1_500.. => BenchmarkRating::Average,
            _ => BenchmarkRating::Low,
        }
    }
}

impl fmt::Display for BenchmarkRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchmarkRating::Exceptional => write!(f, "Exceptional"),
            BenchmarkRating::Excellent => write!(f, "Excellent"),
            BenchmarkRating::Good => write!(f, "Good"),
            BenchmarkRating::Average => write!(f, "Average"),
            BenchmarkRating::Low => write!(f, "Low"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
