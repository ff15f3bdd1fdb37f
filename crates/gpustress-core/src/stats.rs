//! Percentile & Variance Engine
//!
//! Ordered statistics and dispersion measures over a copied window of
//! samples. Every function is pure and works on a caller-owned slice.
//!
//! Percentiles use nearest-rank indexing `floor(n * p / 100)` with no
//! interpolation. The index is clamped to `n - 1`, so very small windows
//! return their largest sample instead of indexing out of range.

use std::collections::BTreeMap;

/// Rank set reported by [`percentiles`]
pub const PERCENTILE_RANKS: [u32; 5] = [1, 5, 50, 95, 99];

/// Below this many samples percentile output is statistically unreliable
pub const MIN_RELIABLE_SAMPLES: usize = 10;

/// Returns the `p`-th percentile of `samples`, or `None` for empty input
pub fn percentile(samples: &[f64], p: u32) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let sorted = sorted_copy(samples);
    Some(sorted[rank_index(sorted.len(), p)])
}

/// Computes every rank in [`PERCENTILE_RANKS`] with a single sort
pub fn percentiles(samples: &[f64]) -> BTreeMap<u32, f64> {
    let mut out = BTreeMap::new();
    if samples.is_empty() {
        return out;
    }

    let sorted = sorted_copy(samples);
    for p in PERCENTILE_RANKS {
        out.insert(p, sorted[rank_index(sorted.len(), p)]);
    }
    out
}

/// Converts a frame time in milliseconds to frames per second
pub fn fps_from_frame_time(frame_time_ms: f64) -> f64 {
    if frame_time_ms > 0.0 && frame_time_ms.is_finite() {
        1000.0 / frame_time_ms
    } else {
        0.0
    }
}

/// FPS percentiles keyed `"1%"`, `"5%"`, `"95%"`, `"99%"`.
///
/// Low FPS comes from long frames, so the "1% low" figure is derived from the
/// 99th percentile frame time, "5%" from the 95th, and so on.
pub fn fps_percentiles(frame_times_ms: &[f64]) -> BTreeMap<String, f64> {
    let ranks = percentiles(frame_times_ms);
    let mut out = BTreeMap::new();

    for (label, frame_rank) in [("1%", 99), ("5%", 95), ("95%", 5), ("99%", 1)] {
        if let Some(frame_time) = ranks.get(&frame_rank) {
            out.insert(label.to_string(), fps_from_frame_time(*frame_time));
        }
    }
    out
}

/// Arithmetic mean (0 for empty input)
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Population variance: mean of squared deviations, divisor `n`
pub fn variance(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let avg = mean(samples);
    samples.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / samples.len() as f64
}

/// Population standard deviation
pub fn std_dev(samples: &[f64]) -> f64 {
    variance(samples).sqrt()
}

/// Standard deviation relative to the mean (0 when the mean is not positive)
pub fn coefficient_of_variation(samples: &[f64]) -> f64 {
    let avg = mean(samples);
    if avg <= 0.0 {
        return 0.0;
    }
    std_dev(samples) / avg
}

fn sorted_copy(samples: &[f64]) -> Vec<f64> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

fn rank_index(len: usize, p: u32) -> usize {
    (len * p as usize / 100).min(len - 1)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ten_to_thousand() -> Vec<f64> {
        (1..=100).map(|i| (i * 10) as f64).collect()
    }

    // ========================================================================
    // Percentile Tests
    // ========================================================================

    #[test]
    fn test_percentile_determinism() {
        let samples = ten_to_thousand();

        assert_eq!(percentile(&samples, 50), Some(510.0));
        assert_eq!(percentile(&samples, 99), Some(1000.0));
        assert_eq!(percentile(&samples, 1), Some(20.0));
    }

    #[test]
    fn test_percentile_ignores_input_order() {
        let mut samples = ten_to_thousand();
        samples.reverse();

        let ranks = percentiles(&samples);
        assert_eq!(ranks[&50], 510.0);
        assert_eq!(ranks[&95], 960.0);
        assert_eq!(ranks.len(), PERCENTILE_RANKS.len());
    }

    #[test]
    fn test_percentile_small_input_clamps_index() {
        assert_eq!(percentile(&[7.0], 99), Some(7.0));
        assert_eq!(percentile(&[3.0, 1.0, 2.0], 99), Some(3.0));
        assert_eq!(percentile(&[3.0, 1.0, 2.0], 1), Some(1.0));
    }

    #[test]
    fn test_percentile_empty_input() {
        assert_eq!(percentile(&[], 50), None);
        assert!(percentiles(&[]).is_empty());
        assert!(fps_percentiles(&[]).is_empty());
    }

    // ========================================================================
    // FPS Tests
    // ========================================================================

    #[test]
    fn test_fps_inversion_one_percent_low() {
        // 99 fast frames and one 50ms frame: p99 lands on the slow frame.
        let mut samples = vec![10.0; 99];
        samples.push(50.0);

        let fps = fps_percentiles(&samples);
        assert_eq!(fps["1%"], 20.0);
        assert_eq!(fps["99%"], 100.0);
    }

    #[test]
    fn test_fps_percentile_pairs_are_consistent() {
        let samples = ten_to_thousand();
        let fps = fps_percentiles(&samples);

        assert!(fps["1%"] <= fps["5%"]);
        assert!(fps["5%"] <= fps["95%"]);
        assert!(fps["95%"] <= fps["99%"]);
        assert_eq!(fps["5%"], 1000.0 / 960.0);
    }

    #[test]
    fn test_fps_from_non_positive_frame_time() {
        assert_eq!(fps_from_frame_time(0.0), 0.0);
        assert_eq!(fps_from_frame_time(-4.0), 0.0);
        assert_eq!(fps_from_frame_time(f64::NAN), 0.0);
        assert_eq!(fps_from_frame_time(16.0), 62.5);
    }

    // ========================================================================
    // Dispersion Tests
    // ========================================================================

    #[test]
    fn test_variance_uses_population_divisor() {
        let samples = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];

        assert_eq!(mean(&samples), 5.0);
        assert_eq!(variance(&samples), 4.0);
        assert_eq!(std_dev(&samples), 2.0);
    }

    #[test]
    fn test_variance_of_constant_samples_is_zero() {
        let samples = [16.6; 32];
        assert!(variance(&samples).abs() < 1e-12);
        assert!(coefficient_of_variation(&samples).abs() < 1e-9);
    }

    #[test]
    fn test_coefficient_of_variation() {
        let samples = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((coefficient_of_variation(&samples) - 0.4).abs() < 1e-12);
        assert_eq!(coefficient_of_variation(&[]), 0.0);
    }
}
