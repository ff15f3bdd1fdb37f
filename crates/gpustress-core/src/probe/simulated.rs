//! Synthetic telemetry probe
//!
//! Produces plausible readings when no real source is available: the board
//! warms from an idle temperature toward a load temperature as ticks
//! accumulate, and clocks, power and fan follow the temperature.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use rand::Rng;

use super::{GpuVendor, HardwareProbe, HardwareSnapshot};

/// Temperature at which the simulated board reports throttling
pub const SIMULATED_THROTTLE_TEMP_C: f64 = 85.0;

/// Ticks for the simulated warm-up to cover ~63% of the idle/load gap
const WARMUP_TICKS: f64 = 40.0;

const BOOST_CLOCK_MHZ: f64 = 1850.0;
const MEMORY_CLOCK_MHZ: u32 = 7000;
const MEMORY_TOTAL_BYTES: u64 = 8 * 1024 * 1024 * 1024;
const MEMORY_BASE_BYTES: u64 = 1536 * 1024 * 1024;

/// Generates warming, jittered hardware readings
#[derive(Debug)]
pub struct SimulatedProbe {
    idle_temp_c: f64,
    load_temp_c: f64,
    ticks: AtomicU64,
}

impl SimulatedProbe {
    /// Idles at 45 °C and settles around 82 °C under load
    pub fn new() -> Self {
        Self::with_profile(45.0, 82.0)
    }

    pub fn with_profile(idle_temp_c: f64, load_temp_c: f64) -> Self {
        Self {
            idle_temp_c,
            load_temp_c,
            ticks: AtomicU64::new(0),
        }
    }

    /// Noise-free temperature after `tick` samples
    pub fn temperature_at(&self, tick: u64) -> f64 {
        let progress = 1.0 - (-(tick as f64) / WARMUP_TICKS).exp();
        self.idle_temp_c + (self.load_temp_c - self.idle_temp_c) * progress
    }
}

impl Default for SimulatedProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareProbe for SimulatedProbe {
    fn name(&self) -> &str {
        "simulated"
    }

    fn sample(&self) -> Option<HardwareSnapshot> {
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed);
        let mut rng = rand::thread_rng();

        let temperature = (self.temperature_at(tick) + rng.gen_range(-1.5..=1.5)).max(0.0);
        let heat = (temperature - self.idle_temp_c).max(0.0);

        // Clocks back off once past 70 °C.
        let graphics_clock = BOOST_CLOCK_MHZ - (temperature - 70.0).max(0.0) * 12.0;
        let memory_used = MEMORY_BASE_BYTES
            .saturating_add(tick.saturating_mul(4 * 1024 * 1024))
            .min(MEMORY_TOTAL_BYTES * 3 / 4);

        Some(HardwareSnapshot {
            captured_at: Utc::now(),
            temperature_c: Some(temperature.round() as u32),
            graphics_clock_mhz: Some(graphics_clock.max(300.0).round() as u32),
            memory_clock_mhz: Some(MEMORY_CLOCK_MHZ),
            memory_used_bytes: Some(memory_used),
            memory_total_bytes: Some(MEMORY_TOTAL_BYTES),
            utilization_pct: Some(rng.gen_range(94..=100)),
            power_watts: Some(95.0 + heat * 3.2 + rng.gen_range(-4.0..=4.0)),
            fan_speed: Some((30.0 + heat * 1.6).min(100.0).round() as u32),
            vendor: GpuVendor::Simulated.to_string(),
            throttling: temperature >= SIMULATED_THROTTLE_TEMP_C,
        })
    }
}
