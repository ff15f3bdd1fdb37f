//! Workload Backends
//!
//! A frame workload is whatever the render loop drives once per frame. Native
//! graphics backends live outside this crate and plug in through
//! [`FrameWorkload`]; the built-in [`SimulatedWorkload`] runs everywhere and is
//! always the last candidate.

use rand::Rng;
use tracing::{info, warn};

use crate::config::TestConfig;
use crate::{CoreError, CoreResult};

/// Pixels represented by one shaded sample
const PIXELS_PER_SAMPLE: u64 = 1024;

/// Shading iterations per sample at work factor 1
const BASE_ITERATIONS: u32 = 6;

// =============================================================================
// Workload Trait
// =============================================================================

/// Per-frame work driven by the render loop
pub trait FrameWorkload: Send {
    /// Backend identifier reported in results
    fn name(&self) -> &str;

    /// Prepares the backend for `config`; an error means the backend is unusable
    fn initialize(&mut self, config: &TestConfig) -> CoreResult<()>;

    /// Renders one frame. Errors are counted by the caller and the loop continues.
    fn render_frame(&mut self, frame_index: u64) -> CoreResult<()>;
}

/// Initialises candidates in order and returns the first that succeeds.
///
/// The simulated backend is appended as the unconditional fallback.
pub fn select_backend(
    candidates: Vec<Box<dyn FrameWorkload>>,
    config: &TestConfig,
) -> CoreResult<Box<dyn FrameWorkload>> {
    let fallback: Box<dyn FrameWorkload> = Box::new(SimulatedWorkload::new());

    for mut candidate in candidates.into_iter().chain(std::iter::once(fallback)) {
        match candidate.initialize(config) {
            Ok(()) => {
                info!(backend = candidate.name(), "Workload backend selected");
                return Ok(candidate);
            }
            Err(e) => warn!(backend = candidate.name(), "Backend unavailable: {}", e),
        }
    }

    Err(CoreError::BackendUnavailable(
        "no workload backend could be initialised".to_string(),
    ))
}

// =============================================================================
// Simulated Workload
// =============================================================================

/// CPU-side stand-in for a shading pass.
///
/// Shades a sparse sample of the frame; cost grows with resolution and the
/// quality tier's work factor.
#[derive(Debug, Default)]
pub struct SimulatedWorkload {
    samples_per_frame: u64,
    iterations: u32,
    accumulator: f64,
    initialized: bool,
}

impl SimulatedWorkload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shaded samples per frame after initialisation
    pub fn samples_per_frame(&self) -> u64 {
        self.samples_per_frame
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    fn shade(&self, x: f64, y: f64, phase: f64) -> f64 {
        let mut value = x * 0.37 + y * 0.61 + phase;
        for i in 0..self.iterations {
            let k = i as f64 + 1.0;
            value = (value * k).sin().mul_add(0.5, (value + y).cos() * 0.5);
        }
        value
    }
}

impl FrameWorkload for SimulatedWorkload {
    fn name(&self) -> &str {
        "simulated"
    }

    fn initialize(&mut self, config: &TestConfig) -> CoreResult<()> {
        let pixels = config.resolution.pixels();
        if pixels == 0 {
            return Err(CoreError::InvalidResolution(config.resolution.to_string()));
        }

        self.samples_per_frame = pixels.div_ceil(PIXELS_PER_SAMPLE);
        self.iterations = BASE_ITERATIONS * config.quality.work_factor();
        self.accumulator = 0.0;
        self.initialized = true;
        Ok(())
    }

    fn render_frame(&mut self, frame_index: u64) -> CoreResult<()> {
        if !self.initialized {
            return Err(CoreError::Workload(
                "simulated workload used before initialisation".to_string(),
            ));
        }

        let mut rng = rand::thread_rng();
        let phase = frame_index as f64 * 0.016 + rng.gen_range(0.0..1.0);
        let width = (self.samples_per_frame as f64).sqrt().ceil().max(1.0);

        let mut sum = 0.0;
        for sample in 0..self.samples_per_frame {
            let x = (sample as f64 % width) / width;
            let y = (sample as f64 / width).floor() / width;
            sum += self.shade(x, y, phase);
        }

        self.accumulator = std::hint::black_box(self.accumulator * 0.5 + sum);
        if self.accumulator.is_finite() {
            Ok(())
        } else {
            self.accumulator = 0.0;
            Err(CoreError::Workload(format!(
                "frame {frame_index} produced a non-finite result"
            )))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{QualityLevel, Resolution};

    struct UnavailableBackend;

    impl FrameWorkload for UnavailableBackend {
        fn name(&self) -> &str {
            "unavailable"
        }

        fn initialize(&mut self, _config: &TestConfig) -> CoreResult<()> {
            Err(CoreError::BackendUnavailable("no device".to_string()))
        }

        fn render_frame(&mut self, _frame_index: u64) -> CoreResult<()> {
            unreachable!("never initialised")
        }
    }

    struct NullBackend;

    impl FrameWorkload for NullBackend {
        fn name(&self) -> &str {
            "null"
        }

        fn initialize(&mut self, _config: &TestConfig) -> CoreResult<()> {
            Ok(())
        }

        fn render_frame(&mut self, _frame_index: u64) -> CoreResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_falls_back_to_simulation() {
        let backend =
            select_backend(vec![Box::new(UnavailableBackend)], &TestConfig::default()).unwrap();
        assert_eq!(backend.name(), "simulated");
    }

    #[test]
    fn test_first_working_candidate_wins() {
        let backend = select_backend(
            vec![Box::new(UnavailableBackend), Box::new(NullBackend)],
            &TestConfig::default(),
        )
        .unwrap();
        assert_eq!(backend.name(), "null");
    }

    #[test]
    fn test_no_candidates_uses_simulation() {
        let backend = select_backend(Vec::new(), &TestConfig::default()).unwrap();
        assert_eq!(backend.name(), "simulated");
    }

    #[test]
    fn test_work_scales_with_config() {
        let mut low = SimulatedWorkload::new();
        low.initialize(&TestConfig {
            quality: QualityLevel::Low,
            resolution: Resolution::new(1280, 720),
            ..TestConfig::default()
        })
        .unwrap();

        let mut ultra = SimulatedWorkload::new();
        ultra
            .initialize(&TestConfig {
                quality: QualityLevel::Ultra,
                resolution: Resolution::new(3840, 2160),
                ..TestConfig::default()
            })
            .unwrap();

        assert_eq!(low.samples_per_frame(), 900);
        assert_eq!(ultra.samples_per_frame(), 8100);
        assert_eq!(low.iterations(), BASE_ITERATIONS);
        assert_eq!(ultra.iterations(), BASE_ITERATIONS * 8);
    }

    #[test]
    fn test_render_requires_initialisation() {
        let mut workload = SimulatedWorkload::new();
        assert!(matches!(
            workload.render_frame(0),
            Err(CoreError::Workload(_))
        ));
    }

    #[test]
    fn test_render_frames() {
        let mut workload = SimulatedWorkload::new();
        workload.initialize(&TestConfig::default()).unwrap();
        for frame in 0..5 {
            workload.render_frame(frame).unwrap();
        }
    }
}
