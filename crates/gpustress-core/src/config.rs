//! Run Configuration
//!
//! Immutable settings for a single stress/benchmark run. Configuration is
//! validated before a run starts; invalid values are rejected rather than
//! clamped so a run never silently changes what it measures.
//!
//! Storage format: camelCase JSON, every field optional with defaults.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::buffer::{FRAME_BUFFER_CAPACITY, PERFORMANCE_LOG_CAPACITY, SNAPSHOT_BUFFER_CAPACITY};
use crate::{CoreError, CoreResult};

/// Largest accepted resolution (8K UHD)
pub const MAX_RESOLUTION: Resolution = Resolution {
    width: 7680,
    height: 4320,
};

/// Accepted target frame rate range
pub const TARGET_FPS_RANGE: std::ops::RangeInclusive<u32> = 1..=1000;

/// Default telemetry tick (milliseconds)
pub const DEFAULT_TELEMETRY_INTERVAL_MS: u64 = 500;

// =============================================================================
// Quality Level
// =============================================================================

/// Workload quality tier, ordered lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    Low,
    Medium,
    High,
    Ultra,
}

impl QualityLevel {
    pub const ALL: [QualityLevel; 4] = [
        QualityLevel::Low,
        QualityLevel::Medium,
        QualityLevel::High,
        QualityLevel::Ultra,
    ];

    /// Position in the tier order (Low = 0)
    pub fn ordinal(&self) -> u32 {
        match self {
            QualityLevel::Low => 0,
            QualityLevel::Medium => 1,
            QualityLevel::High => 2,
            QualityLevel::Ultra => 3,
        }
    }

    /// Relative per-pixel cost used by the simulated workload
    pub fn work_factor(&self) -> u32 {
        match self {
            QualityLevel::Low => 1,
            QualityLevel::Medium => 2,
            QualityLevel::High => 4,
            QualityLevel::Ultra => 8,
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityLevel::Low => write!(f, "low"),
            QualityLevel::Medium => write!(f, "medium"),
            QualityLevel::High => write!(f, "high"),
            QualityLevel::Ultra => write!(f, "ultra"),
        }
    }
}

impl FromStr for QualityLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QualityLevel::ALL
            .into_iter()
            .find(|q| q.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::UnknownQuality(s.to_string()))
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Target render resolution in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// 1080p, the benchmark score baseline
    pub const FULL_HD: Resolution = Resolution {
        width: 1920,
        height: 1080,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::FULL_HD
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = CoreError;

    /// Accepts `WIDTHxHEIGHT` or one of `720p`, `1080p`, `1440p`, `4k`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        let preset = match value.as_str() {
            "720p" => Some(Resolution::new(1280, 720)),
            "1080p" => Some(Resolution::FULL_HD),
            "1440p" => Some(Resolution::new(2560, 1440)),
            "4k" | "2160p" => Some(Resolution::new(3840, 2160)),
            _ => None,
        };
        if let Some(resolution) = preset {
            return Ok(resolution);
        }

        let (w, h) = value
            .split_once('x')
            .ok_or_else(|| CoreError::InvalidResolution(s.to_string()))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|_| CoreError::InvalidResolution(s.to_string()))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|_| CoreError::InvalidResolution(s.to_string()))?;

        Ok(Resolution::new(width, height))
    }
}

// =============================================================================
// Test Mode
// =============================================================================

/// What the run is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestMode {
    /// Sustained load; a zero duration runs until stopped
    Stress,
    /// Fixed-length run producing a comparable score
    Benchmark,
}

impl fmt::Display for TestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestMode::Stress => write!(f, "stress"),
            TestMode::Benchmark => write!(f, "benchmark"),
        }
    }
}

impl FromStr for TestMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stress" => Ok(TestMode::Stress),
            "benchmark" => Ok(TestMode::Benchmark),
            _ => Err(CoreError::UnknownMode(s.to_string())),
        }
    }
}

// =============================================================================
// Test Configuration
// =============================================================================

/// Configuration for one run, fixed for the run's lifetime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConfig {
    #[serde(default = "default_mode")]
    pub mode: TestMode,

    #[serde(default = "default_quality")]
    pub quality: QualityLevel,

    #[serde(default)]
    pub resolution: Resolution,

    /// Frames per second the render loop paces itself to
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,

    /// Run length in seconds (0 = until stopped, stress mode only)
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,

    /// Count frame-time spikes as errors
    #[serde(default)]
    pub artifact_detection: bool,

    /// Telemetry collector period (milliseconds)
    #[serde(default = "default_telemetry_interval_ms")]
    pub telemetry_interval_ms: u64,

    #[serde(default = "default_frame_buffer_capacity")]
    pub frame_buffer_capacity: usize,

    #[serde(default = "default_snapshot_buffer_capacity")]
    pub snapshot_buffer_capacity: usize,

    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    /// Append the synthetic probe as the last telemetry fallback
    #[serde(default = "default_true")]
    pub simulated_probe: bool,
}

fn default_mode() -> TestMode {
    TestMode::Stress
}

fn default_quality() -> QualityLevel {
    QualityLevel::Medium
}

fn default_target_fps() -> u32 {
    60
}

fn default_duration_secs() -> u64 {
    60
}

fn default_telemetry_interval_ms() -> u64 {
    DEFAULT_TELEMETRY_INTERVAL_MS
}

fn default_frame_buffer_capacity() -> usize {
    FRAME_BUFFER_CAPACITY
}

fn default_snapshot_buffer_capacity() -> usize {
    SNAPSHOT_BUFFER_CAPACITY
}

fn default_log_capacity() -> usize {
    PERFORMANCE_LOG_CAPACITY
}

fn default_true() -> bool {
    true
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            quality: default_quality(),
            resolution: Resolution::default(),
            target_fps: default_target_fps(),
            duration_secs: default_duration_secs(),
            artifact_detection: false,
            telemetry_interval_ms: default_telemetry_interval_ms(),
            frame_buffer_capacity: default_frame_buffer_capacity(),
            snapshot_buffer_capacity: default_snapshot_buffer_capacity(),
            log_capacity: default_log_capacity(),
            simulated_probe: true,
        }
    }
}

impl TestConfig {
    /// Loads a configuration file and validates it
    pub fn load(path: &Path) -> CoreResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: TestConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects any value the run cannot honour
    pub fn validate(&self) -> CoreResult<()> {
        let Resolution { width, height } = self.resolution;
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidResolution(format!(
                "{} has a zero dimension",
                self.resolution
            )));
        }
        if width > MAX_RESOLUTION.width || height > MAX_RESOLUTION.height {
            return Err(CoreError::InvalidResolution(format!(
                "{} exceeds {}",
                self.resolution, MAX_RESOLUTION
            )));
        }

        if !TARGET_FPS_RANGE.contains(&self.target_fps) {
            return Err(CoreError::InvalidConfig(format!(
                "targetFps {} outside {}..={}",
                self.target_fps,
                TARGET_FPS_RANGE.start(),
                TARGET_FPS_RANGE.end()
            )));
        }

        if self.mode == TestMode::Benchmark && self.duration_secs == 0 {
            return Err(CoreError::InvalidConfig(
                "benchmark mode requires a non-zero duration".to_string(),
            ));
        }

        if self.telemetry_interval_ms == 0 {
            return Err(CoreError::InvalidConfig(
                "telemetryIntervalMs must be greater than zero".to_string(),
            ));
        }

        for (name, capacity) in [
            ("frameBufferCapacity", self.frame_buffer_capacity),
            ("snapshotBufferCapacity", self.snapshot_buffer_capacity),
            ("logCapacity", self.log_capacity),
        ] {
            if capacity == 0 {
                return Err(CoreError::InvalidConfig(format!(
                    "{name} must be greater than zero"
                )));
            }
        }

        Ok(())
    }

    /// Frame budget derived from the target frame rate
    pub fn target_frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_nanos(1_000_000_000 / self.target_fps.max(1) as u64)
    }

    /// Run length, `None` when unbounded
    pub fn duration(&self) -> Option<std::time::Duration> {
        (self.duration_secs > 0).then(|| std::time::Duration::from_secs(self.duration_secs))
    }

    pub fn telemetry_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.telemetry_interval_ms)
    }
}

// =============================================================================
// Tests
// =============================================================================
