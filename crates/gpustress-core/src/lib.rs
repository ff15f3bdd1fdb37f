//! gpustress Core
//!
//! Telemetry and scoring core of the gpustress GPU stress-test harness.
//! Handles hardware probing, frame-time windows, percentile and stability
//! analysis, benchmark scoring, performance-log export, and run orchestration.

pub mod anomaly;
pub mod buffer;
pub mod config;
pub mod export;
pub mod frames;
pub mod fs;
pub mod probe;
pub mod report;
pub mod runner;
pub mod scoring;
pub mod signal;
pub mod stats;
pub mod telemetry;
pub mod workload;

mod error;
pub use error::*;

pub use config::{QualityLevel, Resolution, TestConfig, TestMode};
pub use export::{write_csv, ExportOptions};
pub use probe::{HardwareProbe, HardwareSnapshot, ProbeChain};
pub use report::TestResults;
pub use runner::StressTest;
pub use signal::StopSignal;
pub use workload::FrameWorkload;
