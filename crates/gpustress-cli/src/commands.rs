//! Subcommand implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use gpustress_core::export::default_export_file_name;
use gpustress_core::telemetry::SharedState;
use gpustress_core::{
    write_csv, ExportOptions, ProbeChain, QualityLevel, Resolution, StopSignal, StressTest,
    TestConfig, TestMode, TestResults,
};
use tracing::{error, info, warn};

use crate::output;

/// Interval between live status log lines
const STATUS_INTERVAL: Duration = Duration::from_secs(5);

// =============================================================================
// run
// =============================================================================

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// JSON configuration file; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// stress or benchmark
    #[arg(long)]
    pub mode: Option<TestMode>,

    /// low, medium, high or ultra
    #[arg(long)]
    pub quality: Option<QualityLevel>,

    /// WIDTHxHEIGHT or a preset such as 1080p
    #[arg(long)]
    pub resolution: Option<Resolution>,

    /// Target frames per second
    #[arg(long)]
    pub fps: Option<u32>,

    /// Run length in seconds (0 runs until Ctrl-C in stress mode)
    #[arg(long)]
    pub duration: Option<u64>,

    /// Count frame-time spikes as errors
    #[arg(long)]
    pub artifact_detection: bool,

    /// Do not fall back to synthetic telemetry
    #[arg(long)]
    pub no_simulated_probe: bool,

    /// Write the performance log as CSV to this file or directory
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Include clock columns in the CSV export
    #[arg(long)]
    pub clock_columns: bool,

    /// Write the results as JSON to this file
    #[arg(long)]
    pub json: Option<PathBuf>,
}

impl RunArgs {
    /// Resolves the effective configuration
    pub fn to_config(&self) -> Result<TestConfig> {
        let mut config = match &self.config {
            Some(path) => TestConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => TestConfig::default(),
        };

        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(quality) = self.quality {
            config.quality = quality;
        }
        if let Some(resolution) = self.resolution {
            config.resolution = resolution;
        }
        if let Some(fps) = self.fps {
            config.target_fps = fps;
        }
        if let Some(duration) = self.duration {
            config.duration_secs = duration;
        }
        if self.artifact_detection {
            config.artifact_detection = true;
        }
        if self.no_simulated_probe {
            config.simulated_probe = false;
        }

        config.validate().context("invalid run configuration")?;
        Ok(config)
    }
}

pub async fn run(args: RunArgs) -> Result<()> {
    let config = args.to_config()?;
    let probes = ProbeChain::default_chain(config.simulated_probe);
    let test = Arc::new(StressTest::new(config, probes));
    let stop = StopSignal::new();

    let ctrl_c_stop = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping run");
            ctrl_c_stop.stop();
        }
    });

    let status_test = Arc::clone(&test);
    let status_stop = stop.clone();
    let status = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(STATUS_INTERVAL);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = status_stop.stopped() => break,
                _ = ticker.tick() => {
                    let live = status_test.live_status();
                    let temperature_c = status_test
                        .state()
                        .latest_snapshot()
                        .await
                        .and_then(|s| s.temperature_c);
                    info!(
                        frames = live.frame_count,
                        current_fps = live.current_fps,
                        average_fps = live.average_fps,
                        temperature_c = ?temperature_c,
                        "Running"
                    );
                }
            }
        }
    });

    let result = test.run(stop.clone(), Vec::new()).await;
    stop.stop();
    let _ = status.await;
    let results = result.context("run failed")?;

    print!("{}", output::format_summary(&results));

    write_artifacts(&args, &results, &test.state()).await
}

/// Writes the requested CSV and JSON files.
///
/// A failed export is reported but does not stop the results file from being
/// written; the export error is returned afterwards.
pub async fn write_artifacts(
    args: &RunArgs,
    results: &TestResults,
    state: &SharedState,
) -> Result<()> {
    let export = match &args.export {
        Some(target) => {
            let path = resolve_export_path(target, &results.run_id, results.started_at);
            let options = ExportOptions {
                include_clocks: args.clock_columns,
            };
            let log = state.performance_log().await;
            let outcome = write_csv(&path, &log, &options)
                .with_context(|| format!("failed to export CSV to {}", path.display()));
            match &outcome {
                Ok(()) => println!("Performance log written to {}", path.display()),
                Err(e) => error!("{:#}", e),
            }
            outcome
        }
        None => Ok(()),
    };

    if let Some(path) = &args.json {
        results
            .write_json(path)
            .with_context(|| format!("failed to write results to {}", path.display()))?;
        println!("Results written to {}", path.display());
    }

    export
}

/// A directory target gets a generated file name
pub fn resolve_export_path(
    target: &Path,
    run_id: &str,
    started_at: chrono::DateTime<chrono::Utc>,
) -> PathBuf {
    let is_dir = target.is_dir()
        || target
            .to_str()
            .is_some_and(|s| s.ends_with('/') || s.ends_with(std::path::MAIN_SEPARATOR));
    if is_dir {
        target.join(default_export_file_name(run_id, started_at))
    } else {
        target.to_path_buf()
    }
}

// =============================================================================
// probe
// =============================================================================

#[derive(Debug, Clone, Default, Args)]
pub struct ProbeArgs {
    /// Do not fall back to synthetic telemetry
    #[arg(long)]
    pub no_simulated_probe: bool,
}

pub async fn probe(args: ProbeArgs) -> Result<()> {
    let chain = ProbeChain::default_chain(!args.no_simulated_probe);
    let names = chain.probe_names();

    let snapshot = tokio::task::spawn_blocking(move || chain.sample())
        .await
        .context("probe task failed")?;
    if snapshot.is_none() {
        warn!("No probe produced telemetry");
    }

    let report = output::ProbeReport {
        probes: names,
        snapshot,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
