//! Human-readable and JSON output.

use std::fmt::Write as _;

use gpustress_core::stats::MIN_RELIABLE_SAMPLES;
use gpustress_core::{HardwareSnapshot, TestResults};
use serde::Serialize;

/// Output of `gpustress probe`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    /// Chain order, highest priority first
    pub probes: Vec<String>,
    pub snapshot: Option<HardwareSnapshot>,
}

fn or_dash<T: std::fmt::Display>(value: Option<T>, unit: &str) -> String {
    value
        .map(|v| format!("{v}{unit}"))
        .unwrap_or_else(|| "-".to_string())
}

/// Multi-line run summary
pub fn format_summary(results: &TestResults) -> String {
    let mut out = String::new();
    let config = &results.config;

    let _ = writeln!(out, "Run {} ({})", results.run_id, config.mode);
    let _ = writeln!(
        out,
        "  Workload     {} @ {} {}, target {} fps",
        results.backend, config.resolution, config.quality, config.target_fps
    );
    let _ = writeln!(
        out,
        "  Host         {} ({} logical CPUs), telemetry: {}",
        results.system.hostname,
        results.system.logical_cpus,
        results.probe.as_deref().unwrap_or("none")
    );
    let _ = writeln!(out, "  Duration     {:.1}s, {} frames", results.duration_secs, results.frame_count);
    let _ = writeln!(
        out,
        "  FPS          avg {:.1}  min {:.1}  max {:.1}",
        results.average_fps, results.min_fps, results.max_fps
    );

    let lows: Vec<String> = ["1%", "5%", "95%", "99%"]
        .iter()
        .filter_map(|key| {
            results
                .percentile_fps
                .get(*key)
                .map(|fps| format!("{key} {fps:.1}"))
        })
        .collect();
    if !lows.is_empty() {
        let caveat = if results.percentiles_reliable {
            String::new()
        } else {
            format!("  (fewer than {MIN_RELIABLE_SAMPLES} frames, unreliable)")
        };
        let _ = writeln!(out, "  Percentiles  {}{caveat}", lows.join("  "));
    }

    let _ = writeln!(
        out,
        "  Hardware     max temp {}  avg power {}  max power {}  throttle events {}",
        or_dash(results.max_temperature, " C"),
        or_dash(results.avg_power.map(|w| format!("{w:.1}")), " W"),
        or_dash(results.max_power.map(|w| format!("{w:.1}")), " W"),
        results.throttle_events
    );
    let _ = writeln!(out, "  Errors       {}", results.error_count);
    let _ = writeln!(
        out,
        "  Stability    {:.1} ({})",
        results.stability_score, results.stability_rating
    );
    let _ = writeln!(
        out,
        "  Benchmark    {} ({})",
        results.benchmark_score, results.benchmark_rating
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use gpustress_core::frames::RunningStatsSnapshot;
    use gpustress_core::report::RunContext;
    use gpustress_core::telemetry::{ErrorLog, TelemetrySnapshot};
    use gpustress_core::TestConfig;

    fn results_for(frame_times_ms: &[f64]) -> TestResults {
        let started_at = Utc::now();
        let context = RunContext {
            run_id: "RUN1".to_string(),
            started_at,
            finished_at: started_at + chrono::Duration::seconds(1),
            backend: "simulated".to_string(),
            config: TestConfig::default(),
        };
        let running = RunningStatsSnapshot {
            frame_count: frame_times_ms.len() as u64,
            current_fps: 33.0,
            average_fps: 33.0,
            min_fps: 32.0,
            max_fps: 34.0,
        };
        let telemetry = TelemetrySnapshot {
            snapshots: Vec::new(),
            log: Vec::new(),
            errors: ErrorLog::default(),
        };
        TestResults::compute(context, frame_times_ms, running, &telemetry)
    }

    #[test]
    fn test_summary_flags_short_percentile_window() {
        let short = format_summary(&results_for(&[30.2, 30.1, 30.3, 30.2, 30.25]));
        let line = short.lines().find(|l| l.contains("Percentiles")).unwrap();
        assert!(line.contains("unreliable"));

        let full = format_summary(&results_for(&[30.0; 40]));
        let line = full.lines().find(|l| l.contains("Percentiles")).unwrap();
        assert!(!line.contains("unreliable"));
    }

    #[test]
    fn test_summary_without_frames_has_no_percentiles() {
        let text = format_summary(&results_for(&[]));
        assert!(!text.contains("Percentiles"));
        assert!(text.contains("Benchmark"));
    }

    #[test]
    fn test_or_dash() {
        assert_eq!(or_dash(Some(71), " C"), "71 C");
        assert_eq!(or_dash(None::<u32>, " C"), "-");
    }

    #[test]
    fn test_probe_report_serialization() {
        let report = ProbeReport {
            probes: vec!["nvidia-smi".to_string(), "sysfs".to_string()],
            snapshot: None,
        };
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, r#"{"probes":["nvidia-smi","sysfs"],"snapshot":null}"#);
    }
}
