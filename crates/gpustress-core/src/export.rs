//! Performance Log Export
//!
//! Serialises the performance log as CSV through `csv::Writer`. Rendering is
//! pure; writing goes through the atomic file helpers so a failed export never
//! leaves a partial file behind.

use std::fmt::Display;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::fs::write_file_atomic;
use crate::telemetry::PerformanceLogEntry;
use crate::{CoreError, CoreResult};

/// Row timestamp format (UTC, millisecond precision)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

const BASE_COLUMNS: [&str; 6] = [
    "timestamp",
    "fps",
    "frame_time_ms",
    "temperature_c",
    "power_w",
    "memory_used_mb",
];
const CLOCK_COLUMNS: [&str; 2] = ["graphics_clock_mhz", "memory_clock_mhz"];

/// Export options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Append graphics and memory clock columns
    pub include_clocks: bool,
}

impl ExportOptions {
    pub fn with_clocks() -> Self {
        Self {
            include_clocks: true,
        }
    }

    fn columns(&self) -> Vec<&'static str> {
        let mut columns = BASE_COLUMNS.to_vec();
        if self.include_clocks {
            columns.extend(CLOCK_COLUMNS);
        }
        columns
    }
}

/// Header line without the trailing newline
pub fn csv_header(options: &ExportOptions) -> String {
    options.columns().join(",")
}

fn row(entry: &PerformanceLogEntry, options: &ExportOptions) -> Vec<String> {
    let mut record = vec![
        entry.captured_at.format(TIMESTAMP_FORMAT).to_string(),
        format!("{:.2}", entry.fps),
        format!("{:.3}", entry.frame_time_ms),
        cell(entry.gpu_temp_c),
        cell(entry.power_watts.map(|w| format!("{w:.1}"))),
        cell(entry.memory_used_mb().map(|mb| format!("{mb:.1}"))),
    ];
    if options.include_clocks {
        record.push(cell(entry.graphics_clock_mhz));
        record.push(cell(entry.memory_clock_mhz));
    }
    record
}

/// Renders the log, oldest entry first
pub fn export_csv(entries: &[PerformanceLogEntry], options: &ExportOptions) -> CoreResult<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::with_capacity(64 * (entries.len() + 1)));

    writer.write_record(options.columns()).map_err(export_error)?;
    for entry in entries {
        writer.write_record(row(entry, options)).map_err(export_error)?;
    }

    let bytes = writer.into_inner().map_err(export_error)?;
    String::from_utf8(bytes).map_err(export_error)
}

/// Writes the CSV to `path`
pub fn write_csv(
    path: &Path,
    entries: &[PerformanceLogEntry],
    options: &ExportOptions,
) -> CoreResult<()> {
    let csv = export_csv(entries, options)?;
    write_file_atomic(path, csv.as_bytes()).map_err(|e| {
        warn!(path = %path.display(), "CSV export failed: {}", e);
        CoreError::Export(format!("{}: {}", path.display(), e))
    })?;

    info!(path = %path.display(), rows = entries.len(), "Performance log exported");
    Ok(())
}

/// `gpustress_<YYYYmmdd_HHMMSS>_<run_id>.csv`
pub fn default_export_file_name(run_id: &str, started_at: DateTime<Utc>) -> String {
    format!(
        "gpustress_{}_{}.csv",
        started_at.format("%Y%m%d_%H%M%S"),
        run_id
    )
}

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn export_error(e: impl Display) -> CoreError {
    CoreError::Export(e.to_string())
}

// =============================================================================
// Tests
// =============================================================================
