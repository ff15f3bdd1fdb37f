//! NVIDIA management tool probe
//!
//! Queries `nvidia-smi` in CSV mode and parses the first GPU row. Missing
//! tooling, non-zero exit codes and unparseable output all count as absence.

use std::process::Command;

use chrono::Utc;
use tracing::debug;

use super::{GpuVendor, HardwareProbe, HardwareSnapshot};

const QUERY_FIELDS: &str = "temperature.gpu,clocks.gr,clocks.mem,memory.used,memory.total,\
utilization.gpu,power.draw,fan.speed,pstate";

/// Core temperature at which NVIDIA boards start pulling clocks
pub const NVIDIA_THROTTLE_TEMP_C: u32 = 83;

/// Deepest performance state still considered boosted (P0..=P2)
pub const NVIDIA_MAX_BOOST_PSTATE: u8 = 2;

/// Utilisation above which a non-boosted pstate means the card is held back
pub const NVIDIA_LOADED_UTILIZATION_PCT: u32 = 90;

/// Reads telemetry through the `nvidia-smi` command-line tool
#[derive(Debug, Clone)]
pub struct NvidiaSmiProbe {
    binary: String,
}

impl NvidiaSmiProbe {
    pub fn new() -> Self {
        Self::with_binary("nvidia-smi")
    }

    /// Uses a specific executable path
    pub fn with_binary(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }
}

impl Default for NvidiaSmiProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareProbe for NvidiaSmiProbe {
    fn name(&self) -> &str {
        "nvidia-smi"
    }

    fn sample(&self) -> Option<HardwareSnapshot> {
        let output = Command::new(&self.binary)
            .arg(format!("--query-gpu={QUERY_FIELDS}"))
            .arg("--format=csv,noheader,nounits")
            .output()
            .map_err(|e| debug!("nvidia-smi not runnable: {}", e))
            .ok()?;

        if !output.status.success() {
            debug!(
                "nvidia-smi exited with status {}",
                output.status.code().unwrap_or(-1)
            );
            return None;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout.lines().find_map(parse_query_row)
    }
}

/// Parses one `--format=csv,noheader,nounits` row.
///
/// Fields reported as `[N/A]` or `[Not Supported]` become `None`. Rows with the
/// wrong column count are rejected.
pub fn parse_query_row(line: &str) -> Option<HardwareSnapshot> {
    let parts: Vec<&str> = line.split(',').map(|p| p.trim()).collect();
    if parts.len() != 9 {
        return None;
    }

    let mib = |s: &str| s.parse::<u64>().ok().map(|v| v.saturating_mul(1024 * 1024));
    let whole = |s: &str| s.parse::<f64>().ok().map(|v| v.round() as u32);

    let temperature_c = whole(parts[0]);
    let utilization_pct = whole(parts[5]);
    let pstate = parse_pstate(parts[8]);

    let snapshot = HardwareSnapshot {
        captured_at: Utc::now(),
        temperature_c,
        graphics_clock_mhz: whole(parts[1]),
        memory_clock_mhz: whole(parts[2]),
        memory_used_bytes: mib(parts[3]),
        memory_total_bytes: mib(parts[4]),
        utilization_pct,
        power_watts: parts[6].parse::<f64>().ok(),
        fan_speed: whole(parts[7]),
        vendor: GpuVendor::Nvidia.to_string(),
        throttling: is_throttling(temperature_c, pstate, utilization_pct),
    };

    (!snapshot.is_empty()).then_some(snapshot)
}

/// `P0` → 0, `P8` → 8
fn parse_pstate(value: &str) -> Option<u8> {
    value
        .strip_prefix('P')
        .or_else(|| value.strip_prefix('p'))
        .and_then(|n| n.parse().ok())
}

/// Hot core, or a loaded card parked outside the boost states
fn is_throttling(temperature_c: Option<u32>, pstate: Option<u8>, utilization: Option<u32>) -> bool {
    let hot = temperature_c.is_some_and(|t| t >= NVIDIA_THROTTLE_TEMP_C);
    let held_back = matches!(
        (pstate, utilization),
        (Some(p), Some(u)) if p > NVIDIA_MAX_BOOST_PSTATE && u >= NVIDIA_LOADED_UTILIZATION_PCT
    );
    hot || held_back
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_row() {
        let snapshot = parse_query_row("65, 1980, 9501, 2048, 8192, 97, 215.34, 45, P0").unwrap();

        assert_eq!(snapshot.temperature_c, Some(65));
        assert_eq!(snapshot.graphics_clock_mhz, Some(1980));
        assert_eq!(snapshot.memory_clock_mhz, Some(9501));
        assert_eq!(snapshot.memory_used_bytes, Some(2048 * 1024 * 1024));
        assert_eq!(snapshot.memory_total_bytes, Some(8192 * 1024 * 1024));
        assert_eq!(snapshot.utilization_pct, Some(97));
        assert_eq!(snapshot.power_watts, Some(215.34));
        assert_eq!(snapshot.fan_speed, Some(45));
        assert_eq!(snapshot.vendor, "NVIDIA");
        assert!(!snapshot.throttling);
    }

    #[test]
    fn test_parse_row_with_unsupported_fields() {
        let snapshot =
            parse_query_row("71, 1500, 5000, 1024, 4096, 80, [N/A], [Not Supported], P2").unwrap();

        assert_eq!(snapshot.power_watts, None);
        assert_eq!(snapshot.fan_speed, None);
        assert_eq!(snapshot.temperature_c, Some(71));
    }

    #[test]
    fn test_parse_row_all_unavailable_is_absent() {
        let row = "[N/A], [N/A], [N/A], [N/A], [N/A], [N/A], [N/A], [N/A], [N/A]";
        assert!(parse_query_row(row).is_none());
    }

    #[test]
    fn test_parse_row_wrong_column_count() {
        assert!(parse_query_row("65, 1980").is_none());
        assert!(parse_query_row("").is_none());
    }

    #[test]
    fn test_throttling_by_temperature() {
        let snapshot = parse_query_row("83, 1400, 9501, 2048, 8192, 99, 250.0, 80, P0").unwrap();
        assert!(snapshot.throttling);
    }

    #[test]
    fn test_throttling_by_pstate_under_load() {
        let loaded = parse_query_row("60, 900, 5000, 2048, 8192, 95, 120.0, 40, P5").unwrap();
        assert!(loaded.throttling);

        let idle = parse_query_row("40, 300, 405, 512, 8192, 2, 15.0, 0, P8").unwrap();
        assert!(!idle.throttling);
    }

    #[test]
    fn test_missing_binary_is_absent() {
        let probe = NvidiaSmiProbe::with_binary("/nonexistent/nvidia-smi-gpustress");
        assert!(probe.sample().is_none());
    }
}
