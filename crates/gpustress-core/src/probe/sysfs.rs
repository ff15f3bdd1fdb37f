//! Linux DRM/hwmon probe
//!
//! Reads the kernel's pseudo-files under `/sys/class/drm/card*/device`. The
//! amdgpu driver exposes the richest set (busy percent, VRAM, DPM clocks);
//! other drivers usually provide at least an hwmon temperature.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;

use super::{GpuVendor, HardwareProbe, HardwareSnapshot};

/// Default DRM class directory
pub const DRM_ROOT: &str = "/sys/class/drm";

/// Junction temperature at which amdgpu starts throttling
pub const SYSFS_THROTTLE_TEMP_C: u32 = 95;

/// Reads telemetry from the DRM pseudo-filesystem
#[derive(Debug, Clone)]
pub struct SysfsProbe {
    root: PathBuf,
}

impl SysfsProbe {
    pub fn new() -> Self {
        Self::with_root(DRM_ROOT)
    }

    /// Reads from a different DRM root (used by tests)
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Card directories in numeric order
    fn card_devices(&self) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot read {}: {}", self.root.display(), e);
                return Vec::new();
            }
        };

        let mut cards: Vec<(u32, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name();
                let number = card_number(&name.to_string_lossy())?;
                let device = entry.path().join("device");
                device.is_dir().then_some((number, device))
            })
            .collect();
        cards.sort_by_key(|(number, _)| *number);
        cards.into_iter().map(|(_, device)| device).collect()
    }

    fn read_device(&self, device: &Path) -> HardwareSnapshot {
        let vendor = read_trimmed(&device.join("vendor"))
            .map(|id| GpuVendor::from_pci_id(&id))
            .unwrap_or(GpuVendor::Unknown);

        let hwmon = first_hwmon_dir(device);
        let hwmon_value = |file: &str| hwmon.as_ref().and_then(|dir| read_u64(&dir.join(file)));

        let temperature_c = hwmon_value("temp1_input").map(|milli| (milli / 1000) as u32);
        let power_watts = hwmon_value("power1_average")
            .or_else(|| hwmon_value("power1_input"))
            .map(|micro| micro as f64 / 1_000_000.0);

        HardwareSnapshot {
            captured_at: Utc::now(),
            temperature_c,
            graphics_clock_mhz: read_active_dpm_level(&device.join("pp_dpm_sclk")),
            memory_clock_mhz: read_active_dpm_level(&device.join("pp_dpm_mclk")),
            memory_used_bytes: read_u64(&device.join("mem_info_vram_used")),
            memory_total_bytes: read_u64(&device.join("mem_info_vram_total")),
            utilization_pct: read_u64(&device.join("gpu_busy_percent")).map(|v| v as u32),
            power_watts,
            fan_speed: hwmon_value("fan1_input").map(|rpm| rpm as u32),
            vendor: vendor.to_string(),
            throttling: temperature_c.is_some_and(|t| t >= SYSFS_THROTTLE_TEMP_C),
        }
    }
}

impl Default for SysfsProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareProbe for SysfsProbe {
    fn name(&self) -> &str {
        "sysfs"
    }

    fn sample(&self) -> Option<HardwareSnapshot> {
        self.card_devices()
            .iter()
            .map(|device| self.read_device(device))
            .find(|snapshot| !snapshot.is_empty())
    }
}

/// `card0` → 0; connector entries such as `card0-DP-1` are skipped
fn card_number(name: &str) -> Option<u32> {
    let digits = name.strip_prefix("card")?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn first_hwmon_dir(device: &Path) -> Option<PathBuf> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(device.join("hwmon"))
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    dirs.into_iter().next()
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

fn read_u64(path: &Path) -> Option<u64> {
    read_trimmed(path)?.parse().ok()
}

/// Parses the level marked with `*` in a `pp_dpm_*` table, e.g. `1: 1200Mhz *`
fn read_active_dpm_level(path: &Path) -> Option<u32> {
    let table = fs::read_to_string(path).ok()?;
    parse_active_dpm_level(&table)
}

fn parse_active_dpm_level(table: &str) -> Option<u32> {
    let line = table.lines().find(|line| line.trim_end().ends_with('*'))?;
    let (_, value) = line.split_once(':')?;
    let digits: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
