//! Hardware Probe Chain
//!
//! Interchangeable hardware telemetry sources composed into an ordered
//! fallback list at startup. The chain asks each probe in turn and keeps the
//! first snapshot that carries any data. A probe that cannot read its source
//! reports absence; nothing here is an error.

pub mod nvidia;
pub mod simulated;
pub mod sysfs;

pub use nvidia::NvidiaSmiProbe;
pub use simulated::SimulatedProbe;
pub use sysfs::SysfsProbe;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

// =============================================================================
// Vendor
// =============================================================================

/// GPU device vendor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    /// Synthetic telemetry
    Simulated,
    Unknown,
}

impl GpuVendor {
    /// Maps a PCI vendor id such as `0x1002`
    pub fn from_pci_id(id: &str) -> Self {
        match id.trim().to_ascii_lowercase().as_str() {
            "0x10de" => GpuVendor::Nvidia,
            "0x1002" => GpuVendor::Amd,
            "0x8086" => GpuVendor::Intel,
            _ => GpuVendor::Unknown,
        }
    }
}

impl std::fmt::Display for GpuVendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuVendor::Nvidia => write!(f, "NVIDIA"),
            GpuVendor::Amd => write!(f, "AMD"),
            GpuVendor::Intel => write!(f, "Intel"),
            GpuVendor::Simulated => write!(f, "Simulated"),
            GpuVendor::Unknown => write!(f, "Unknown"),
        }
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// One point-in-time hardware reading; `None` means "not observable"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareSnapshot {
    pub captured_at: DateTime<Utc>,
    pub temperature_c: Option<u32>,
    pub graphics_clock_mhz: Option<u32>,
    pub memory_clock_mhz: Option<u32>,
    pub memory_used_bytes: Option<u64>,
    pub memory_total_bytes: Option<u64>,
    pub utilization_pct: Option<u32>,
    pub power_watts: Option<f64>,
    pub fan_speed: Option<u32>,
    pub vendor: String,
    /// Decided by the producing probe's own threshold policy
    pub throttling: bool,
}

impl HardwareSnapshot {
    /// Creates a snapshot with no readings
    pub fn empty(vendor: &str) -> Self {
        Self {
            captured_at: Utc::now(),
            temperature_c: None,
            graphics_clock_mhz: None,
            memory_clock_mhz: None,
            memory_used_bytes: None,
            memory_total_bytes: None,
            utilization_pct: None,
            power_watts: None,
            fan_speed: None,
            vendor: vendor.to_string(),
            throttling: false,
        }
    }

    /// True when no optional reading is present
    pub fn is_empty(&self) -> bool {
        self.temperature_c.is_none()
            && self.graphics_clock_mhz.is_none()
            && self.memory_clock_mhz.is_none()
            && self.memory_used_bytes.is_none()
            && self.memory_total_bytes.is_none()
            && self.utilization_pct.is_none()
            && self.power_watts.is_none()
            && self.fan_speed.is_none()
    }
}

// =============================================================================
// Probe Trait
// =============================================================================

/// A single hardware telemetry source.
///
/// Implementations may block on I/O. They must catch their own failures and
/// return `None`.
pub trait HardwareProbe: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Reads one snapshot, or `None` when the source is unavailable
    fn sample(&self) -> Option<HardwareSnapshot>;
}

// =============================================================================
// Probe Chain
// =============================================================================

/// Ordered fallback list of probes
#[derive(Default)]
pub struct ProbeChain {
    probes: Vec<Box<dyn HardwareProbe>>,
}

impl ProbeChain {
    pub fn new(probes: Vec<Box<dyn HardwareProbe>>) -> Self {
        Self { probes }
    }

    /// Vendor tool, then OS pseudo-filesystem, then (optionally) synthetic data
    pub fn default_chain(include_simulated: bool) -> Self {
        let mut chain = Self::new(vec![
            Box::new(NvidiaSmiProbe::new()),
            Box::new(SysfsProbe::new()),
        ]);
        if include_simulated {
            chain.push(Box::new(SimulatedProbe::new()));
        }
        chain
    }

    /// Appends a probe at the lowest priority
    pub fn push(&mut self, probe: Box<dyn HardwareProbe>) {
        self.probes.push(probe);
    }

    pub fn probe_names(&self) -> Vec<String> {
        self.probes.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Returns the first non-empty snapshot; each probe is asked at most once
    pub fn sample(&self) -> Option<HardwareSnapshot> {
        for probe in &self.probes {
            match probe.sample() {
                Some(snapshot) if !snapshot.is_empty() => {
                    trace!(probe = probe.name(), "Hardware snapshot captured");
                    return Some(snapshot);
                }
                Some(_) => debug!(probe = probe.name(), "Probe returned no readings"),
                None => debug!(probe = probe.name(), "Probe unavailable"),
            }
        }
        None
    }
}

impl std::fmt::Debug for ProbeChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeChain")
            .field("probes", &self.probe_names())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Probe returning a fixed answer and counting calls
    pub(crate) struct FixedProbe {
        pub name: String,
        pub answer: Option<HardwareSnapshot>,
        pub calls: Arc<AtomicUsize>,
    }

    impl FixedProbe {
        pub(crate) fn new(name: &str, answer: Option<HardwareSnapshot>) -> Self {
            Self {
                name: name.to_string(),
                answer,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl HardwareProbe for FixedProbe {
        fn name(&self) -> &str {
            &self.name
        }

        fn sample(&self) -> Option<HardwareSnapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    pub(crate) fn snapshot_with_temp(vendor: &str, temp: u32) -> HardwareSnapshot {
        HardwareSnapshot {
            temperature_c: Some(temp),
            power_watts: Some(150.0),
            memory_used_bytes: Some(2 * 1024 * 1024 * 1024),
            ..HardwareSnapshot::empty(vendor)
        }
    }

    #[test]
    fn test_vendor_from_pci_id() {
        assert_eq!(GpuVendor::from_pci_id("0x1002\n"), GpuVendor::Amd);
        assert_eq!(GpuVendor::from_pci_id("0x10DE"), GpuVendor::Nvidia);
        assert_eq!(GpuVendor::from_pci_id("0x8086"), GpuVendor::Intel);
        assert_eq!(GpuVendor::from_pci_id("0x1234"), GpuVendor::Unknown);
        assert_eq!(GpuVendor::Amd.to_string(), "AMD");
    }

    #[test]
    fn test_snapshot_is_empty() {
        let empty = HardwareSnapshot::empty("AMD");
        assert!(empty.is_empty());

        let fan_only = HardwareSnapshot {
            fan_speed: Some(1200),
            ..HardwareSnapshot::empty("AMD")
        };
        assert!(!fan_only.is_empty());
    }

    #[test]
    fn test_chain_falls_back_to_second_probe() {
        let expected = snapshot_with_temp("AMD", 70);
        let chain = ProbeChain::new(vec![
            Box::new(FixedProbe::new("first", None)),
            Box::new(FixedProbe::new("second", Some(expected.clone()))),
        ]);

        assert_eq!(chain.sample(), Some(expected));
    }

    #[test]
    fn test_chain_skips_empty_snapshot() {
        let expected = snapshot_with_temp("Simulated", 60);
        let chain = ProbeChain::new(vec![
            Box::new(FixedProbe::new("blank", Some(HardwareSnapshot::empty("NVIDIA")))),
            Box::new(FixedProbe::new("synthetic", Some(expected.clone()))),
        ]);

        assert_eq!(chain.sample(), Some(expected));
    }

    #[test]
    fn test_chain_all_absent_returns_none() {
        let first = FixedProbe::new("first", None);
        let second = FixedProbe::new("second", None);
        let first_calls = first.calls.clone();
        let second_calls = second.calls.clone();
        let chain = ProbeChain::new(vec![Box::new(first), Box::new(second)]);

        assert!(chain.sample().is_none());
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_chain_stops_at_first_success() {
        let winner = FixedProbe::new("winner", Some(snapshot_with_temp("NVIDIA", 55)));
        let never = FixedProbe::new("never", Some(snapshot_with_temp("AMD", 40)));
        let never_calls = never.calls.clone();
        let chain = ProbeChain::new(vec![Box::new(winner), Box::new(never)]);

        assert_eq!(chain.sample().unwrap().vendor, "NVIDIA");
        assert_eq!(never_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_default_chain_order() {
        let chain = ProbeChain::default_chain(true);
        assert_eq!(chain.probe_names(), vec!["nvidia-smi", "sysfs", "simulated"]);

        let hardware_only = ProbeChain::default_chain(false);
        assert_eq!(hardware_only.len(), 2);
    }

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = snapshot_with_temp("AMD", 71);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"temperatureC\":71"));
        assert!(json.contains("\"throttling\":false"));
    }
}
