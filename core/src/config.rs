//! Fixed protocol constants and session-level configuration (spec.md §6).

use std::time::Duration;

/// Game UDP port.
pub const P_UDP: u16 = 3022;
/// Game TCP port.
pub const P_TCP: u16 = 3023;
/// Companion-app TCP port.
pub const P_COMPANION: u16 = 21587;

/// BPF filter covering the game ports only. Companion capture additionally
/// requires `P_COMPANION` and is opt-in (`CaptureConfig::include_companion`).
pub const BASE_BPF_FILTER: &str = "udp port 3022 or tcp port 3023";

/// Read timeout used on a live capture handle so the session loop can poll
/// its cancellation token between frames (spec.md §5).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Maximum length a TCP lane will accept for `expected_len` before treating
/// it as corruption and resetting (spec.md §4.3 "Failure semantics").
pub const MAX_REASSEMBLY_LEN: usize = 16 * 1024 * 1024;

/// How the capture session selects an interface (spec.md §6, input (a)).
#[derive(Debug, Clone)]
pub enum InterfaceSelector {
    /// Device name, IPv4 dotted-quad, or friendly display name, matched
    /// case-insensitively in that order.
    Named(String),
    /// First interface with at least one address.
    FirstAvailable,
}

impl InterfaceSelector {
    pub fn from_str_opt(s: &str) -> Self {
        if s.is_empty() {
            InterfaceSelector::FirstAvailable
        } else {
            InterfaceSelector::Named(s.to_string())
        }
    }
}

/// What the pipeline should build BPF-filter-wise and which lanes to wire up.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub include_companion: bool,
    pub read_timeout: Duration,
    pub max_reassembly_len: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            include_companion: false,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_reassembly_len: MAX_REASSEMBLY_LEN,
        }
    }
}

impl CaptureConfig {
    /// The effective BPF filter for this configuration (spec.md §6).
    pub fn bpf_filter(&self) -> String {
        if self.include_companion {
            format!("{BASE_BPF_FILTER} or tcp port {P_COMPANION}")
        } else {
            BASE_BPF_FILTER.to_string()
        }
    }
}
