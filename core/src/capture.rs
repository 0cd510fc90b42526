//! Frame source (C1, spec.md §4.1), backed by the `pcap` crate.

use std::path::Path;
use std::time::Duration;

use pcap::{Capture, Device};

use crate::config::InterfaceSelector;
use crate::demux::{link_type_from_dlt, LinkType};
use crate::error::CaptureError;

/// One frame pulled off the wire or out of a capture file, with enough
/// context for C2 to classify it (spec.md §4.1).
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub link_type: LinkType,
    pub data: Vec<u8>,
    pub timestamp: Duration,
}

/// Abstracts over a live interface and an offline capture file so the
/// session loop (spec.md §4.8) doesn't care which it was given.
pub trait CaptureSource {
    /// `Ok(None)` signals end-of-stream; only reachable in file-replay mode
    /// (spec.md §4.1 "Termination").
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError>;
}

enum Activity {
    Live(Capture<pcap::Active>),
    Offline(Capture<pcap::Offline>),
}

pub struct PcapSource {
    activity: Activity,
    link_type: LinkType,
}

impl PcapSource {
    /// Opens a live capture on the interface resolved by `selector`
    /// (spec.md §6, input (a)) with the given BPF filter and read timeout.
    pub fn open_live(
        selector: &InterfaceSelector,
        bpf_filter: &str,
        read_timeout: Duration,
    ) -> Result<Self, CaptureError> {
        let device = resolve_interface(selector)?;
        let device_name = device.name.clone();

        let mut cap = Capture::from_device(device)
            .map_err(CaptureError::Pcap)?
            .timeout(i32::try_from(read_timeout.as_millis()).unwrap_or(i32::MAX))
            .promisc(true)
            .immediate_mode(true)
            .open()
            .map_err(|e| match e {
                pcap::Error::PcapError(msg) if msg.to_lowercase().contains("permission") => {
                    CaptureError::InsufficientPrivilege
                }
                other => CaptureError::Pcap(other),
            })?;

        cap.filter(bpf_filter, true).map_err(CaptureError::Pcap)?;

        tracing::info!(interface = %device_name, filter = %bpf_filter, "opened live capture");

        let link_type = link_type_from_dlt(cap.get_datalink().0);

        Ok(Self {
            activity: Activity::Live(cap),
            link_type,
        })
    }

    /// Opens a pre-recorded capture file for offline replay.
    pub fn open_file(path: &Path) -> Result<Self, CaptureError> {
        if !path.exists() {
            return Err(CaptureError::CaptureFileNotFound(path.to_path_buf()));
        }

        let cap = Capture::from_file(path).map_err(|e| match e {
            pcap::Error::MalformedError(_) => CaptureError::MalformedCaptureFile,
            other => CaptureError::Pcap(other),
        })?;

        let link_type = link_type_from_dlt(cap.get_datalink().0);

        Ok(Self {
            activity: Activity::Offline(cap),
            link_type,
        })
    }
}

impl CaptureSource for PcapSource {
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError> {
        let result = match &mut self.activity {
            Activity::Live(cap) => cap.next_packet(),
            Activity::Offline(cap) => cap.next_packet(),
        };

        match result {
            Ok(packet) => {
                let timestamp = Duration::new(
                    packet.header.ts.tv_sec.max(0) as u64,
                    (packet.header.ts.tv_usec.max(0) as u32).saturating_mul(1000),
                );
                Ok(Some(CapturedFrame {
                    link_type: self.link_type,
                    data: packet.data.to_vec(),
                    timestamp,
                }))
            }
            Err(pcap::Error::TimeoutExpired) => Ok(Some(CapturedFrame {
                link_type: self.link_type,
                data: Vec::new(),
                timestamp: Duration::ZERO,
            })),
            Err(pcap::Error::NoMorePackets) => Ok(None),
            Err(e) => Err(CaptureError::Pcap(e)),
        }
    }
}

/// Resolves an [`InterfaceSelector`] to a concrete [`Device`]: device name,
/// then IPv4 dotted-quad, then case-insensitive friendly name, in that order
/// (spec.md §6, input (a)).
fn resolve_interface(selector: &InterfaceSelector) -> Result<Device, CaptureError> {
    let devices = Device::list().map_err(CaptureError::Pcap)?;

    match selector {
        InterfaceSelector::FirstAvailable => devices
            .into_iter()
            .find(|d| !d.addresses.is_empty())
            .ok_or_else(|| CaptureError::NoSuchInterface("<first available>".to_string())),
        InterfaceSelector::Named(name) => {
            if let Some(d) = devices.iter().find(|d| d.name == *name) {
                return Ok(d.clone());
            }

            if let Some(d) = devices.iter().find(|d| {
                d.addresses
                    .iter()
                    .any(|a| a.addr.to_string().eq_ignore_ascii_case(name))
            }) {
                return Ok(d.clone());
            }

            if let Some(d) = devices.iter().find(|d| {
                d.desc
                    .as_deref()
                    .is_some_and(|desc| desc.eq_ignore_ascii_case(name))
            }) {
                return Ok(d.clone());
            }

            Err(CaptureError::NoSuchInterface(name.clone()))
        }
    }
}
