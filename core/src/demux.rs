//! L3/L4 demultiplexer (C2, spec.md §4.2).

use std::time::Duration;

use etherparse::NetSlice::{Ipv4, Ipv6};
use etherparse::SlicedPacket;
use etherparse::TransportSlice::{Tcp, Udp};

use crate::config::{P_COMPANION, P_TCP, P_UDP};
use crate::error::DemuxError;
use crate::segment::{LaneId, Segment};

/// The link-layer framing of a captured frame, as reported by the capture
/// source (spec.md §4.1: "(link_type, frame_bytes, capture_timestamp)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    Ethernet,
    RawIp,
}

/// Parses one frame and classifies it into exactly one lane, per the
/// ordered rules in spec.md §4.2. Returns `Ok(None)` for frames that are
/// dropped by rule 2 or rule 7 — not an error, just not our traffic.
pub fn classify(
    link_type: LinkType,
    frame: &[u8],
    capture_time: Duration,
) -> Result<Option<Segment>, DemuxError> {
    let sliced = match link_type {
        LinkType::Ethernet => SlicedPacket::from_ethernet(frame),
        LinkType::RawIp => SlicedPacket::from_ip(frame),
    }
    .map_err(|e| DemuxError::HeaderParse(e.to_string()))?;

    match sliced.net {
        Some(Ipv4(_)) | Some(Ipv6(_)) => {}
        _ => return Err(DemuxError::NotTransport),
    }

    match sliced.transport {
        Some(Tcp(tcp)) => {
            let header = tcp.to_header();

            let lane_id = match (header.source_port, header.destination_port) {
                (src, _) if src == P_TCP => LaneId::GameInboundTcp,
                (_, dst) if dst == P_TCP => return Ok(None), // rule 2: handshake/ACK-only
                (src, _) if src == P_COMPANION => LaneId::CompanionOutboundTcp,
                (_, dst) if dst == P_COMPANION => LaneId::CompanionInboundTcp,
                _ => return Ok(None),
            };

            Ok(Some(Segment {
                lane_id,
                push_flag: header.psh,
                ack_flag: header.ack,
                payload: tcp.payload().to_vec(),
                capture_time,
            }))
        }
        Some(Udp(udp)) => {
            let header = udp.to_header();

            let lane_id = match (header.source_port, header.destination_port) {
                (src, _) if src == P_UDP => LaneId::GameInboundUdp,
                (_, dst) if dst == P_UDP => LaneId::GameOutboundUdp,
                _ => return Ok(None),
            };

            Ok(Some(Segment {
                lane_id,
                push_flag: false,
                ack_flag: false,
                payload: udp.payload().to_vec(),
                capture_time,
            }))
        }
        _ => Ok(None), // rule 7: everything else, dropped silently
    }
}

/// Best-effort mapping from a pcap DLT link-type code to [`LinkType`].
/// Anything not recognised falls back to [`LinkType::Ethernet`], which is
/// overwhelmingly the common case for live captures.
pub fn link_type_from_dlt(dlt: i32) -> LinkType {
    match dlt {
        // DLT_RAW and DLT_NULL/LOOP style links carry a bare IP packet.
        12 | 101 | 0 => LinkType::RawIp,
        _ => LinkType::Ethernet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etherparse::PacketBuilder;

    fn eth_tcp(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
        let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [6, 5, 4, 3, 2, 1])
            .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
            .tcp(src_port, dst_port, 0, 1024)
            .psh(true);
        let mut out = Vec::new();
        builder.write(&mut out, payload).unwrap();
        out
    }

    fn eth_udp(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
        let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [6, 5, 4, 3, 2, 1])
            .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
            .udp(src_port, dst_port);
        let mut out = Vec::new();
        builder.write(&mut out, payload).unwrap();
        out
    }

    #[test]
    fn game_tcp_src_is_inbound() {
        let frame = eth_tcp(P_TCP, 54321, b"hello");
        let seg = classify(LinkType::Ethernet, &frame, Duration::ZERO)
            .unwrap()
            .unwrap();
        assert_eq!(seg.lane_id, LaneId::GameInboundTcp);
        assert_eq!(seg.payload, b"hello");
        assert!(seg.push_flag);
    }

    #[test]
    fn game_tcp_dst_is_dropped() {
        let frame = eth_tcp(54321, P_TCP, b"ack-only");
        assert!(classify(LinkType::Ethernet, &frame, Duration::ZERO)
            .unwrap()
            .is_none());
    }

    #[test]
    fn companion_src_is_outbound() {
        let frame = eth_tcp(P_COMPANION, 54321, b"from-phone");
        let seg = classify(LinkType::Ethernet, &frame, Duration::ZERO)
            .unwrap()
            .unwrap();
        assert_eq!(seg.lane_id, LaneId::CompanionOutboundTcp);
    }

    #[test]
    fn companion_dst_is_inbound() {
        let frame = eth_tcp(54321, P_COMPANION, b"to-phone");
        let seg = classify(LinkType::Ethernet, &frame, Duration::ZERO)
            .unwrap()
            .unwrap();
        assert_eq!(seg.lane_id, LaneId::CompanionInboundTcp);
    }

    #[test]
    fn udp_src_is_inbound() {
        let frame = eth_udp(P_UDP, 54321, b"\x08\x01");
        let seg = classify(LinkType::Ethernet, &frame, Duration::ZERO)
            .unwrap()
            .unwrap();
        assert_eq!(seg.lane_id, LaneId::GameInboundUdp);
    }

    #[test]
    fn udp_dst_is_outbound() {
        let frame = eth_udp(54321, P_UDP, b"\x08\x01");
        let seg = classify(LinkType::Ethernet, &frame, Duration::ZERO)
            .unwrap()
            .unwrap();
        assert_eq!(seg.lane_id, LaneId::GameOutboundUdp);
    }

    #[test]
    fn unrelated_traffic_is_dropped() {
        let frame = eth_tcp(80, 443, b"http");
        assert!(classify(LinkType::Ethernet, &frame, Duration::ZERO)
            .unwrap()
            .is_none());
    }
}
