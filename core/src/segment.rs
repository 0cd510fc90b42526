//! Core data model shared across C2-C4 (spec.md §3).

use std::time::Duration;

/// Direction relative to the desktop simulator process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards the desktop simulator (server -> client, or companion -> desktop).
    Inbound,
    /// Away from the desktop simulator (client -> server, or desktop -> companion).
    Outbound,
    Unknown,
}

/// One of the five directional contexts the demultiplexer routes into.
/// Encodes the `(protocol, side, role)` triple from spec.md §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneId {
    /// TCP, game server -> client (`src_port == P_TCP`).
    GameInboundTcp,
    /// TCP, companion -> desktop (`src_port == P_COMPANION`).
    CompanionOutboundTcp,
    /// TCP, desktop -> companion (`dst_port == P_COMPANION`).
    CompanionInboundTcp,
    /// UDP, game server -> client (`src_port == P_UDP`).
    GameInboundUdp,
    /// UDP, game client -> server (`dst_port == P_UDP`).
    GameOutboundUdp,
}

impl LaneId {
    pub fn direction(self) -> Direction {
        match self {
            LaneId::GameInboundTcp | LaneId::CompanionInboundTcp | LaneId::GameInboundUdp => {
                Direction::Inbound
            }
            LaneId::CompanionOutboundTcp | LaneId::GameOutboundUdp => Direction::Outbound,
        }
    }

    pub fn is_tcp(self) -> bool {
        matches!(
            self,
            LaneId::GameInboundTcp | LaneId::CompanionOutboundTcp | LaneId::CompanionInboundTcp
        )
    }
}

/// One TCP segment or UDP datagram, already classified into a lane by C2.
#[derive(Debug, Clone)]
pub struct Segment {
    pub lane_id: LaneId,
    pub push_flag: bool,
    pub ack_flag: bool,
    pub payload: Vec<u8>,
    pub capture_time: Duration,
}

impl Segment {
    pub fn direction(&self) -> Direction {
        self.lane_id.direction()
    }
}

/// A single complete, length-framed payload produced by the TCP
/// reassembler (C3), or the stripped body of a UDP datagram (C4).
#[derive(Debug, Clone)]
pub struct LanePayload {
    pub lane_id: LaneId,
    /// Capture-time offset in milliseconds from the first segment seen on
    /// this lane. An opaque, monotonic correlation id, not a protocol
    /// concept (spec.md §3).
    pub sequence_number: u32,
    pub bytes: Vec<u8>,
}
