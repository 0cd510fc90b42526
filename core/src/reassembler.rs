//! Per-lane TCP payload reassembler (C3, spec.md §4.3/§4.8).
//!
//! Framing is `BE16(len) || body[len]`, repeated; a single segment may
//! carry zero, one, or several complete frames, and a single frame may
//! span several segments. Completion is detected purely by byte count —
//! the TCP PUSH flag is never consulted (spec.md §9, "Open question — PUSH
//! semantics").

use std::time::Duration;

use crate::error::ReassemblyError;
use crate::segment::{LaneId, LanePayload};

/// The reassembler's externally-observable state (spec.md §3
/// `ReassemblerState`, §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneState {
    Fresh,
    Partial { expected_len: u16, have: usize },
}

/// One lane's reassembly state machine. The game-inbound, companion-inbound
/// and companion-outbound lanes each get their own independent instance.
pub struct LaneReassembler {
    lane_id: LaneId,
    buffer: Vec<u8>,
    expected_len: Option<u16>,
    epoch: Option<Duration>,
    max_len: usize,
}

impl LaneReassembler {
    pub fn new(lane_id: LaneId, max_len: usize) -> Self {
        Self {
            lane_id,
            buffer: Vec::new(),
            expected_len: None,
            epoch: None,
            max_len,
        }
    }

    pub fn state(&self) -> LaneState {
        match self.expected_len {
            None => LaneState::Fresh,
            Some(want) => LaneState::Partial {
                expected_len: want,
                have: self.buffer.len(),
            },
        }
    }

    /// Forces the lane back to fresh state, discarding any accumulator.
    /// Used by external recovery and by tests (spec.md §4.3).
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.expected_len = None;
    }

    /// Feeds one segment's payload bytes into the lane, returning zero or
    /// more completed [`LanePayload`]s in capture order (spec.md §4.3
    /// "Overflow handling must be iterative until no bytes remain").
    pub fn feed(&mut self, payload: &[u8], capture_time: Duration) -> Vec<LanePayload> {
        let epoch = *self.epoch.get_or_insert(capture_time);
        self.buffer.extend_from_slice(payload);

        let mut out = Vec::new();

        loop {
            match self.expected_len {
                None => {
                    if self.buffer.len() < 2 {
                        // Length not yet known; buffer the bytes and wait
                        // (spec.md §4.3 edge case).
                        break;
                    }

                    let want = u16::from_be_bytes([self.buffer[0], self.buffer[1]]);

                    if want as usize > self.max_len {
                        let err = ReassemblyError::OversizeLength {
                            declared: want as usize,
                            max: self.max_len,
                        };
                        tracing::warn!(lane = ?self.lane_id, error = %err, "resetting lane");
                        self.reset();
                        break;
                    }

                    self.buffer.drain(0..2);
                    self.expected_len = Some(want);
                }
                Some(want) => {
                    let want = want as usize;

                    if self.buffer.len() < want {
                        break;
                    }

                    let frame: Vec<u8> = self.buffer.drain(0..want).collect();
                    self.expected_len = None;

                    let sequence_number = capture_time
                        .saturating_sub(epoch)
                        .as_millis()
                        .min(u64::from(u32::MAX)) as u32;

                    out.push(LanePayload {
                        lane_id: self.lane_id,
                        sequence_number,
                        bytes: frame,
                    });
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn reassembler() -> LaneReassembler {
        LaneReassembler::new(LaneId::GameInboundTcp, 16 * 1024 * 1024)
    }

    fn t(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn single_complete_frame() {
        let mut r = reassembler();
        let out = r.feed(&[0x00, 0x01, 0xAA], t(0));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bytes, vec![0xAA]);
        assert_eq!(r.state(), LaneState::Fresh);
    }

    #[test]
    fn two_segment_fragmentation() {
        let mut r = reassembler();
        assert!(r.feed(&[0x00, 0x02, 0xAA], t(0)).is_empty());
        let out = r.feed(&[0xBB], t(5));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bytes, vec![0xAA, 0xBB]);
        assert_eq!(r.state(), LaneState::Fresh);
    }

    #[test]
    fn three_segment_fragmentation() {
        let mut r = reassembler();
        assert!(r.feed(&[0x00, 0x03, 0xAA], t(0)).is_empty());
        assert!(r.feed(&[0xBB], t(1)).is_empty());
        let out = r.feed(&[0xCC], t(2));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bytes, vec![0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn coalesced_frames_in_one_segment() {
        let mut r = reassembler();
        let out = r.feed(&[0x00, 0x01, 0xAA, 0x00, 0x01, 0xBB, 0x00, 0x01, 0xCC], t(0));
        let bytes: Vec<_> = out.iter().map(|p| p.bytes.clone()).collect();
        assert_eq!(bytes, vec![vec![0xAA], vec![0xBB], vec![0xCC]]);
    }

    #[test]
    fn header_only_segment_waits() {
        let mut r = reassembler();
        assert!(r.feed(&[0x00, 0x01], t(0)).is_empty());
        assert_eq!(r.state(), LaneState::Partial { expected_len: 1, have: 0 });
        let out = r.feed(&[0x42], t(1));
        assert_eq!(out[0].bytes, vec![0x42]);
    }

    #[test]
    fn single_byte_segment_in_fresh_state_waits() {
        let mut r = reassembler();
        assert!(r.feed(&[0x00], t(0)).is_empty());
        assert_eq!(r.state(), LaneState::Fresh);
        let out = r.feed(&[0x01, 0x99], t(1));
        assert_eq!(out[0].bytes, vec![0x99]);
    }

    #[test]
    fn exact_frame_boundary_segment() {
        let mut r = reassembler();
        let out = r.feed(&[0x00, 0x02, 0x01, 0x02], t(0));
        assert_eq!(out.len(), 1);
        assert_eq!(r.state(), LaneState::Fresh);
    }

    #[test]
    fn one_and_a_half_frames() {
        let mut r = reassembler();
        let out = r.feed(&[0x00, 0x01, 0xAA, 0x00, 0x02, 0xBB], t(0));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].bytes, vec![0xAA]);
        assert_eq!(r.state(), LaneState::Partial { expected_len: 2, have: 1 });
    }

    #[test]
    fn zero_length_frame() {
        let mut r = reassembler();
        let out = r.feed(&[0x00, 0x00, 0x00, 0x01, 0xAA], t(0));
        let bytes: Vec<_> = out.iter().map(|p| p.bytes.clone()).collect();
        assert_eq!(bytes, vec![Vec::<u8>::new(), vec![0xAA]]);
    }

    #[test]
    fn oversize_length_resets_lane() {
        let mut r = LaneReassembler::new(LaneId::GameInboundTcp, 4);
        let out = r.feed(&[0x00, 0xFF, 0xAA, 0xBB], t(0));
        assert!(out.is_empty());
        assert_eq!(r.state(), LaneState::Fresh);
    }

    #[test]
    fn reset_returns_to_fresh() {
        let mut r = reassembler();
        r.feed(&[0x00, 0x05, 0xAA], t(0));
        assert_ne!(r.state(), LaneState::Fresh);
        r.reset();
        assert_eq!(r.state(), LaneState::Fresh);
        let out = r.feed(&[0x00, 0x01, 0x7F], t(1));
        assert_eq!(out[0].bytes, vec![0x7F]);
    }

    proptest! {
        #[test]
        fn framing_round_trip(frames in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..200), 1..20), split_points in prop::collection::vec(1usize..5, 0..50)) {
            let mut wire = Vec::new();
            for f in &frames {
                wire.extend_from_slice(&(f.len() as u16).to_be_bytes());
                wire.extend_from_slice(f);
            }

            // Chop `wire` into arbitrary contiguous chunks using split_points as
            // relative chunk sizes (mod remaining length, at least 1 byte).
            let mut chunks = Vec::new();
            let mut rest = &wire[..];
            let mut idx = 0;
            while !rest.is_empty() {
                let hint = split_points.get(idx).copied().unwrap_or(1).max(1);
                let n = hint.min(rest.len());
                let (a, b) = rest.split_at(n);
                chunks.push(a.to_vec());
                rest = b;
                idx += 1;
            }

            let mut r = LaneReassembler::new(LaneId::GameInboundTcp, 1 << 20);
            let mut got = Vec::new();
            for (i, c) in chunks.iter().enumerate() {
                got.extend(r.feed(c, Duration::from_millis(i as u64)).into_iter().map(|p| p.bytes));
            }

            prop_assert_eq!(got, frames);

            match r.state() {
                LaneState::Fresh => {}
                LaneState::Partial { expected_len, have } => prop_assert!(have < expected_len as usize),
            }
        }

    }

    #[test_strategy::proptest]
    fn reset_is_idempotent_with_fresh(
        #[strategy(prop::collection::vec(any::<u8>(), 0..40))] payload: Vec<u8>,
    ) {
        let mut a = LaneReassembler::new(LaneId::GameInboundTcp, 1 << 20);
        let mut b = LaneReassembler::new(LaneId::GameInboundTcp, 1 << 20);

        a.feed(&payload, Duration::from_millis(0));
        a.reset();

        let out_a = a.feed(&[0x00, 0x01, 0x55], Duration::from_millis(1));
        let out_b = b.feed(&[0x00, 0x01, 0x55], Duration::from_millis(1));

        prop_assert_eq!(out_a.len(), out_b.len());
        for (x, y) in out_a.iter().zip(out_b.iter()) {
            prop_assert_eq!(&x.bytes, &y.bytes);
        }
        prop_assert_eq!(a.state(), b.state());
    }
}
