//! Capture session state machine (spec.md §4.8), tying C1 through C7
//! together.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::capture::CaptureSource;
use crate::config::CaptureConfig;
use crate::demux;
use crate::diagnostics::DiagnosticSink;
use crate::error::CaptureError;
use crate::events::EventMeta;
use crate::reassembler::LaneReassembler;
use crate::router::EventRouter;
use crate::segment::LaneId;
use crate::{companion_decoder, game_decoder, udp_strip};

/// Cooperative cancellation signal polled between frames (spec.md §5
/// "Cancellation and timeouts"). Cloning shares the same underlying flag.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Drives one capture run through `Idle -> Running -> Stopping -> Idle`
/// (spec.md §4.8 "Session state"). Returns only on a fatal [`CaptureError`]
/// or clean cancellation.
pub struct CaptureSession {
    router: EventRouter,
    config: CaptureConfig,
    game_inbound: LaneReassembler,
    companion_inbound: LaneReassembler,
    companion_outbound: LaneReassembler,
}

impl CaptureSession {
    pub fn new(router: EventRouter, config: CaptureConfig) -> Self {
        let max_len = config.max_reassembly_len;
        Self {
            router,
            config,
            game_inbound: LaneReassembler::new(LaneId::GameInboundTcp, max_len),
            companion_inbound: LaneReassembler::new(LaneId::CompanionInboundTcp, max_len),
            companion_outbound: LaneReassembler::new(LaneId::CompanionOutboundTcp, max_len),
        }
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Runs the capture loop until end-of-stream (file replay), a fatal
    /// error, or `cancel` is set.
    pub fn run(
        &mut self,
        mut source: impl CaptureSource,
        cancel: &CancellationToken,
        sink: &dyn DiagnosticSink,
    ) -> Result<(), CaptureError> {
        tracing::info!("capture session starting");

        loop {
            if cancel.is_cancelled() {
                tracing::info!("capture session cancelled");
                break;
            }

            let frame = match source.next_frame()? {
                Some(frame) => frame,
                None => {
                    tracing::info!("capture session reached end of stream");
                    break;
                }
            };

            if frame.data.is_empty() {
                // Read timed out; nothing to process this tick, just loop
                // back around to re-check cancellation (spec.md §5).
                continue;
            }

            let segment = match demux::classify(frame.link_type, &frame.data, frame.timestamp) {
                Ok(Some(segment)) => segment,
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(error = %e, "dropping unparseable or unrelated frame");
                    continue;
                }
            };

            self.handle_segment(segment, sink);
        }

        Ok(())
    }

    fn handle_segment(&mut self, segment: crate::segment::Segment, sink: &dyn DiagnosticSink) {
        let lane_id = segment.lane_id;
        let capture_time = segment.capture_time;
        let direction = segment.direction();

        if lane_id.is_tcp() {
            let reassembler = self.reassembler_for(lane_id);
            let payloads = reassembler.feed(&segment.payload, capture_time);

            for payload in payloads {
                let meta = EventMeta {
                    direction,
                    sequence_number: Some(payload.sequence_number),
                };
                self.dispatch(lane_id, &payload.bytes, meta, sink);
            }
        } else {
            let body = match udp_strip::strip(&segment.payload, direction) {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(error = %e, "dropping malformed UDP datagram");
                    return;
                }
            };

            let meta = EventMeta {
                direction,
                sequence_number: None,
            };
            self.dispatch(lane_id, body, meta, sink);
        }
    }

    fn reassembler_for(&mut self, lane_id: LaneId) -> &mut LaneReassembler {
        match lane_id {
            LaneId::GameInboundTcp => &mut self.game_inbound,
            LaneId::CompanionInboundTcp => &mut self.companion_inbound,
            LaneId::CompanionOutboundTcp => &mut self.companion_outbound,
            LaneId::GameInboundUdp | LaneId::GameOutboundUdp => {
                unreachable!("UDP lanes never reassemble")
            }
        }
    }

    fn dispatch(&self, lane_id: LaneId, body: &[u8], meta: EventMeta, sink: &dyn DiagnosticSink) {
        let result = match lane_id {
            LaneId::GameInboundTcp | LaneId::GameInboundUdp => {
                game_decoder::decode_inbound(body, meta, &self.router, sink)
            }
            LaneId::GameOutboundUdp => game_decoder::decode_outbound(body, meta, &self.router),
            LaneId::CompanionOutboundTcp => {
                companion_decoder::decode_outbound(body, meta, &self.router, sink)
            }
            LaneId::CompanionInboundTcp => {
                if !self.config.include_companion {
                    return;
                }
                companion_decoder::decode_inbound(body, meta, &self.router, sink)
            }
        };

        if let Err(e) = result {
            tracing::warn!(lane = ?lane_id, error = %e, "failed to decode envelope");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CapturedFrame;
    use crate::demux::LinkType;
    use crate::diagnostics::NullDiagnosticSink;
    use crate::events::{EventKind, MonitorEvent};
    use etherparse::PacketBuilder;
    use prost::Message;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use zwift_messages::game;

    struct ScriptedSource {
        frames: std::vec::IntoIter<CapturedFrame>,
    }

    impl CaptureSource for ScriptedSource {
        fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError> {
            Ok(self.frames.next())
        }
    }

    fn game_tcp_frame(payload: &[u8]) -> CapturedFrame {
        let builder = PacketBuilder::ethernet2([1, 2, 3, 4, 5, 6], [6, 5, 4, 3, 2, 1])
            .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
            .tcp(3023, 54321, 0, 1024)
            .psh(true);
        let mut out = Vec::new();

        let mut framed = Vec::new();
        framed.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        framed.extend_from_slice(payload);

        builder.write(&mut out, &framed).unwrap();
        CapturedFrame {
            link_type: LinkType::Ethernet,
            data: out,
            timestamp: std::time::Duration::ZERO,
        }
    }

    #[test]
    fn end_to_end_game_chat_message() {
        let chat = game::ChatMessage {
            rider_id: 1,
            message: "hi".into(),
            distance: 0.0,
            is_team: false,
        };
        let update = game::PlayerUpdate {
            tag1: 0,
            tag2: 0,
            update_type: 5,
            payload: chat.encode_to_vec(),
        };
        let envelope = game::ServerToClient {
            player_states: vec![],
            event_positions: None,
            player_updates: vec![update],
        };
        let frame = game_tcp_frame(&envelope.encode_to_vec());

        let router = EventRouter::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        router.subscribe(
            Some(EventKind::ChatMessage),
            Box::new(move |_e: &MonitorEvent| {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let mut session = CaptureSession::new(router, CaptureConfig::default());
        let source = ScriptedSource {
            frames: vec![frame].into_iter(),
        };
        let cancel = CancellationToken::new();

        session.run(source, &cancel, &NullDiagnosticSink).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_frame_from_timeout_does_not_abort_session() {
        let router = EventRouter::new();
        let mut session = CaptureSession::new(router, CaptureConfig::default());
        let timeout_frame = CapturedFrame {
            link_type: LinkType::Ethernet,
            data: Vec::new(),
            timestamp: std::time::Duration::ZERO,
        };
        let source = ScriptedSource {
            frames: vec![timeout_frame].into_iter(),
        };
        let cancel = CancellationToken::new();
        session.run(source, &cancel, &NullDiagnosticSink).unwrap();
    }
}
