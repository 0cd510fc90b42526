//! Game-protocol decoder (C5, spec.md §4.5).

use prost::Message;

use crate::diagnostics::DiagnosticSink;
use crate::error::DecodeError;
use crate::events::{EventMeta, MonitorEvent};
use crate::router::EventRouter;
use crate::segment::Direction;
use zwift_messages::game;

/// Known-but-opaque update-type tags: recorded for diagnostics, no event
/// (spec.md §4.5 table).
const KNOWN_OPAQUE_TAGS: &[i32] = &[102, 106, 109, 110, 116];

/// Decodes an outbound (client -> server) game payload: at most one
/// `PlayerState` sub-message.
pub fn decode_outbound(
    payload: &[u8],
    meta: EventMeta,
    router: &EventRouter,
) -> Result<(), DecodeError> {
    let envelope = game::ClientToServer::decode(payload)?;

    if let Some(state) = envelope.state {
        router.publish(&MonitorEvent::OutgoingPlayerState(meta, state));
    }

    Ok(())
}

/// Decodes an inbound (server -> client) game payload: zero or more
/// `PlayerState`s, an optional `EventPositions` block, and a batch of
/// tagged update records (spec.md §4.5).
pub fn decode_inbound(
    payload: &[u8],
    meta: EventMeta,
    router: &EventRouter,
    sink: &dyn DiagnosticSink,
) -> Result<(), DecodeError> {
    let envelope = game::ServerToClient::decode(payload)?;

    for state in envelope.player_states {
        router.publish(&MonitorEvent::IncomingPlayerState(meta, state));
    }

    if let Some(positions) = envelope.event_positions {
        router.publish(&MonitorEvent::EventPositions(meta, positions));
    }

    for update in envelope.player_updates {
        decode_update_record(&update, meta, router, sink);
    }

    Ok(())
}

/// A single failed sub-record is isolated: log the offending bytes in hex
/// and continue with the next one (spec.md §4.5 "Parse failure policy").
fn decode_update_record(
    update: &game::PlayerUpdate,
    meta: EventMeta,
    router: &EventRouter,
    sink: &dyn DiagnosticSink,
) {
    let tag = update.update_type;
    let body = &update.payload[..];

    macro_rules! try_decode {
        ($ty:ty, $variant:expr) => {
            match <$ty>::decode(body) {
                Ok(msg) => router.publish(&$variant(msg)),
                Err(e) => {
                    tracing::warn!(
                        update_type = tag,
                        body = %hex::encode(body),
                        error = %e,
                        "failed to decode player-update sub-record"
                    );
                }
            }
        };
    }

    match tag {
        3 => try_decode!(game::TimeSync, |m| MonitorEvent::PlayerTimeSync(meta, m)),
        4 => try_decode!(game::RideOnGiven, |m| MonitorEvent::RideOnGiven(meta, m)),
        5 => try_decode!(game::ChatMessage, |m| MonitorEvent::ChatMessage(meta, m)),
        6 | 10 => try_decode!(game::Meetup, |m| MonitorEvent::MeetupUpdate(meta, m)),
        105 => try_decode!(game::PlayerEnteredWorld, |m| MonitorEvent::PlayerEnteredWorld(
            meta, m
        )),
        t if KNOWN_OPAQUE_TAGS.contains(&t) => {
            sink.store(
                &format!("known_opaque_{t}"),
                body,
                meta.direction,
                meta.sequence_number,
            );
        }
        t => {
            tracing::warn!(update_type = t, "unrecognised player-update tag");
            sink.store(
                &format!("unknown_update_{t}"),
                body,
                meta.direction,
                meta.sequence_number,
            );
        }
    }
}
