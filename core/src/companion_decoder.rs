//! Companion-protocol decoder (C6, spec.md §4.6).

use prost::Message;

use crate::diagnostics::DiagnosticSink;
use crate::error::DecodeError;
use crate::events::{CompanionCommand, EventMeta, MonitorEvent, RiderPosition};
use zwift_messages::companion;

use crate::router::EventRouter;

/// Outbound (companion app -> desktop). Payloads of 10 bytes or fewer are
/// heartbeats and never parsed as an envelope (spec.md §4.6).
pub fn decode_outbound(
    payload: &[u8],
    meta: EventMeta,
    router: &EventRouter,
    sink: &dyn DiagnosticSink,
) -> Result<(), DecodeError> {
    if payload.len() <= 10 {
        router.publish(&MonitorEvent::HeartBeat(meta));
        return Ok(());
    }

    let envelope = companion::RiderMessage::decode(payload)?;

    let Some(detail) = envelope.detail else {
        if envelope.tag10 == 0 {
            if let Ok(clock) = companion::ClockSync::decode(payload) {
                router.publish(&MonitorEvent::ClockSync(meta, clock.time));
            }
        }
        return Ok(());
    };

    match detail.r#type {
        16 => {
            // Ride-on candidate: too frequent to emit as a user ride-on event.
            sink.store("ride_on_candidate", payload, meta.direction, meta.sequence_number);
        }
        22 if detail.command_type != 0 => {
            let command = CompanionCommand::from_code(detail.command_type);
            router.publish(&MonitorEvent::CommandSent(meta, command));
        }
        29 => {
            if let Some(data) = detail.data {
                match data.tag1 {
                    4 => router.publish(&MonitorEvent::DeviceInfo(meta, payload.to_vec())),
                    15 => {
                        router.publish(&MonitorEvent::ActivityEnded(meta, data.name.clone()));
                    }
                    other => {
                        sink.store(
                            &format!("companion_29_data_{other}"),
                            payload,
                            meta.direction,
                            meta.sequence_number,
                        );
                    }
                }
            }
        }
        14 | 20 | 28 => {
            sink.store(
                &format!("companion_detail_{}", detail.r#type),
                payload,
                meta.direction,
                meta.sequence_number,
            );
        }
        other => {
            tracing::warn!(detail_type = other, "unrecognised companion detail type");
            sink.store(
                &format!("companion_unknown_{other}"),
                payload,
                meta.direction,
                meta.sequence_number,
            );
        }
    }

    Ok(())
}

/// Inbound (desktop -> companion): a flat batch of heterogeneous items,
/// each dispatched by `item.type` (spec.md §4.6).
pub fn decode_inbound(
    payload: &[u8],
    meta: EventMeta,
    router: &EventRouter,
    sink: &dyn DiagnosticSink,
) -> Result<(), DecodeError> {
    let envelope = companion::CompanionToDesktop::decode(payload)?;

    for item in envelope.items {
        decode_item(&item, meta, router, sink);
    }

    Ok(())
}

fn decode_item(
    item: &companion::CompanionToDesktopItem,
    meta: EventMeta,
    router: &EventRouter,
    sink: &dyn DiagnosticSink,
) {
    match item.r#type {
        2 => {
            if let Some(power_up) = &item.power_up {
                router.publish(&MonitorEvent::PowerUpGranted(meta, power_up.kind.clone()));
            }
        }
        4 => {
            if let Some(cmd) = &item.command_available {
                let command = CompanionCommand::from_code(cmd.code);
                router.publish(&MonitorEvent::CommandAvailable(
                    meta,
                    command,
                    cmd.title.clone(),
                ));
            }
        }
        13 => {
            if let Some(details) = &item.activity_details {
                decode_activity_details(details, meta, router, sink);
            }
        }
        1 | 3 | 6 | 9 => {} // empty or unknown-filler, ignored
        other => {
            tracing::warn!(item_type = other, "unrecognised companion item type");
            sink.store("companion_item_unknown", &[], meta.direction, meta.sequence_number);
        }
    }
}

fn decode_activity_details(
    details: &companion::ActivityDetailsPayload,
    meta: EventMeta,
    router: &EventRouter,
    sink: &dyn DiagnosticSink,
) {
    match details.r#type {
        3 => router.publish(&MonitorEvent::ActivityDetails(meta, details.activity_id)),
        5 => {
            for group in &details.rider_groups {
                if group.index == 10 && group.riders.len() == 1 {
                    let r = &group.riders[0];
                    router.publish(&MonitorEvent::RiderPosition(
                        meta,
                        RiderPosition {
                            lat: r.lat,
                            lon: r.lon,
                            altitude: r.altitude,
                        },
                    ));
                } else {
                    tracing::debug!(index = group.index, riders = group.riders.len(), "nearby rider group");
                }
            }
        }
        17 | 19 => tracing::debug!(activity_detail_type = details.r#type, "nearby-rider log"),
        6 | 7 | 10 | 18 | 20 | 21 | 23 => {
            sink.store(
                &format!("activity_details_{}", details.r#type),
                &[],
                meta.direction,
                meta.sequence_number,
            );
        }
        other => {
            tracing::warn!(activity_detail_type = other, "unrecognised activity-detail type");
        }
    }
}
