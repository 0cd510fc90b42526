//! The typed event surface emitted by C7 (spec.md §6 "Event surface").

use crate::segment::Direction;
use zwift_messages::game;

/// Commands recognised on both the companion "sent" and "available" paths
/// (spec.md §4.6 "Command code mapping"). Stable external contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanionCommand {
    ElbowFlick,
    Wave,
    RideOn,
    Empty,
    TurnLeft,
    GoStraight,
    TurnRight,
    DiscardAero,
    DiscardLightweight,
    PowerGraph,
    HeadsUpDisplay,
    Unknown(u32),
}

impl CompanionCommand {
    pub fn from_code(code: u32) -> Self {
        match code {
            4 => CompanionCommand::ElbowFlick,
            5 => CompanionCommand::Wave,
            6 => CompanionCommand::RideOn,
            23 => CompanionCommand::Empty,
            1010 => CompanionCommand::TurnLeft,
            1011 => CompanionCommand::GoStraight,
            1012 => CompanionCommand::TurnRight,
            1030 => CompanionCommand::DiscardAero,
            1034 => CompanionCommand::DiscardLightweight,
            1060 => CompanionCommand::PowerGraph,
            1081 => CompanionCommand::HeadsUpDisplay,
            other => CompanionCommand::Unknown(other),
        }
    }
}

/// Metadata common to every emitted event.
#[derive(Debug, Clone, Copy)]
pub struct EventMeta {
    pub direction: Direction,
    /// Present for TCP-sourced events; `None` for UDP-sourced events, which
    /// have no lane sequence number (spec.md §6).
    pub sequence_number: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct RiderPosition {
    pub lat: f64,
    pub lon: f64,
    pub altitude: f64,
}

#[derive(Debug, Clone)]
pub enum MonitorEvent {
    OutgoingPlayerState(EventMeta, game::PlayerState),
    IncomingPlayerState(EventMeta, game::PlayerState),
    EventPositions(EventMeta, game::EventPositions),
    PlayerTimeSync(EventMeta, game::TimeSync),
    RideOnGiven(EventMeta, game::RideOnGiven),
    ChatMessage(EventMeta, game::ChatMessage),
    MeetupUpdate(EventMeta, game::Meetup),
    PlayerEnteredWorld(EventMeta, game::PlayerEnteredWorld),

    HeartBeat(EventMeta),
    CommandSent(EventMeta, CompanionCommand),
    CommandAvailable(EventMeta, CompanionCommand, String),
    PowerUpGranted(EventMeta, String),
    ActivityDetails(EventMeta, u32),
    RiderPosition(EventMeta, RiderPosition),

    // Named in the `CompanionMessage` tagged union (spec.md §3) and in the
    // §4.6 dispatch tables but not in §6's alphabetical event-surface list;
    // carried as events anyway since §4.6 is explicit about emitting them
    // (see DESIGN.md for this Open Question resolution).
    ClockSync(EventMeta, u32),
    DeviceInfo(EventMeta, Vec<u8>),
    ActivityEnded(EventMeta, String),
}

/// Discriminant used to subscribe to a single event kind (spec.md §6,
/// §4.7's "per event kind" subscription channels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    OutgoingPlayerState,
    IncomingPlayerState,
    EventPositions,
    PlayerTimeSync,
    RideOnGiven,
    ChatMessage,
    MeetupUpdate,
    PlayerEnteredWorld,
    HeartBeat,
    CommandSent,
    CommandAvailable,
    PowerUpGranted,
    ActivityDetails,
    RiderPosition,
    ClockSync,
    DeviceInfo,
    ActivityEnded,
}

impl MonitorEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            MonitorEvent::OutgoingPlayerState(..) => EventKind::OutgoingPlayerState,
            MonitorEvent::IncomingPlayerState(..) => EventKind::IncomingPlayerState,
            MonitorEvent::EventPositions(..) => EventKind::EventPositions,
            MonitorEvent::PlayerTimeSync(..) => EventKind::PlayerTimeSync,
            MonitorEvent::RideOnGiven(..) => EventKind::RideOnGiven,
            MonitorEvent::ChatMessage(..) => EventKind::ChatMessage,
            MonitorEvent::MeetupUpdate(..) => EventKind::MeetupUpdate,
            MonitorEvent::PlayerEnteredWorld(..) => EventKind::PlayerEnteredWorld,
            MonitorEvent::HeartBeat(..) => EventKind::HeartBeat,
            MonitorEvent::CommandSent(..) => EventKind::CommandSent,
            MonitorEvent::CommandAvailable(..) => EventKind::CommandAvailable,
            MonitorEvent::PowerUpGranted(..) => EventKind::PowerUpGranted,
            MonitorEvent::ActivityDetails(..) => EventKind::ActivityDetails,
            MonitorEvent::RiderPosition(..) => EventKind::RiderPosition,
            MonitorEvent::ClockSync(..) => EventKind::ClockSync,
            MonitorEvent::DeviceInfo(..) => EventKind::DeviceInfo,
            MonitorEvent::ActivityEnded(..) => EventKind::ActivityEnded,
        }
    }
}

// `CompanionMessage`'s `Unknown(raw)` variant doesn't surface as an event
// (spec.md §3); unrecognised companion/game payloads go to the diagnostic
// sink instead (see `crate::diagnostics`).
