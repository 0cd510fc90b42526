//! Typed errors at each pipeline boundary (spec.md §7).

use thiserror::Error;

/// Fatal session errors (spec.md §7): terminate the session, surfaced to
/// the caller of [`crate::session::CaptureSession::run`].
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no interface matching {0:?} was found")]
    NoSuchInterface(String),
    #[error("insufficient privilege to open a live capture")]
    InsufficientPrivilege,
    #[error("capture file not found: {0}")]
    CaptureFileNotFound(std::path::PathBuf),
    #[error("malformed capture file")]
    MalformedCaptureFile,
    #[error(transparent)]
    Pcap(#[from] pcap::Error),
}

/// Recoverable per-segment/datagram parse failure at L3/L4 (spec.md §7
/// "Recoverable frame errors"). Never fatal; always logged and dropped by
/// the caller.
#[derive(Debug, Error)]
pub enum DemuxError {
    #[error("failed to parse link-layer/IP headers: {0}")]
    HeaderParse(String),
    #[error("frame carries neither TCP nor UDP payload")]
    NotTransport,
}

/// Lane corruption (spec.md §7 "Lane corruption"). Always recoverable by
/// resetting the lane; callers never propagate this past the reassembler.
#[derive(Debug, Error)]
pub enum ReassemblyError {
    #[error("declared frame length {declared} exceeds maximum {max}")]
    OversizeLength { declared: usize, max: usize },
}

/// A single sub-record or outer envelope failed to decode (spec.md §7
/// "Decode errors").
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to decode outer envelope: {0}")]
    Envelope(#[from] prost::DecodeError),
    #[error("failed to decode sub-record (tag {tag}): {source}")]
    SubRecord {
        tag: i32,
        #[source]
        source: prost::DecodeError,
    },
    #[error("payload too short to contain a valid envelope ({0} bytes)")]
    TooShort(usize),
}
