//! Passive, read-only decoding pipeline for the simulator's game and
//! companion-app network protocols (spec.md §1/§2).
//!
//! C1 (frame source) and C2 (demultiplexer) hand segments to C3/C4
//! (reassembly), which hand complete envelopes to C5/C6 (decoders), which
//! publish [`events::MonitorEvent`]s through C7 (the router). See
//! [`session::CaptureSession`] for the component wired end to end.

pub mod capture;
pub mod companion_decoder;
pub mod config;
pub mod demux;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod game_decoder;
pub mod reassembler;
pub mod router;
pub mod segment;
pub mod session;
pub mod udp_strip;

pub use config::{CaptureConfig, InterfaceSelector};
pub use error::{CaptureError, DecodeError, DemuxError, ReassemblyError};
pub use events::{EventKind, MonitorEvent};
pub use router::EventRouter;
pub use session::{CancellationToken, CaptureSession};
