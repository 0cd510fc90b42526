//! Generated types for the two wire protocols the monitor decodes.
//!
//! Everything in here is produced by `prost-build` from the `.proto` files
//! under `proto/`; this crate owns the schema only, never decoding policy.

pub mod game {
    include!(concat!(env!("OUT_DIR"), "/zwift.game.rs"));
}

pub mod companion {
    include!(concat!(env!("OUT_DIR"), "/zwift.companion.rs"));
}
