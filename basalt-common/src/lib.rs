//! # Basalt Common Library
//!
//! Shared code for the basalt playback node:
//! - Track metadata and the opaque track codec
//! - Control-protocol types (partial updates, snapshots)
//! - Filter chain specifications
//! - Session event types
//! - Utility functions

pub mod events;
pub mod filters;
pub mod protocol;
pub mod time;
pub mod track;

pub use protocol::Omissible;
pub use track::{decode_track, encode_track, TrackInfo};
