//! # Basalt Playback Node (basalt-node)
//!
//! Audio-playback orchestration node: a REST control plane over per-guild
//! player state machines, with session-scoped event streams.
//!
//! **Purpose:** accept partial player updates from remote clients, reconcile
//! voice-backend connectivity, resolve tracks through pluggable source
//! providers, and report consistent per-guild playback state.
//!
//! **Architecture:** one sequential actor task per guild player (strict
//! per-guild ordering, full cross-guild parallelism) behind an axum HTTP/SSE
//! control interface.

pub mod api;
pub mod config;
pub mod error;
pub mod filters;
pub mod player;
pub mod resolver;
pub mod session;
pub mod voice;

pub use error::{Error, Result};
