//! Corpse — local game client.
//!
//! Wires the writing and reveal drivers into one game session per local
//! participant, and provides an in-process consensus hub so several
//! participants can share a game inside one process.

pub mod autoplay;
pub mod config;
pub mod error;
pub mod hub;
pub mod session;
pub mod telemetry;
