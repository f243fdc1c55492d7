//! Corpse Core — shared game model and phase plumbing.
//!
//! This crate defines the entities, the error taxonomy, the restartable
//! `PhaseTimer`, and the `ConsensusChannel` seam that the writing and reveal
//! phases are built on. Transport implementations live elsewhere.

pub mod channel;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod entities;
pub mod error;
pub mod event;
pub mod indexing;
pub mod timer;
