//! Corpse — tale reveal bounded context.
//!
//! Finished tales are read one at a time. Chapters unlock on a schedule
//! proportional to the tale's length, and a unanimous skip vote moves on to
//! the next tale early. Reading the last tale ends the game.

pub mod application;
pub mod domain;
