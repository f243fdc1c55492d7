//! Corpse — writing rounds bounded context.
//!
//! Each player edits one chapter per round under a deadline. A round closes
//! when every participant is ready, either by choice or because their timer
//! ran out; the last round hands the finished tales to the reveal phase.

pub mod application;
pub mod domain;
