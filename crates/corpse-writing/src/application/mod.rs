//! Async orchestration of the writing phase.

pub mod driver;
pub mod query_handlers;
