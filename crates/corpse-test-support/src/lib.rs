//! Shared test doubles and fixtures for Corpse.

mod channel;
mod clock;
mod fixtures;

pub use channel::{ChannelCall, FailingChannel, RecordingChannel};
pub use clock::{FixedClock, fixed_clock};
pub use fixtures::{roster, room, written_tales};
