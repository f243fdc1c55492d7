//! Clock abstraction used to stamp game notifications.

use chrono::{DateTime, Utc};

/// Source of wall-clock time for notification metadata.
///
/// Phase deadlines are counted in timer ticks, never in wall-clock time, so
/// a clock only affects the `occurred_at` stamp of outgoing notifications.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
