//! Restartable countdown shared by the writing and reveal controllers.
//!
//! A `PhaseTimer` splits into two halves. The counting half (`start`,
//! `stop`, `reset`, `record_tick`) is plain state and never touches the
//! runtime, so controllers can be driven tick by tick in tests. The waiting
//! half (`wait_tick`) owns a `tokio::time::Interval` that only exists while
//! the timer is running; stopping drops it, so no tick can be observed after
//! `stop` returns.

use std::future;
use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::config::TICK_CADENCE;

/// Countdown owned by exactly one controller.
#[derive(Debug)]
pub struct PhaseTimer {
    cadence: Duration,
    elapsed_ticks: u32,
    running: bool,
    activations: u64,
    interval: Option<Interval>,
}

impl Default for PhaseTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTimer {
    /// Creates a stopped timer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cadence: TICK_CADENCE,
            elapsed_ticks: 0,
            running: false,
            activations: 0,
            interval: None,
        }
    }

    /// Starts a new activation ticking every `cadence`.
    ///
    /// Any previous activation is discarded first. The cadence must be
    /// non-zero (see `TimingConfig::validate`).
    pub fn start(&mut self, cadence: Duration) {
        self.interval = None;
        self.cadence = cadence;
        self.running = true;
        self.activations += 1;
    }

    /// Stops the timer. Stopping a stopped timer is a no-op.
    pub fn stop(&mut self) {
        self.running = false;
        self.interval = None;
    }

    /// Zeroes the elapsed count without stopping.
    pub fn reset(&mut self) {
        self.elapsed_ticks = 0;
    }

    /// Returns `true` between `start` and `stop`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ticks counted since the last reset.
    #[must_use]
    pub fn elapsed_ticks(&self) -> u32 {
        self.elapsed_ticks
    }

    /// Number of times the timer has been started.
    #[must_use]
    pub fn activations(&self) -> u64 {
        self.activations
    }

    /// Ticks left until `deadline`, saturating at zero.
    #[must_use]
    pub fn remaining(&self, deadline: u32) -> u32 {
        deadline.saturating_sub(self.elapsed_ticks)
    }

    /// Counts one tick and returns the new elapsed total.
    ///
    /// Returns `None` when the timer is stopped, so a tick that raced with
    /// `stop` is discarded.
    pub fn record_tick(&mut self) -> Option<u32> {
        if !self.running {
            return None;
        }
        self.elapsed_ticks = self.elapsed_ticks.saturating_add(1);
        Some(self.elapsed_ticks)
    }

    /// Waits for the next tick of the current activation.
    ///
    /// Never completes while the timer is stopped. The first tick of an
    /// activation arrives one cadence after the first call.
    pub async fn wait_tick(&mut self) {
        if !self.running {
            return future::pending::<()>().await;
        }
        let cadence = self.cadence;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = time::interval_at(Instant::now() + cadence, cadence);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        interval.tick().await;
    }
}
