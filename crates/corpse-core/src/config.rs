//! Timing configuration for both game phases.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Default writing time per round, in ticks.
pub const BASE_ROUND_SECONDS: u32 = 30;

/// Extra writing time granted in the first round, in ticks.
pub const FIRST_ROUND_BONUS_SECONDS: u32 = 10;

/// Default reveal time per chapter, in ticks.
pub const SECONDS_PER_REVEAL_CHAPTER: u32 = 15;

/// Default tick cadence.
pub const TICK_CADENCE: Duration = Duration::from_secs(1);

/// Phase timing constants.
///
/// All deadlines are counted in timer ticks; with the default one-second
/// cadence a tick is a second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Writing time per round.
    pub base_round_seconds: u32,
    /// Extra writing time in the first round.
    pub first_round_bonus_seconds: u32,
    /// Reveal time per chapter.
    pub seconds_per_reveal_chapter: u32,
    /// Interval between ticks.
    pub tick: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            base_round_seconds: BASE_ROUND_SECONDS,
            first_round_bonus_seconds: FIRST_ROUND_BONUS_SECONDS,
            seconds_per_reveal_chapter: SECONDS_PER_REVEAL_CHAPTER,
            tick: TICK_CADENCE,
        }
    }
}

impl TimingConfig {
    /// Checks that every deadline is reachable.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Validation` if the tick cadence, the round time,
    /// or the per-chapter reveal time is zero.
    pub fn validate(&self) -> Result<(), GameError> {
        if self.tick.is_zero() {
            return Err(GameError::Validation(
                "tick cadence must be non-zero".to_owned(),
            ));
        }
        if self.base_round_seconds == 0 {
            return Err(GameError::Validation(
                "round time must be at least one tick".to_owned(),
            ));
        }
        if self.seconds_per_reveal_chapter == 0 {
            return Err(GameError::Validation(
                "chapter reveal time must be at least one tick".to_owned(),
            ));
        }
        Ok(())
    }

    /// Writing deadline for a round, in ticks.
    #[must_use]
    pub fn round_deadline(&self, is_first_round: bool) -> u32 {
        if is_first_round {
            self.base_round_seconds
                .saturating_add(self.first_round_bonus_seconds)
        } else {
            self.base_round_seconds
        }
    }

    /// Total reading time for a tale of `chapter_count` chapters, in ticks.
    #[must_use]
    pub fn reveal_duration(&self, chapter_count: usize) -> u32 {
        u32::try_from(chapter_count)
            .unwrap_or(u32::MAX)
            .saturating_mul(self.seconds_per_reveal_chapter)
    }
}
