//! Client configuration read from the environment.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use corpse_core::config::{
    BASE_ROUND_SECONDS, FIRST_ROUND_BONUS_SECONDS, SECONDS_PER_REVEAL_CHAPTER, TICK_CADENCE,
    TimingConfig,
};

use crate::error::AppError;

/// Number of simulated participants when `CORPSE_PLAYERS` is unset.
pub const DEFAULT_PLAYERS: usize = 3;

/// Settings for a local game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Phase timing.
    pub timing: TimingConfig,
    /// Number of participants.
    pub players: usize,
}

impl ClientConfig {
    /// Reads the configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable does not parse, the timing is
    /// invalid, or fewer than two players are configured.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, falling back to the
    /// defaults for absent keys.
    ///
    /// # Errors
    ///
    /// Same as [`ClientConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let default_tick_millis = u64::try_from(TICK_CADENCE.as_millis()).unwrap_or(1_000);
        let timing = TimingConfig {
            base_round_seconds: parse_or(&lookup, "CORPSE_BASE_ROUND_SECONDS", BASE_ROUND_SECONDS)?,
            first_round_bonus_seconds: parse_or(
                &lookup,
                "CORPSE_FIRST_ROUND_BONUS_SECONDS",
                FIRST_ROUND_BONUS_SECONDS,
            )?,
            seconds_per_reveal_chapter: parse_or(
                &lookup,
                "CORPSE_SECONDS_PER_CHAPTER",
                SECONDS_PER_REVEAL_CHAPTER,
            )?,
            tick: Duration::from_millis(parse_or(
                &lookup,
                "CORPSE_TICK_MILLIS",
                default_tick_millis,
            )?),
        };
        timing
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let players = parse_or(&lookup, "CORPSE_PLAYERS", DEFAULT_PLAYERS)?;
        if players < 2 {
            return Err(AppError::Config(format!(
                "CORPSE_PLAYERS must be at least 2, got {players}"
            )));
        }
        Ok(Self { timing, players })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} must be a valid number: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = ClientConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.timing, TimingConfig::default());
        assert_eq!(config.players, DEFAULT_PLAYERS);
    }

    #[test]
    fn test_overrides_are_applied() {
        // Arrange
        let lookup = lookup_from(&[
            ("CORPSE_BASE_ROUND_SECONDS", "20"),
            ("CORPSE_FIRST_ROUND_BONUS_SECONDS", "0"),
            ("CORPSE_SECONDS_PER_CHAPTER", " 5 "),
            ("CORPSE_TICK_MILLIS", "250"),
            ("CORPSE_PLAYERS", "4"),
        ]);

        // Act
        let config = ClientConfig::from_lookup(lookup).unwrap();

        // Assert
        assert_eq!(config.timing.base_round_seconds, 20);
        assert_eq!(config.timing.first_round_bonus_seconds, 0);
        assert_eq!(config.timing.seconds_per_reveal_chapter, 5);
        assert_eq!(config.timing.tick, Duration::from_millis(250));
        assert_eq!(config.players, 4);
    }

    #[test]
    fn test_unparsable_value_is_a_config_error() {
        let result = ClientConfig::from_lookup(lookup_from(&[("CORPSE_PLAYERS", "many")]));

        match result {
            Err(AppError::Config(message)) => assert!(message.contains("CORPSE_PLAYERS")),
            other => panic!("expected a config error, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_tick_is_rejected() {
        let result = ClientConfig::from_lookup(lookup_from(&[("CORPSE_TICK_MILLIS", "0")]));

        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_single_player_is_rejected() {
        let result = ClientConfig::from_lookup(lookup_from(&[("CORPSE_PLAYERS", "1")]));

        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
