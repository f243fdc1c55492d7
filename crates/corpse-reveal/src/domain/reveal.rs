//! Reveal controller for the reading phase.
//!
//! Chapters of the current tale unlock one every `seconds_per_reveal_chapter`
//! ticks. When the full reading time has passed the local participant votes
//! to skip automatically; the tale only advances once the "everyone voted"
//! event for it arrives.

use corpse_core::channel::{Intent, IntentKind};
use corpse_core::clock::Clock;
use corpse_core::config::TimingConfig;
use corpse_core::entities::{Chapter, GameState, Player, Room, Tale};
use corpse_core::error::GameError;
use corpse_core::event::{
    ChapterRevealed, Effect, GameNotification, NotificationKind, Outbound, TaleRevealStarted,
};
use corpse_core::indexing;
use corpse_core::timer::PhaseTimer;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Reveal phase state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RevealPhase {
    /// Chapters are being unlocked.
    Revealing,
    /// The local participant has voted to skip.
    SkipPending,
    /// Moving on to the next tale.
    TaleAdvancing,
    /// Every tale has been read.
    Finished,
}

/// Drives one participant through the reading of every tale.
#[derive(Debug)]
pub struct RevealController {
    room_id: Uuid,
    player_id: Uuid,
    players: Vec<Player>,
    tales: Vec<Tale>,
    config: TimingConfig,
    phase: RevealPhase,
    tale_number: usize,
    last_revealed_chapter: usize,
    skip_voted: bool,
    reading_ended: bool,
    timer: PhaseTimer,
    pending_effects: Vec<Effect>,
}

impl RevealController {
    /// Starts revealing the first tale with its first chapter visible.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Validation` if the timing is invalid, the player is
    /// not on the roster, there are no tales, or a tale has no chapters.
    pub fn new(
        room: &Room,
        players: &[Player],
        player: &Player,
        tales: Vec<Tale>,
        config: TimingConfig,
        clock: &dyn Clock,
    ) -> Result<Self, GameError> {
        config.validate()?;
        if !players.iter().any(|p| p.id == player.id) {
            return Err(GameError::Validation(format!(
                "player {} is not on the roster",
                player.id
            )));
        }
        if tales.is_empty() {
            return Err(GameError::Validation("there are no tales to reveal".to_owned()));
        }
        if let Some(tale) = tales.iter().find(|tale| tale.chapters.is_empty()) {
            return Err(GameError::Validation(format!(
                "tale {} has no chapters",
                tale.id
            )));
        }

        let mut controller = Self {
            room_id: room.id,
            player_id: player.id,
            players: players.to_vec(),
            tales,
            config,
            phase: RevealPhase::Revealing,
            tale_number: 0,
            last_revealed_chapter: 0,
            skip_voted: false,
            reading_ended: false,
            timer: PhaseTimer::new(),
            pending_effects: Vec::new(),
        };
        controller.begin_tale(clock)?;
        Ok(controller)
    }

    /// Counts one timer tick, unlocking the next chapter when its time has
    /// come. Once the full reading time has passed the timer stops and a skip
    /// vote is cast if the participant has not voted yet.
    pub fn on_tick(&mut self, clock: &dyn Clock) {
        if !matches!(self.phase, RevealPhase::Revealing | RevealPhase::SkipPending) {
            return;
        }
        let Some(elapsed) = self.timer.record_tick() else {
            return;
        };
        let Some(tale) = self.tales.get(self.tale_number) else {
            return;
        };
        let tale_id = tale.id;
        let chapter_count = tale.chapters.len();

        let index =
            indexing::revealed_chapter_index(elapsed, self.config.seconds_per_reveal_chapter);
        debug!(tale = self.tale_number, elapsed, index, "reveal tick");
        if index > self.last_revealed_chapter && index < chapter_count {
            self.last_revealed_chapter = index;
            if let Some(chapter) = tale.chapters.get(index).cloned() {
                info!(tale = self.tale_number, chapter = index, "chapter revealed");
                self.notify(
                    NotificationKind::ChapterRevealed(ChapterRevealed {
                        tale_id,
                        chapter_index: index,
                        chapter,
                    }),
                    clock,
                );
            }
        }

        if elapsed >= self.config.reveal_duration(chapter_count) {
            self.end_reading();
        }
    }

    /// Flips the local skip vote and returns the new value.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Validation` after every tale has been read.
    pub fn toggle_skip(&mut self) -> Result<bool, GameError> {
        if matches!(self.phase, RevealPhase::TaleAdvancing | RevealPhase::Finished) {
            return Err(GameError::Validation(
                "the reveal phase has finished".to_owned(),
            ));
        }
        self.skip_voted = !self.skip_voted;
        self.phase = if self.skip_voted {
            RevealPhase::SkipPending
        } else {
            RevealPhase::Revealing
        };
        self.pending_effects
            .push(Effect::Publish(Outbound::PublishIntent(Intent {
                room_id: self.room_id,
                player_id: self.player_id,
                kind: IntentKind::SkipVote,
                step: self.tale_number,
                value: self.skip_voted,
            })));
        info!(tale = self.tale_number, voted = self.skip_voted, "skip vote toggled");
        Ok(self.skip_voted)
    }

    /// Applies the "everyone voted" event that closes tale number `tale`.
    ///
    /// # Errors
    ///
    /// Returns `GameError::DuplicateTransition` if `tale` is not the tale
    /// being revealed. Nothing changes in that case.
    pub fn on_everyone_voted(&mut self, tale: usize, clock: &dyn Clock) -> Result<(), GameError> {
        if self.phase == RevealPhase::Finished || tale != self.tale_number {
            return Err(GameError::DuplicateTransition {
                phase: "reveal",
                current: self.tale_number,
                requested: tale,
            });
        }
        self.timer.stop();
        self.advance_tale(clock)
    }

    fn advance_tale(&mut self, clock: &dyn Clock) -> Result<(), GameError> {
        self.phase = RevealPhase::TaleAdvancing;
        self.tale_number += 1;
        if self.tale_number < self.tales.len() {
            self.begin_tale(clock)
        } else {
            self.timer.stop();
            self.phase = RevealPhase::Finished;
            info!(tales = self.tale_number, "reveal phase finished");
            self.notify(
                NotificationKind::GameStateChanged(GameState::GameEnded),
                clock,
            );
            Ok(())
        }
    }

    fn begin_tale(&mut self, clock: &dyn Clock) -> Result<(), GameError> {
        let tale_number = self.tale_number;
        let tale = self.tales.get(tale_number).ok_or(GameError::OutOfRange {
            what: "tale",
            index: tale_number,
            len: self.tales.len(),
        })?;
        let started = TaleRevealStarted {
            tale_number,
            tale_id: tale.id,
            title: tale.title.clone(),
            first_chapter: tale.chapter(0)?.clone(),
        };

        self.last_revealed_chapter = 0;
        self.skip_voted = false;
        self.reading_ended = false;
        self.timer.stop();
        self.timer.reset();
        self.timer.start(self.config.tick);
        self.phase = RevealPhase::Revealing;
        info!(
            tale = tale_number,
            duration = self.reveal_duration(),
            "tale reveal started"
        );
        self.notify(NotificationKind::TaleRevealStarted(started), clock);
        Ok(())
    }

    fn end_reading(&mut self) {
        self.timer.stop();
        self.reading_ended = true;
        info!(tale = self.tale_number, "reading time over");
        if !self.skip_voted {
            if let Err(error) = self.toggle_skip() {
                warn!(%error, "could not cast skip vote after reading");
            }
        }
    }

    fn notify(&mut self, kind: NotificationKind, clock: &dyn Clock) {
        self.pending_effects.push(Effect::Notify(GameNotification::new(
            self.room_id,
            self.player_id,
            kind,
            clock,
        )));
    }

    /// The tale being revealed, or `None` once finished.
    #[must_use]
    pub fn current_tale(&self) -> Option<&Tale> {
        self.tales.get(self.tale_number)
    }

    /// The revealed prefix of the current tale.
    #[must_use]
    pub fn visible_chapters(&self) -> &[Chapter] {
        match self.current_tale() {
            Some(tale) => tale
                .chapters
                .get(..=self.last_revealed_chapter)
                .unwrap_or(&tale.chapters),
            None => &[],
        }
    }

    /// Display name of the chapter's author, if assigned and on the roster.
    #[must_use]
    pub fn author_name(&self, chapter: &Chapter) -> Option<&str> {
        let author_id = chapter.author_id?;
        self.players
            .iter()
            .find(|player| player.id == author_id)
            .map(|player| player.name.as_str())
    }

    /// Current state machine phase.
    #[must_use]
    pub fn phase(&self) -> RevealPhase {
        self.phase
    }

    /// Returns `true` once every tale has been read.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == RevealPhase::Finished
    }

    /// Zero-based number of the tale being revealed; equals the tale count
    /// once finished.
    #[must_use]
    pub fn tale_number(&self) -> usize {
        self.tale_number
    }

    /// Number of tales to reveal.
    #[must_use]
    pub fn tale_count(&self) -> usize {
        self.tales.len()
    }

    /// Index of the last chapter made visible in the current tale.
    #[must_use]
    pub fn last_revealed_chapter(&self) -> usize {
        self.last_revealed_chapter
    }

    /// Local skip vote.
    #[must_use]
    pub fn skip_voted(&self) -> bool {
        self.skip_voted
    }

    /// Returns `true` once the current tale's reading time has passed.
    #[must_use]
    pub fn reading_ended(&self) -> bool {
        self.reading_ended
    }

    /// Full reading time of the current tale, in ticks.
    #[must_use]
    pub fn reveal_duration(&self) -> u32 {
        self.current_tale().map_or(0, |tale| {
            self.config.reveal_duration(tale.chapters.len())
        })
    }

    /// Ticks left of the current tale's reading time.
    #[must_use]
    pub fn remaining_ticks(&self) -> u32 {
        self.timer.remaining(self.reveal_duration())
    }

    /// The reveal timer.
    #[must_use]
    pub fn timer(&self) -> &PhaseTimer {
        &self.timer
    }

    pub(crate) fn timer_mut(&mut self) -> &mut PhaseTimer {
        &mut self.timer
    }

    /// Effects recorded since the last drain.
    #[must_use]
    pub fn pending_effects(&self) -> &[Effect] {
        &self.pending_effects
    }

    /// Drains the recorded effects.
    pub fn take_pending_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.pending_effects)
    }
}
