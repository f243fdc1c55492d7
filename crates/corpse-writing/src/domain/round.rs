//! Round controller for the writing phase.
//!
//! The controller is a plain state machine. Timer ticks, participant actions,
//! and consensus events are applied one at a time; each transition records
//! effects that the driver publishes afterwards. Two triggers can close a
//! round, the local deadline and the remote "everyone ready" event, and only
//! the latter advances the round counter. A consensus event for a round that
//! has already been closed is rejected, so racing triggers never advance
//! twice.

use corpse_core::channel::{Intent, IntentKind};
use corpse_core::clock::Clock;
use corpse_core::config::TimingConfig;
use corpse_core::entities::{Chapter, GameState, Player, Room, Tale};
use corpse_core::error::GameError;
use corpse_core::event::{Effect, GameNotification, NotificationKind, Outbound, RoundStarted};
use corpse_core::indexing;
use corpse_core::timer::PhaseTimer;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Writing phase state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RoundPhase {
    /// The round is open for editing.
    Writing,
    /// The local deadline passed; waiting for the other participants.
    RoundEnding,
    /// Moving on to the next round.
    Advancing,
    /// Every round has been played.
    Finished,
}

/// Location of the chapter the local player edits this round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChapterRef {
    /// Index of the tale in the tale set.
    pub tale_index: usize,
    /// Identifier of that tale.
    pub tale_id: Uuid,
    /// Position of the chapter in the tale.
    pub chapter_index: usize,
    /// Identifier of the chapter.
    pub chapter_id: Uuid,
}

/// Drives one participant through the writing rounds.
#[derive(Debug)]
pub struct RoundController {
    room_id: Uuid,
    player_id: Uuid,
    player_index: usize,
    player_count: usize,
    config: TimingConfig,
    tales: Vec<Tale>,
    phase: RoundPhase,
    round_number: usize,
    editing: ChapterRef,
    last_chapter: Option<Chapter>,
    is_first_round: bool,
    ready: bool,
    round_ended: bool,
    timer: PhaseTimer,
    pending_effects: Vec<Effect>,
}

impl RoundController {
    /// Opens the first writing round for `player`.
    ///
    /// Claims the player's first chapter, starts the round timer, and records
    /// a `RoundStarted` notification.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Validation` if the timing is invalid or the player
    /// is not on the roster, and `GameError::StaleReference` if the tale set
    /// does not hold one tale of one chapter per player for every player.
    pub fn new(
        room: &Room,
        players: &[Player],
        player: &Player,
        tales: Vec<Tale>,
        config: TimingConfig,
        clock: &dyn Clock,
    ) -> Result<Self, GameError> {
        config.validate()?;
        let player_index = players
            .iter()
            .position(|p| p.id == player.id)
            .ok_or_else(|| {
                GameError::Validation(format!("player {} is not on the roster", player.id))
            })?;
        let player_count = players.len();
        indexing::validate_tale_set(&tales, player_count, player_count)?;

        let mut tales = tales;
        let editing = claim_chapter(&mut tales, player_index, 0, player_count, player.id)?;

        let mut controller = Self {
            room_id: room.id,
            player_id: player.id,
            player_index,
            player_count,
            config,
            tales,
            phase: RoundPhase::Writing,
            round_number: 0,
            editing,
            last_chapter: None,
            is_first_round: true,
            ready: false,
            round_ended: false,
            timer: PhaseTimer::new(),
            pending_effects: Vec::new(),
        };
        controller.open_round(clock);
        Ok(controller)
    }

    /// Counts one timer tick. At the deadline the round ends locally and, if
    /// the player has not signalled readiness yet, readiness is signalled on
    /// their behalf.
    pub fn on_tick(&mut self) {
        if self.phase != RoundPhase::Writing {
            return;
        }
        let Some(elapsed) = self.timer.record_tick() else {
            return;
        };
        let deadline = self.deadline();
        debug!(
            round = self.round_number,
            remaining = deadline.saturating_sub(elapsed),
            "writing tick"
        );
        if elapsed >= deadline {
            self.end_round();
        }
    }

    /// Flips the local readiness flag and returns the new value.
    ///
    /// Becoming ready records a submission of the current tale followed by
    /// the readiness intent. Once the deadline has passed, readiness can no
    /// longer be withdrawn.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Validation` after the writing phase has finished.
    pub fn toggle_ready(&mut self) -> Result<bool, GameError> {
        if matches!(self.phase, RoundPhase::Advancing | RoundPhase::Finished) {
            return Err(GameError::Validation(
                "the writing phase has finished".to_owned(),
            ));
        }
        if self.round_ended && self.ready {
            debug!(round = self.round_number, "readiness is locked after the deadline");
            return Ok(true);
        }

        let becoming_ready = !self.ready;
        if becoming_ready {
            let tale = self.current_tale()?.clone();
            self.pending_effects
                .push(Effect::Publish(Outbound::SubmitTale(tale)));
        }
        self.ready = becoming_ready;
        self.pending_effects
            .push(Effect::Publish(Outbound::PublishIntent(Intent {
                room_id: self.room_id,
                player_id: self.player_id,
                kind: IntentKind::Ready,
                step: self.round_number,
                value: becoming_ready,
            })));
        info!(round = self.round_number, ready = becoming_ready, "readiness toggled");
        Ok(becoming_ready)
    }

    /// Replaces the text of the chapter being edited.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Validation` if the round is closed or the player
    /// is ready.
    pub fn write_chapter(&mut self, text: impl Into<String>) -> Result<(), GameError> {
        self.ensure_editable()?;
        let editing = self.editing;
        self.tale_mut(editing.tale_index)?
            .chapter_mut(editing.chapter_index)?
            .text = text.into();
        Ok(())
    }

    /// Names the tale the player starts in the first round.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Validation` after the first round, or if the round
    /// is closed or the player is ready.
    pub fn set_title(&mut self, title: impl Into<String>) -> Result<(), GameError> {
        if !self.is_first_round {
            return Err(GameError::Validation(
                "only the first round names a tale".to_owned(),
            ));
        }
        self.ensure_editable()?;
        let tale_index = self.editing.tale_index;
        self.tale_mut(tale_index)?.title = title.into();
        Ok(())
    }

    /// Applies the "everyone ready" event that closes `round`.
    ///
    /// Cancels the round timer, adopts the session's tale set, and advances.
    /// A tale set that no longer matches the roster is ignored in favour of
    /// the local copy so the game keeps moving.
    ///
    /// # Errors
    ///
    /// Returns `GameError::DuplicateTransition` if `round` is not the open
    /// round (already closed, or the phase has finished). Nothing changes in
    /// that case.
    pub fn on_remote_consensus(
        &mut self,
        round: usize,
        tales: Vec<Tale>,
        clock: &dyn Clock,
    ) -> Result<(), GameError> {
        if self.phase == RoundPhase::Finished || round != self.round_number {
            return Err(GameError::DuplicateTransition {
                phase: "writing",
                current: self.round_number,
                requested: round,
            });
        }
        self.timer.stop();
        match indexing::validate_tale_set(&tales, self.player_count, self.player_count) {
            Ok(()) => self.tales = tales,
            Err(error) => warn!(%error, "keeping local tales"),
        }
        self.advance(clock)
    }

    fn advance(&mut self, clock: &dyn Clock) -> Result<(), GameError> {
        self.phase = RoundPhase::Advancing;
        self.round_number += 1;
        if self.round_number < self.player_count {
            self.editing = claim_chapter(
                &mut self.tales,
                self.player_index,
                self.round_number,
                self.player_count,
                self.player_id,
            )?;
            self.is_first_round = false;
            self.open_round(clock);
        } else {
            self.timer.stop();
            self.phase = RoundPhase::Finished;
            info!(rounds = self.round_number, "writing phase finished");
            self.notify(NotificationKind::TalesUpdated(self.tales.clone()), clock);
            self.notify(
                NotificationKind::GameStateChanged(GameState::AfterGame),
                clock,
            );
        }
        Ok(())
    }

    fn open_round(&mut self, clock: &dyn Clock) {
        let editing = self.editing;
        self.last_chapter = self
            .tales
            .get(editing.tale_index)
            .and_then(|tale| indexing::last_written_chapter(tale, editing.chapter_id))
            .cloned();
        self.ready = false;
        self.round_ended = false;
        self.timer.stop();
        self.timer.reset();
        self.timer.start(self.config.tick);
        self.phase = RoundPhase::Writing;

        let deadline = self.deadline();
        info!(
            round = self.round_number,
            tale_index = editing.tale_index,
            deadline,
            "writing round started"
        );
        self.notify(
            NotificationKind::RoundStarted(RoundStarted {
                round: self.round_number,
                tale_id: editing.tale_id,
                chapter_id: editing.chapter_id,
                deadline,
                last_chapter: self.last_chapter.clone(),
            }),
            clock,
        );
    }

    fn end_round(&mut self) {
        self.timer.stop();
        self.round_ended = true;
        self.phase = RoundPhase::RoundEnding;
        info!(round = self.round_number, "writing deadline reached");
        if !self.ready {
            if let Err(error) = self.toggle_ready() {
                warn!(%error, "could not signal readiness at the deadline");
            }
        }
    }

    fn ensure_editable(&self) -> Result<(), GameError> {
        if self.phase != RoundPhase::Writing || self.ready {
            return Err(GameError::Validation(
                "the chapter is locked for this round".to_owned(),
            ));
        }
        Ok(())
    }

    fn tale_mut(&mut self, index: usize) -> Result<&mut Tale, GameError> {
        let len = self.tales.len();
        self.tales.get_mut(index).ok_or(GameError::OutOfRange {
            what: "tale",
            index,
            len,
        })
    }

    fn notify(&mut self, kind: NotificationKind, clock: &dyn Clock) {
        self.pending_effects.push(Effect::Notify(GameNotification::new(
            self.room_id,
            self.player_id,
            kind,
            clock,
        )));
    }

    /// The tale the player is continuing this round.
    ///
    /// # Errors
    ///
    /// Returns `GameError::OutOfRange` if the editing reference no longer
    /// points into the tale set.
    pub fn current_tale(&self) -> Result<&Tale, GameError> {
        let len = self.tales.len();
        let index = self.editing.tale_index;
        self.tales.get(index).ok_or(GameError::OutOfRange {
            what: "tale",
            index,
            len,
        })
    }

    /// The chapter being edited.
    ///
    /// # Errors
    ///
    /// Returns `GameError::OutOfRange` if the editing reference no longer
    /// points into the tale set.
    pub fn editing_chapter(&self) -> Result<&Chapter, GameError> {
        self.current_tale()?.chapter(self.editing.chapter_index)
    }

    /// Where the chapter being edited lives.
    #[must_use]
    pub fn editing_ref(&self) -> ChapterRef {
        self.editing
    }

    /// The previous written chapter of the current tale, if any.
    #[must_use]
    pub fn last_chapter(&self) -> Option<&Chapter> {
        self.last_chapter.as_ref()
    }

    /// Current state machine phase.
    #[must_use]
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Returns `true` once every round has been played.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.phase == RoundPhase::Finished
    }

    /// Zero-based number of the open round; equals the player count once
    /// finished.
    #[must_use]
    pub fn round_number(&self) -> usize {
        self.round_number
    }

    /// Number of rounds in the game.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.player_count
    }

    /// Returns `true` during the first round.
    #[must_use]
    pub fn is_first_round(&self) -> bool {
        self.is_first_round
    }

    /// Local readiness flag.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Returns `true` once the local deadline has passed.
    #[must_use]
    pub fn round_ended(&self) -> bool {
        self.round_ended
    }

    /// Writing deadline of the open round, in ticks.
    #[must_use]
    pub fn deadline(&self) -> u32 {
        self.config.round_deadline(self.is_first_round)
    }

    /// Ticks left before the deadline.
    #[must_use]
    pub fn remaining_ticks(&self) -> u32 {
        self.timer.remaining(self.deadline())
    }

    /// The round timer.
    #[must_use]
    pub fn timer(&self) -> &PhaseTimer {
        &self.timer
    }

    pub(crate) fn timer_mut(&mut self) -> &mut PhaseTimer {
        &mut self.timer
    }

    /// The local tale set.
    #[must_use]
    pub fn tales(&self) -> &[Tale] {
        &self.tales
    }

    /// Consumes the controller and returns its tale set.
    #[must_use]
    pub fn into_tales(self) -> Vec<Tale> {
        self.tales
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

/// Claims the chapter `player_index` edits in `round` and returns where it
/// lives.
fn claim_chapter(
    tales: &mut [Tale],
    player_index: usize,
    round: usize,
    player_count: usize,
    player_id: Uuid,
) -> Result<ChapterRef, GameError> {
    let tale_index = indexing::tale_index_for(player_index, round, player_count)?;
    let len = tales.len();
    let tale = tales.get_mut(tale_index).ok_or(GameError::OutOfRange {
        what: "tale",
        index: tale_index,
        len,
    })?;
    let tale_id = tale.id;
    let chapter = tale.chapter_mut(round)?;
    if !chapter.assign_author(player_id) {
        warn!(chapter_id = %chapter.id, "chapter already belongs to another author");
    }
    Ok(ChapterRef {
        tale_index,
        tale_id,
        chapter_index: round,
        chapter_id: chapter.id,
    })
}
