//! One participant's game: the writing phase followed by the reveal phase.

use std::sync::Arc;

use corpse_core::channel::ConsensusChannel;
use corpse_core::clock::Clock;
use corpse_core::config::TimingConfig;
use corpse_core::entities::{GameState, Player, Room, Tale};
use corpse_core::error::GameError;
use corpse_core::event::{GameNotification, NotificationKind};
use corpse_reveal::application::driver::{
    self as reveal_driver, RevealCommand, RevealDriver, RevealHandle,
};
use corpse_reveal::domain::reveal::RevealController;
use corpse_writing::application::driver::{
    self as writing_driver, WritingCommand, WritingDriver, WritingHandle,
};
use corpse_writing::domain::round::RoundController;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Command handles for both phases of a session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    /// Commands for the writing phase.
    pub writing: WritingHandle,
    /// Commands for the reveal phase.
    pub reveal: RevealHandle,
}

/// Command receivers consumed by `GameSession::run`.
#[derive(Debug)]
pub struct SessionInbox {
    writing: mpsc::UnboundedReceiver<WritingCommand>,
    reveal: mpsc::UnboundedReceiver<RevealCommand>,
}

/// Creates the command handles for a session and the inbox it consumes.
#[must_use]
pub fn session_channels() -> (SessionHandle, SessionInbox) {
    let (writing, writing_rx) = writing_driver::command_channel();
    let (reveal, reveal_rx) = reveal_driver::command_channel();
    (
        SessionHandle { writing, reveal },
        SessionInbox {
            writing: writing_rx,
            reveal: reveal_rx,
        },
    )
}

/// A local participant's view of a shared game.
pub struct GameSession {
    room: Room,
    players: Vec<Player>,
    player: Player,
    timing: TimingConfig,
    channel: Arc<dyn ConsensusChannel>,
    clock: Arc<dyn Clock>,
}

impl GameSession {
    /// Creates a session for `player` in `room`.
    #[must_use]
    pub fn new(
        room: Room,
        players: Vec<Player>,
        player: Player,
        timing: TimingConfig,
        channel: Arc<dyn ConsensusChannel>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            room,
            players,
            player,
            timing,
            channel,
            clock,
        }
    }

    /// Plays the whole game on `tales` and returns the finished tale set.
    ///
    /// Emits `GameStateChanged(Writing)` first; the drivers emit `AfterGame`
    /// and `GameEnded` as their phases finish.
    ///
    /// # Errors
    ///
    /// Returns the first `GameError` raised while setting up or driving a
    /// phase.
    pub async fn run(
        self,
        tales: Vec<Tale>,
        inbox: SessionInbox,
        notifications: mpsc::UnboundedSender<GameNotification>,
    ) -> Result<Vec<Tale>, GameError> {
        info!(player = %self.player.name, "game session started");
        let writing = GameNotification::new(
            self.room.id,
            self.player.id,
            NotificationKind::GameStateChanged(GameState::Writing),
            self.clock.as_ref(),
        );
        if notifications.send(writing).is_err() {
            debug!("notification receiver dropped");
        }

        let rounds = RoundController::new(
            &self.room,
            &self.players,
            &self.player,
            tales,
            self.timing,
            self.clock.as_ref(),
        )?;
        let tales = WritingDriver::new(
            rounds,
            Arc::clone(&self.channel),
            Arc::clone(&self.clock),
            inbox.writing,
            notifications.clone(),
        )
        .run()
        .await?;

        let reveal = RevealController::new(
            &self.room,
            &self.players,
            &self.player,
            tales.clone(),
            self.timing,
            self.clock.as_ref(),
        )?;
        RevealDriver::new(
            reveal,
            self.channel,
            self.clock,
            inbox.reveal,
            notifications,
        )
        .run()
        .await?;

        info!(player = %self.player.name, "game session finished");
        Ok(tales)
    }
}
