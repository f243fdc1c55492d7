//! Shared helpers for end-to-end game tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use corpse_client::hub::LocalHub;
use corpse_client::session::{GameSession, SessionHandle, session_channels};
use corpse_core::config::TimingConfig;
use corpse_core::entities::{Player, Room, Tale};
use corpse_core::error::GameError;
use corpse_core::event::GameNotification;
use corpse_test_support::{fixed_clock, roster, room};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Short deadlines: 5 ticks for the first round, 3 afterwards, 2 per
/// revealed chapter, one tick per second.
pub fn fast_timing() -> TimingConfig {
    TimingConfig {
        base_round_seconds: 3,
        first_round_bonus_seconds: 2,
        seconds_per_reveal_chapter: 2,
        tick: Duration::from_secs(1),
    }
}

/// A room, its roster, the initial tales, and the hub they share.
pub struct LocalGame {
    pub room: Room,
    pub players: Vec<Player>,
    pub tales: Vec<Tale>,
    pub hub: Arc<LocalHub>,
}

/// Sets up a game for `count` players.
pub fn local_game(count: usize) -> LocalGame {
    let room = room();
    let players = roster(count);
    let tales = Tale::blank_set(count);
    let hub = Arc::new(LocalHub::new(&room, &players, tales.clone()));
    LocalGame {
        room,
        players,
        tales,
        hub,
    }
}

/// A participant whose session runs on a spawned task.
pub struct Participant {
    pub player: Player,
    pub handle: SessionHandle,
    pub notifications: mpsc::UnboundedReceiver<GameNotification>,
    pub session: JoinHandle<Result<Vec<Tale>, GameError>>,
}

/// Spawns `player`'s session in `game`.
pub fn join(game: &LocalGame, player: &Player) -> Participant {
    let session = GameSession::new(
        game.room.clone(),
        game.players.clone(),
        player.clone(),
        fast_timing(),
        game.hub.clone(),
        Arc::new(fixed_clock()),
    );
    let (handle, inbox) = session_channels();
    let (notify_tx, notifications) = mpsc::unbounded_channel();
    Participant {
        player: player.clone(),
        handle,
        notifications,
        session: tokio::spawn(session.run(game.tales.clone(), inbox, notify_tx)),
    }
}

/// Everything received so far.
pub fn drain(receiver: &mut mpsc::UnboundedReceiver<GameNotification>) -> Vec<GameNotification> {
    let mut received = Vec::new();
    while let Ok(notification) = receiver.try_recv() {
        received.push(notification);
    }
    received
}
