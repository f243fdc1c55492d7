//! Corpse demo: a configured number of scripted participants share one
//! in-process hub and play a full game.

use std::sync::Arc;

use corpse_client::autoplay::autoplay;
use corpse_client::config::ClientConfig;
use corpse_client::error::AppError;
use corpse_client::hub::LocalHub;
use corpse_client::session::{GameSession, session_channels};
use corpse_client::telemetry;
use corpse_core::clock::{Clock, SystemClock};
use corpse_core::entities::{Player, Room, Tale};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    telemetry::init();

    let config = ClientConfig::from_env()?;
    tracing::info!(players = config.players, timing = ?config.timing, "starting Corpse demo");

    let room = Room::new("demo");
    let players: Vec<Player> = (1..=config.players)
        .map(|n| Player::new(format!("Player {n}")))
        .collect();
    let tales = Tale::blank_set(players.len());
    let hub = Arc::new(LocalHub::new(&room, &players, tales.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let mut sessions = JoinSet::new();
    let mut bots = JoinSet::new();
    for player in &players {
        let session = GameSession::new(
            room.clone(),
            players.clone(),
            player.clone(),
            config.timing,
            hub.clone(),
            Arc::clone(&clock),
        );
        let (handle, inbox) = session_channels();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        sessions.spawn(session.run(tales.clone(), inbox, notify_tx));
        bots.spawn(autoplay(player.clone(), handle, notify_rx));
    }

    let mut finished = None;
    while let Some(joined) = sessions.join_next().await {
        finished = Some(joined??);
    }
    while let Some(joined) = bots.join_next().await {
        let written = joined??;
        tracing::info!(written, "participant done");
    }

    for tale in finished.unwrap_or_default() {
        let text: Vec<&str> = tale.chapters.iter().map(|c| c.text.as_str()).collect();
        tracing::info!(title = %tale.title, text = %text.join(" "), "finished tale");
    }
    tracing::info!(rounds = hub.rounds_closed(), reveals = hub.tales_closed(), "game over");
    Ok(())
}
