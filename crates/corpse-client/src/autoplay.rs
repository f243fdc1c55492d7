//! Scripted participant for the demo binary.
//!
//! Follows a session's notifications: writes a chapter (and a title in the
//! first round) as soon as a round opens, then signals readiness. Reveals
//! are left to run on their timer.

use corpse_core::entities::{GameState, Player};
use corpse_core::error::GameError;
use corpse_core::event::{GameNotification, NotificationKind};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::session::SessionHandle;

/// Plays `player`'s turns until the game ends and returns how many chapters
/// were written.
///
/// A rejected action (for example a chapter sent after the deadline) is
/// logged and the bot carries on.
///
/// # Errors
///
/// Returns `GameError::Channel` if the notification stream closes before the
/// game has ended.
pub async fn autoplay(
    player: Player,
    handle: SessionHandle,
    mut notifications: mpsc::UnboundedReceiver<GameNotification>,
) -> Result<usize, GameError> {
    let mut written = 0;
    while let Some(notification) = notifications.recv().await {
        info!(
            player = %player.name,
            notification_type = notification.notification_type(),
            payload = %notification.to_payload(),
            "game progress"
        );
        match notification.kind {
            NotificationKind::RoundStarted(started) => {
                if started.round == 0 {
                    let title = format!("{}'s tale", player.name);
                    if let Err(error) = handle.writing.set_title(title).await {
                        warn!(%error, player = %player.name, "title rejected");
                    }
                }
                let text = match &started.last_chapter {
                    Some(previous) => format!(
                        "{} continues where \"{}\" left off.",
                        player.name, previous.text
                    ),
                    None => format!("{} begins a story.", player.name),
                };
                match handle.writing.write_chapter(text).await {
                    Ok(()) => written += 1,
                    Err(error) => warn!(%error, player = %player.name, "chapter rejected"),
                }
                if let Err(error) = handle.writing.toggle_ready().await {
                    warn!(%error, player = %player.name, "readiness rejected");
                }
            }
            NotificationKind::GameStateChanged(GameState::GameEnded) => return Ok(written),
            _ => {}
        }
    }
    Err(GameError::Channel(
        "notification stream closed before the game ended".to_owned(),
    ))
}
