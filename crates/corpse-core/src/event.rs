//! Controller effects and the notifications they raise.
//!
//! Controllers never perform I/O themselves. Each transition records
//! `Effect`s, which the phase driver drains: `Publish` effects go out over
//! the consensus channel, `Notify` effects go to the surrounding application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::channel::Intent;
use crate::clock::Clock;
use crate::entities::{Chapter, GameState, Tale};

/// Notification type identifier for `NotificationKind::TalesUpdated`.
pub const TALES_UPDATED_NOTIFICATION_TYPE: &str = "game.tales_updated";

/// Notification type identifier for `NotificationKind::GameStateChanged`.
pub const GAME_STATE_CHANGED_NOTIFICATION_TYPE: &str = "game.state_changed";

/// Notification type identifier for `NotificationKind::RoundStarted`.
pub const ROUND_STARTED_NOTIFICATION_TYPE: &str = "writing.round_started";

/// Notification type identifier for `NotificationKind::TaleRevealStarted`.
pub const TALE_REVEAL_STARTED_NOTIFICATION_TYPE: &str = "reveal.tale_started";

/// Notification type identifier for `NotificationKind::ChapterRevealed`.
pub const CHAPTER_REVEALED_NOTIFICATION_TYPE: &str = "reveal.chapter_revealed";

/// A writing round has opened for the local player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundStarted {
    /// Zero-based round number.
    pub round: usize,
    /// The tale being continued.
    pub tale_id: Uuid,
    /// The chapter the local player edits.
    pub chapter_id: Uuid,
    /// Writing deadline in ticks.
    pub deadline: u32,
    /// The previous written chapter of the tale, if any.
    pub last_chapter: Option<Chapter>,
}

/// A tale's reveal has begun with its first chapter visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaleRevealStarted {
    /// Zero-based position of the tale in the reading order.
    pub tale_number: usize,
    /// The tale identifier.
    pub tale_id: Uuid,
    /// The tale title.
    pub title: String,
    /// The first chapter, visible immediately.
    pub first_chapter: Chapter,
}

/// Another chapter of the current tale became visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRevealed {
    /// The tale identifier.
    pub tale_id: Uuid,
    /// Position of the chapter within the tale.
    pub chapter_index: usize,
    /// The revealed chapter.
    pub chapter: Chapter,
}

/// Notification payload variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// The finalized tale set after writing.
    TalesUpdated(Vec<Tale>),
    /// The game moved to another screen-level state.
    GameStateChanged(GameState),
    /// A writing round opened.
    RoundStarted(RoundStarted),
    /// A tale's reveal began.
    TaleRevealStarted(TaleRevealStarted),
    /// A further chapter was revealed.
    ChapterRevealed(ChapterRevealed),
}

/// Metadata attached to every notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMetadata {
    /// Unique notification identifier.
    pub notification_id: Uuid,
    /// The room the notification belongs to.
    pub room_id: Uuid,
    /// The local participant whose controller raised it.
    pub player_id: Uuid,
    /// Timestamp of creation.
    pub occurred_at: DateTime<Utc>,
}

/// Notification envelope for the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameNotification {
    /// Notification metadata.
    pub metadata: NotificationMetadata,
    /// Notification-specific payload.
    pub kind: NotificationKind,
}

impl GameNotification {
    /// Wraps `kind` in an envelope stamped by `clock`.
    #[must_use]
    pub fn new(room_id: Uuid, player_id: Uuid, kind: NotificationKind, clock: &dyn Clock) -> Self {
        Self {
            metadata: NotificationMetadata {
                notification_id: Uuid::now_v7(),
                room_id,
                player_id,
                occurred_at: clock.now(),
            },
            kind,
        }
    }

    /// Returns the notification type name.
    #[must_use]
    pub fn notification_type(&self) -> &'static str {
        match &self.kind {
            NotificationKind::TalesUpdated(_) => TALES_UPDATED_NOTIFICATION_TYPE,
            NotificationKind::GameStateChanged(_) => GAME_STATE_CHANGED_NOTIFICATION_TYPE,
            NotificationKind::RoundStarted(_) => ROUND_STARTED_NOTIFICATION_TYPE,
            NotificationKind::TaleRevealStarted(_) => TALE_REVEAL_STARTED_NOTIFICATION_TYPE,
            NotificationKind::ChapterRevealed(_) => CHAPTER_REVEALED_NOTIFICATION_TYPE,
        }
    }

    /// Serializes the payload to JSON.
    #[must_use]
    pub fn to_payload(&self) -> serde_json::Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(&self.kind).expect("NotificationKind serialization is infallible")
    }
}

/// A request to the consensus channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Store a tale's edits.
    SubmitTale(Tale),
    /// Publish a ready or skip-vote intent.
    PublishIntent(Intent),
}

impl Outbound {
    /// Short name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SubmitTale(_) => "submit_tale",
            Self::PublishIntent(_) => "publish_intent",
        }
    }
}

/// A side effect recorded by a controller transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send to the consensus channel, in recording order.
    Publish(Outbound),
    /// Hand to the surrounding application.
    Notify(GameNotification),
}
