//! Game entities: rooms, players, tales, and chapters.
//!
//! Tale content belongs to the game session; controllers work on copies and
//! hand the updated copies back through the consensus channel.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GameError;

/// A shared game session. Only its identifier is used by the phase
/// controllers, as the key for published intents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    /// Room identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
}

impl Room {
    /// Creates a room with a fresh identifier.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// A participant. Roster order determines turn assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Player identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
}

impl Player {
    /// Creates a player with a fresh identifier.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// One chapter of a tale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// Chapter identifier.
    pub id: Uuid,
    /// The player who writes this chapter, once assigned.
    pub author_id: Option<Uuid>,
    /// Chapter text; empty until written.
    pub text: String,
}

impl Chapter {
    /// Creates an unassigned, empty chapter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id: None,
            text: String::new(),
        }
    }

    /// Returns `true` once the chapter has any text.
    #[must_use]
    pub fn is_written(&self) -> bool {
        !self.text.is_empty()
    }

    /// Assigns the author if none is set yet.
    ///
    /// Returns `false` when the chapter already belongs to someone else;
    /// the existing author is kept.
    pub fn assign_author(&mut self, player_id: Uuid) -> bool {
        match self.author_id {
            None => {
                self.author_id = Some(player_id);
                true
            }
            Some(existing) => existing == player_id,
        }
    }
}

impl Default for Chapter {
    fn default() -> Self {
        Self::new()
    }
}

/// An ordered sequence of chapters written by different players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tale {
    /// Tale identifier.
    pub id: Uuid,
    /// Title, named by whoever writes the first chapter.
    pub title: String,
    /// Chapters in reading order. The length never changes.
    pub chapters: Vec<Chapter>,
}

impl Tale {
    /// Creates an untitled tale with `chapter_count` empty chapters.
    #[must_use]
    pub fn new(chapter_count: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: String::new(),
            chapters: (0..chapter_count).map(|_| Chapter::new()).collect(),
        }
    }

    /// Creates the tale set for a game: one tale per player, each with one
    /// chapter per player.
    #[must_use]
    pub fn blank_set(player_count: usize) -> Vec<Self> {
        (0..player_count).map(|_| Self::new(player_count)).collect()
    }

    /// Returns the chapter at `index`.
    ///
    /// # Errors
    ///
    /// Returns `GameError::OutOfRange` if the tale has no such chapter.
    pub fn chapter(&self, index: usize) -> Result<&Chapter, GameError> {
        let len = self.chapters.len();
        self.chapters.get(index).ok_or(GameError::OutOfRange {
            what: "chapter",
            index,
            len,
        })
    }

    /// Returns the chapter at `index` mutably.
    ///
    /// # Errors
    ///
    /// Returns `GameError::OutOfRange` if the tale has no such chapter.
    pub fn chapter_mut(&mut self, index: usize) -> Result<&mut Chapter, GameError> {
        let len = self.chapters.len();
        self.chapters.get_mut(index).ok_or(GameError::OutOfRange {
            what: "chapter",
            index,
            len,
        })
    }
}

/// Screen-level game state announced to the surrounding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    /// Players are writing chapters.
    Writing,
    /// Writing is over; tales are being revealed.
    AfterGame,
    /// Every tale has been revealed.
    GameEnded,
}
