//! Roster and tale fixtures.

use corpse_core::entities::{Player, Room, Tale};

/// A room named "test-room".
#[must_use]
pub fn room() -> Room {
    Room::new("test-room")
}

/// `count` players named "Player 1" through "Player N".
#[must_use]
pub fn roster(count: usize) -> Vec<Player> {
    (1..=count)
        .map(|n| Player::new(format!("Player {n}")))
        .collect()
}

/// A square tale set where the first `written` chapters of every tale
/// already have text and an author from `players`, in roster order.
#[must_use]
pub fn written_tales(players: &[Player], written: usize) -> Vec<Tale> {
    let mut tales = Tale::blank_set(players.len());
    for (tale_index, tale) in tales.iter_mut().enumerate() {
        tale.title = format!("Tale {}", tale_index + 1);
        for (chapter_index, chapter) in tale.chapters.iter_mut().enumerate().take(written) {
            let author = &players[(tale_index + players.len() - chapter_index) % players.len()];
            chapter.author_id = Some(author.id);
            chapter.text = format!("{} wrote chapter {}", author.name, chapter_index + 1);
        }
    }
    tales
}
