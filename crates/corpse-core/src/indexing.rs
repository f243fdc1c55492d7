//! Tale and chapter indexing shared by both phases.

use uuid::Uuid;

use crate::entities::{Chapter, Tale};
use crate::error::GameError;

/// Index of the tale a player edits in `round`.
///
/// Each round shifts every player one tale forward, wrapping at the end of
/// the roster.
///
/// # Errors
///
/// Returns `GameError::OutOfRange` if `player_index` is not a roster
/// position.
pub fn tale_index_for(
    player_index: usize,
    round: usize,
    player_count: usize,
) -> Result<usize, GameError> {
    if player_index >= player_count {
        return Err(GameError::OutOfRange {
            what: "player",
            index: player_index,
            len: player_count,
        });
    }
    Ok((player_index + round) % player_count)
}

/// Most recent chapter with text, other than `editing_id`.
///
/// `None` in the first round, when nothing has been written yet.
#[must_use]
pub fn last_written_chapter(tale: &Tale, editing_id: Uuid) -> Option<&Chapter> {
    tale.chapters
        .iter()
        .rev()
        .find(|chapter| chapter.is_written() && chapter.id != editing_id)
}

/// Chapter index unlocked after `elapsed` ticks of reading.
#[must_use]
pub fn revealed_chapter_index(elapsed: u32, seconds_per_chapter: u32) -> usize {
    if seconds_per_chapter == 0 {
        return 0;
    }
    usize::try_from(elapsed / seconds_per_chapter).unwrap_or(usize::MAX)
}

/// Checks that a tale set still has the shape the controller indexes into.
///
/// # Errors
///
/// Returns `GameError::StaleReference` if the tale count or any tale's
/// chapter count differs from what is expected.
pub fn validate_tale_set(
    tales: &[Tale],
    tale_count: usize,
    chapter_count: usize,
) -> Result<(), GameError> {
    if tales.len() != tale_count {
        return Err(GameError::StaleReference(format!(
            "expected {tale_count} tales, got {}",
            tales.len()
        )));
    }
    if let Some(tale) = tales.iter().find(|t| t.chapters.len() != chapter_count) {
        return Err(GameError::StaleReference(format!(
            "tale {} has {} chapters, expected {chapter_count}",
            tale.id,
            tale.chapters.len()
        )));
    }
    Ok(())
}
