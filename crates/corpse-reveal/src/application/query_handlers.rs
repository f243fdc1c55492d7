//! Query handlers for the reveal phase.

use serde::Serialize;
use uuid::Uuid;

use crate::domain::reveal::{RevealController, RevealPhase};

/// A revealed chapter with its author's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevealedChapterView {
    /// The chapter identifier.
    pub chapter_id: Uuid,
    /// Author display name; `None` if unassigned or no longer on the roster.
    pub author: Option<String>,
    /// Chapter text.
    pub text: String,
}

/// Read-only view of the tale being revealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevealView {
    /// Current state machine phase.
    pub phase: RevealPhase,
    /// Zero-based tale number.
    pub tale_number: usize,
    /// Total number of tales.
    pub tale_count: usize,
    /// The tale identifier; `None` once every tale has been read.
    pub tale_id: Option<Uuid>,
    /// The tale title.
    pub title: String,
    /// The revealed prefix of the tale.
    pub chapters: Vec<RevealedChapterView>,
    /// Local skip vote.
    pub skip_voted: bool,
    /// Whether the full reading time has passed.
    pub reading_ended: bool,
    /// Ticks left of the reading time.
    pub remaining_ticks: u32,
}

/// Builds the view of `controller`'s current tale.
#[must_use]
pub fn reveal_view(controller: &RevealController) -> RevealView {
    let tale = controller.current_tale();
    RevealView {
        phase: controller.phase(),
        tale_number: controller.tale_number(),
        tale_count: controller.tale_count(),
        tale_id: tale.map(|tale| tale.id),
        title: tale.map(|tale| tale.title.clone()).unwrap_or_default(),
        chapters: controller
            .visible_chapters()
            .iter()
            .map(|chapter| RevealedChapterView {
                chapter_id: chapter.id,
                author: controller.author_name(chapter).map(str::to_owned),
                text: chapter.text.clone(),
            })
            .collect(),
        skip_voted: controller.skip_voted(),
        reading_ended: controller.reading_ended(),
        remaining_ticks: controller.remaining_ticks(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use corpse_core::config::TimingConfig;
    use corpse_test_support::{fixed_clock, roster, room, written_tales};

    use super::*;

    #[test]
    fn test_reveal_view_lists_revealed_chapters_with_authors() {
        // Arrange
        let players = roster(3);
        let config = TimingConfig {
            seconds_per_reveal_chapter: 2,
            tick: Duration::from_secs(1),
            ..TimingConfig::default()
        };
        let mut controller = RevealController::new(
            &room(),
            &players,
            &players[2],
            written_tales(&players, 3),
            config,
            &fixed_clock(),
        )
        .unwrap();
        for _ in 0..3 {
            controller.on_tick(&fixed_clock());
        }

        // Act
        let view = reveal_view(&controller);

        // Assert
        assert_eq!(view.phase, RevealPhase::Revealing);
        assert_eq!(view.tale_number, 0);
        assert_eq!(view.tale_count, 3);
        assert_eq!(view.title, "Tale 1");
        assert_eq!(view.remaining_ticks, 3);
        let authors: Vec<_> = view.chapters.iter().map(|c| c.author.clone()).collect();
        assert_eq!(
            authors,
            vec![Some("Player 1".to_owned()), Some("Player 3".to_owned())]
        );
        assert_eq!(view.chapters[1].text, "Player 3 wrote chapter 2");
    }
}
