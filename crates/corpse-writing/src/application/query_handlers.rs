//! Query handlers for the writing phase.
//!
//! Builds read-only view DTOs from a round controller for the local screen.

use corpse_core::entities::Chapter;
use corpse_core::error::GameError;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::round::{RoundController, RoundPhase};

/// Read-only view of the local participant's writing round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundView {
    /// Current state machine phase.
    pub phase: RoundPhase,
    /// Zero-based round number.
    pub round: usize,
    /// Total number of rounds.
    pub round_count: usize,
    /// The tale being continued.
    pub tale_id: Uuid,
    /// The tale title so far.
    pub title: String,
    /// The chapter being edited.
    pub chapter_id: Uuid,
    /// Current text of that chapter.
    pub text: String,
    /// The previous written chapter, shown for context.
    pub last_chapter: Option<Chapter>,
    /// Whether the title may still be edited.
    pub can_set_title: bool,
    /// Local readiness flag.
    pub ready: bool,
    /// Ticks left before the deadline.
    pub remaining_ticks: u32,
}

/// Builds the view of `controller`'s open round.
///
/// # Errors
///
/// Returns `GameError::OutOfRange` if the editing reference no longer points
/// into the tale set.
pub fn round_view(controller: &RoundController) -> Result<RoundView, GameError> {
    let tale = controller.current_tale()?;
    let chapter = controller.editing_chapter()?;
    Ok(RoundView {
        phase: controller.phase(),
        round: controller.round_number(),
        round_count: controller.player_count(),
        tale_id: tale.id,
        title: tale.title.clone(),
        chapter_id: chapter.id,
        text: chapter.text.clone(),
        last_chapter: controller.last_chapter().cloned(),
        can_set_title: controller.is_first_round()
            && controller.phase() == RoundPhase::Writing
            && !controller.is_ready(),
        ready: controller.is_ready(),
        remaining_ticks: controller.remaining_ticks(),
    })
}
