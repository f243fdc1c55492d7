//! End-to-end games over the in-process hub.

mod common;

use std::time::Duration;

use corpse_client::autoplay::autoplay;
use corpse_core::entities::GameState;
use corpse_core::event::NotificationKind;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_timer_only_game_runs_both_phases() {
    // Arrange
    let game = common::local_game(2);
    let started = Instant::now();
    let mut participants: Vec<_> = game
        .players
        .iter()
        .map(|player| common::join(&game, player))
        .collect();

    // Act
    let mut results = Vec::new();
    for participant in &mut participants {
        results.push((&mut participant.session).await.unwrap().unwrap());
    }
    let elapsed = started.elapsed();

    // Assert
    // Writing: 5 + 3 ticks. Reveal: 2 tales of 2 chapters at 2 ticks each.
    assert_eq!(elapsed, Duration::from_secs(16));
    assert_eq!(game.hub.rounds_closed(), 2);
    assert_eq!(game.hub.tales_closed(), 2);

    let kinds: Vec<NotificationKind> = participants
        .iter_mut()
        .flat_map(|participant| common::drain(&mut participant.notifications))
        .map(|notification| notification.kind)
        .collect();
    let tales_updated = kinds
        .iter()
        .filter(|kind| matches!(kind, NotificationKind::TalesUpdated(_)))
        .count();
    let count_state = |state: GameState| {
        kinds
            .iter()
            .filter(|kind| **kind == NotificationKind::GameStateChanged(state))
            .count()
    };
    assert_eq!(tales_updated, 2);
    assert_eq!(count_state(GameState::Writing), 2);
    assert_eq!(count_state(GameState::AfterGame), 2);
    assert_eq!(count_state(GameState::GameEnded), 2);

    for tales in &results {
        assert_eq!(tales.len(), 2);
        assert!(
            tales
                .iter()
                .flat_map(|tale| &tale.chapters)
                .all(|chapter| chapter.author_id.is_some())
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_notifications_follow_phase_order() {
    // Arrange
    let game = common::local_game(2);
    let mut participants: Vec<_> = game
        .players
        .iter()
        .map(|player| common::join(&game, player))
        .collect();

    // Act
    for participant in &mut participants {
        (&mut participant.session).await.unwrap().unwrap();
    }
    let types: Vec<&str> = common::drain(&mut participants[0].notifications)
        .iter()
        .map(|notification| notification.notification_type())
        .collect();

    // Assert
    assert_eq!(
        types,
        vec![
            "game.state_changed",
            "writing.round_started",
            "writing.round_started",
            "game.tales_updated",
            "game.state_changed",
            "reveal.tale_started",
            "reveal.chapter_revealed",
            "reveal.tale_started",
            "reveal.chapter_revealed",
            "game.state_changed",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_scripted_players_finish_writing_without_waiting() {
    // Arrange
    let game = common::local_game(3);
    let started = Instant::now();
    let mut sessions = Vec::new();
    let mut bots = Vec::new();
    for player in &game.players {
        let participant = common::join(&game, player);
        sessions.push(participant.session);
        bots.push(tokio::spawn(autoplay(
            participant.player,
            participant.handle,
            participant.notifications,
        )));
    }

    // Act
    let mut results = Vec::new();
    for session in sessions {
        results.push(session.await.unwrap().unwrap());
    }
    let mut written = Vec::new();
    for bot in bots {
        written.push(bot.await.unwrap().unwrap());
    }

    // Assert
    // Only the reveal waits: 3 tales of 3 chapters at 2 ticks each.
    assert_eq!(started.elapsed(), Duration::from_secs(18));
    assert_eq!(written, vec![3, 3, 3]);

    let tales = &results[0];
    assert_eq!(tales[0].title, "Player 1's tale");
    assert_eq!(tales[2].title, "Player 3's tale");
    assert_eq!(tales[0].chapters[0].text, "Player 1 begins a story.");
    assert_eq!(
        tales[0].chapters[1].text,
        "Player 3 continues where \"Player 1 begins a story.\" left off."
    );
    assert_eq!(tales[0].chapters[1].author_id, Some(game.players[2].id));
    assert_eq!(game.hub.tales(), results[1]);
}

#[tokio::test(start_paused = true)]
async fn test_game_completes_after_notification_receivers_are_dropped() {
    // Arrange
    let game = common::local_game(2);
    let sessions: Vec<_> = game
        .players
        .iter()
        .map(|player| {
            let participant = common::join(&game, player);
            drop(participant.notifications);
            participant.session
        })
        .collect();

    // Act
    let mut results = Vec::new();
    for session in sessions {
        results.push(session.await.unwrap());
    }

    // Assert
    for result in results {
        assert_eq!(result.unwrap().len(), 2);
    }
    assert_eq!(game.hub.rounds_closed(), 2);
    assert_eq!(game.hub.tales_closed(), 2);
}
