//! In-process consensus hub.
//!
//! `LocalHub` plays the shared game session for participants living in the
//! same process: it stores submitted tales, tracks ready flags and skip votes
//! per participant, and broadcasts the "everyone has decided" events.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use corpse_core::channel::{
    ConsensusChannel, ConsensusEvent, ConsensusTopic, Intent, IntentKind, Subscription,
};
use corpse_core::entities::{Player, Room, Tale};
use corpse_core::error::GameError;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug)]
struct HubState {
    participants: Vec<Uuid>,
    tales: Vec<Tale>,
    ready: HashMap<Uuid, bool>,
    skip_votes: HashMap<Uuid, bool>,
    round: usize,
    tale: usize,
    subscribers: Vec<(ConsensusTopic, mpsc::UnboundedSender<ConsensusEvent>)>,
}

impl HubState {
    fn broadcast(&mut self, event: &ConsensusEvent) {
        self.subscribers.retain(|(_, sender)| !sender.is_closed());
        let topic = event.topic();
        let delivered = self
            .subscribers
            .iter()
            .filter(|(t, _)| *t == topic)
            .filter(|(_, sender)| sender.send(event.clone()).is_ok())
            .count();
        info!(?topic, delivered, "consensus reached");
    }

    fn everyone(&self, flags: &HashMap<Uuid, bool>, counts: impl Fn(bool) -> bool) -> bool {
        self.participants
            .iter()
            .all(|id| flags.get(id).copied().is_some_and(&counts))
    }
}

/// Shared consensus channel for participants in one process.
#[derive(Debug)]
pub struct LocalHub {
    room_id: Uuid,
    state: Mutex<HubState>,
}

impl LocalHub {
    /// Creates a hub for `players` holding `tales` as the session's copy.
    #[must_use]
    pub fn new(room: &Room, players: &[Player], tales: Vec<Tale>) -> Self {
        Self {
            room_id: room.id,
            state: Mutex::new(HubState {
                participants: players.iter().map(|player| player.id).collect(),
                tales,
                ready: HashMap::new(),
                skip_votes: HashMap::new(),
                round: 0,
                tale: 0,
                subscribers: Vec::new(),
            }),
        }
    }

    /// The session's current tale set.
    #[must_use]
    pub fn tales(&self) -> Vec<Tale> {
        self.state().tales.clone()
    }

    /// Number of writing rounds closed so far.
    #[must_use]
    pub fn rounds_closed(&self) -> usize {
        self.state().round
    }

    /// Number of tale reveals closed so far.
    #[must_use]
    pub fn tales_closed(&self) -> usize {
        self.state().tale
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ConsensusChannel for LocalHub {
    async fn submit_tale_update(&self, tale: &Tale) -> Result<(), GameError> {
        let mut state = self.state();
        let stored = state
            .tales
            .iter_mut()
            .find(|stored| stored.id == tale.id)
            .ok_or_else(|| GameError::StaleReference(format!("unknown tale {}", tale.id)))?;
        if stored.chapters.len() != tale.chapters.len() {
            return Err(GameError::StaleReference(format!(
                "tale {} has {} chapters, got {}",
                tale.id,
                stored.chapters.len(),
                tale.chapters.len()
            )));
        }
        *stored = tale.clone();
        debug!(tale_id = %tale.id, "tale stored");
        Ok(())
    }

    async fn publish_intent(&self, intent: Intent) -> Result<(), GameError> {
        if intent.room_id != self.room_id {
            return Err(GameError::Validation(format!(
                "intent for room {} sent to room {}",
                intent.room_id, self.room_id
            )));
        }
        let mut state = self.state();
        if !state.participants.contains(&intent.player_id) {
            return Err(GameError::Validation(format!(
                "player {} is not in this room",
                intent.player_id
            )));
        }
        debug!(player_id = %intent.player_id, kind = ?intent.kind, step = intent.step, value = intent.value, "intent received");

        let open_step = match intent.kind {
            IntentKind::Ready => state.round,
            IntentKind::SkipVote => state.tale,
        };
        if intent.step != open_step {
            debug!(
                player_id = %intent.player_id,
                step = intent.step,
                open_step,
                "dropping intent for a closed step"
            );
            return Ok(());
        }

        match intent.kind {
            IntentKind::Ready => {
                state.ready.insert(intent.player_id, intent.value);
                if state.everyone(&state.ready, |ready| ready) {
                    let event = ConsensusEvent::EveryoneReady {
                        round: state.round,
                        tales: state.tales.clone(),
                    };
                    state.round += 1;
                    state.ready.clear();
                    state.broadcast(&event);
                }
            }
            IntentKind::SkipVote => {
                state.skip_votes.insert(intent.player_id, intent.value);
                if state.everyone(&state.skip_votes, |_| true) {
                    let event = ConsensusEvent::EveryoneVoted { tale: state.tale };
                    state.tale += 1;
                    state.skip_votes.clear();
                    state.broadcast(&event);
                }
            }
        }
        Ok(())
    }

    fn subscribe(&self, topic: ConsensusTopic) -> Subscription {
        let (subscription, sender) = Subscription::new(topic);
        self.state().subscribers.push((topic, sender));
        subscription
    }
}

#[cfg(test)]
mod tests {
    use corpse_test_support::{roster, room};

    use super::*;

    fn intent(room: &Room, player: &Player, kind: IntentKind, step: usize, value: bool) -> Intent {
        Intent {
            room_id: room.id,
            player_id: player.id,
            kind,
            step,
            value,
        }
    }

    #[tokio::test]
    async fn test_everyone_ready_is_broadcast_with_stored_tales() {
        // Arrange
        let room = room();
        let players = roster(2);
        let hub = LocalHub::new(&room, &players, Tale::blank_set(2));
        let mut subscription = hub.subscribe(ConsensusTopic::EveryoneReady);
        let mut edited = hub.tales()[0].clone();
        edited.chapters[0].text = "The end.".to_owned();

        // Act
        hub.submit_tale_update(&edited).await.unwrap();
        hub.publish_intent(intent(&room, &players[0], IntentKind::Ready, 0, true))
            .await
            .unwrap();
        hub.publish_intent(intent(&room, &players[1], IntentKind::Ready, 0, true))
            .await
            .unwrap();

        // Assert
        match subscription.recv().await {
            Some(ConsensusEvent::EveryoneReady { round, tales }) => {
                assert_eq!(round, 0);
                assert_eq!(tales[0].chapters[0].text, "The end.");
            }
            other => panic!("expected EveryoneReady, got {other:?}"),
        }
        assert_eq!(hub.rounds_closed(), 1);
    }

    #[tokio::test]
    async fn test_withdrawn_readiness_blocks_consensus() {
        let room = room();
        let players = roster(2);
        let hub = LocalHub::new(&room, &players, Tale::blank_set(2));

        hub.publish_intent(intent(&room, &players[0], IntentKind::Ready, 0, true))
            .await
            .unwrap();
        hub.publish_intent(intent(&room, &players[0], IntentKind::Ready, 0, false))
            .await
            .unwrap();
        hub.publish_intent(intent(&room, &players[1], IntentKind::Ready, 0, true))
            .await
            .unwrap();

        assert_eq!(hub.rounds_closed(), 0);
    }

    #[tokio::test]
    async fn test_any_skip_vote_value_counts() {
        // Arrange
        let room = room();
        let players = roster(2);
        let hub = LocalHub::new(&room, &players, Tale::blank_set(2));
        let mut subscription = hub.subscribe(ConsensusTopic::EveryoneVoted);

        // Act
        hub.publish_intent(intent(&room, &players[0], IntentKind::SkipVote, 0, false))
            .await
            .unwrap();
        hub.publish_intent(intent(&room, &players[1], IntentKind::SkipVote, 0, true))
            .await
            .unwrap();

        // Assert
        assert_eq!(
            subscription.recv().await,
            Some(ConsensusEvent::EveryoneVoted { tale: 0 })
        );
        assert_eq!(hub.tales_closed(), 1);
    }

    #[tokio::test]
    async fn test_ready_from_a_closed_round_does_not_count_toward_the_next() {
        // Arrange
        let room = room();
        let players = roster(2);
        let hub = LocalHub::new(&room, &players, Tale::blank_set(2));
        let mut subscription = hub.subscribe(ConsensusTopic::EveryoneReady);
        for player in &players {
            hub.publish_intent(intent(&room, player, IntentKind::Ready, 0, true))
                .await
                .unwrap();
        }

        // Act
        hub.publish_intent(intent(&room, &players[0], IntentKind::Ready, 0, false))
            .await
            .unwrap();
        hub.publish_intent(intent(&room, &players[0], IntentKind::Ready, 0, true))
            .await
            .unwrap();
        hub.publish_intent(intent(&room, &players[1], IntentKind::Ready, 1, true))
            .await
            .unwrap();

        // Assert
        assert!(matches!(
            subscription.recv().await,
            Some(ConsensusEvent::EveryoneReady { round: 0, .. })
        ));
        assert_eq!(hub.rounds_closed(), 1);
        assert_eq!(hub.state().ready.get(&players[0].id), None);
        assert_eq!(hub.state().ready.get(&players[1].id), Some(&true));
    }

    #[tokio::test]
    async fn test_skip_vote_from_a_closed_tale_does_not_count_toward_the_next() {
        // Arrange
        let room = room();
        let players = roster(2);
        let hub = LocalHub::new(&room, &players, Tale::blank_set(2));
        for player in &players {
            hub.publish_intent(intent(&room, player, IntentKind::SkipVote, 0, true))
                .await
                .unwrap();
        }

        // Act
        hub.publish_intent(intent(&room, &players[0], IntentKind::SkipVote, 0, false))
            .await
            .unwrap();
        hub.publish_intent(intent(&room, &players[1], IntentKind::SkipVote, 1, true))
            .await
            .unwrap();

        // Assert
        assert_eq!(hub.tales_closed(), 1);

        hub.publish_intent(intent(&room, &players[0], IntentKind::SkipVote, 1, true))
            .await
            .unwrap();
        assert_eq!(hub.tales_closed(), 2);
    }

    #[tokio::test]
    async fn test_unknown_tale_is_stale() {
        let players = roster(2);
        let hub = LocalHub::new(&room(), &players, Tale::blank_set(2));

        let result = hub.submit_tale_update(&Tale::new(2)).await;

        assert!(matches!(result, Err(GameError::StaleReference(_))));
    }

    #[tokio::test]
    async fn test_intent_from_stranger_is_rejected() {
        let room = room();
        let players = roster(2);
        let hub = LocalHub::new(&room, &players, Tale::blank_set(2));
        let stranger = Player::new("Stranger");

        let result = hub
            .publish_intent(intent(&room, &stranger, IntentKind::Ready, 0, true))
            .await;

        assert!(matches!(result, Err(GameError::Validation(_))));
    }

    #[tokio::test]
    async fn test_cancelled_subscription_stops_receiving() {
        let room = room();
        let players = roster(2);
        let hub = LocalHub::new(&room, &players, Tale::blank_set(2));
        hub.subscribe(ConsensusTopic::EveryoneVoted).cancel();

        for player in &players {
            hub.publish_intent(intent(&room, player, IntentKind::SkipVote, 0, true))
                .await
                .unwrap();
        }

        assert!(hub.state().subscribers.is_empty());
    }
}
