//! Consensus channel abstraction.
//!
//! The channel carries local intents ("I am ready", "I vote skip") out to the
//! other participants and delivers "everyone has decided" events back in.
//! Delivery is asynchronous and its timing relative to local ticks is not
//! controlled by the receiver.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::entities::Tale;
use crate::error::GameError;

/// Which consensus event a subscription receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsensusTopic {
    /// Every participant is ready to close the writing round.
    EveryoneReady,
    /// Every participant has cast a skip vote for the current tale.
    EveryoneVoted,
}

/// An inbound "everyone has decided" event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusEvent {
    /// Closes writing round `round` and carries the merged tale set.
    EveryoneReady {
        /// The round being closed.
        round: usize,
        /// Tales as stored by the session after every submission.
        tales: Vec<Tale>,
    },
    /// Closes the reveal of tale number `tale`.
    EveryoneVoted {
        /// The tale being closed.
        tale: usize,
    },
}

impl ConsensusEvent {
    /// The topic this event is delivered on.
    #[must_use]
    pub fn topic(&self) -> ConsensusTopic {
        match self {
            Self::EveryoneReady { .. } => ConsensusTopic::EveryoneReady,
            Self::EveryoneVoted { .. } => ConsensusTopic::EveryoneVoted,
        }
    }
}

/// Kind of intent a participant publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentKind {
    /// Ready to end the writing round.
    Ready,
    /// Vote to skip the rest of the current reveal.
    SkipVote,
}

/// A participant's published intent, keyed by room and participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    /// The room the intent belongs to.
    pub room_id: Uuid,
    /// The participant publishing it.
    pub player_id: Uuid,
    /// What is being signalled.
    pub kind: IntentKind,
    /// The round or tale number the intent belongs to.
    pub step: usize,
    /// The new value of the flag.
    pub value: bool,
}

/// Registration for one consensus topic.
///
/// Dropping or cancelling the subscription closes it; the channel stops
/// delivering to it, so a finished phase cannot receive events meant for the
/// next one.
#[derive(Debug)]
pub struct Subscription {
    topic: ConsensusTopic,
    receiver: mpsc::UnboundedReceiver<ConsensusEvent>,
}

impl Subscription {
    /// Creates a subscription and the sender a channel uses to feed it.
    #[must_use]
    pub fn new(topic: ConsensusTopic) -> (Self, mpsc::UnboundedSender<ConsensusEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { topic, receiver }, sender)
    }

    /// The topic this subscription was registered for.
    #[must_use]
    pub fn topic(&self) -> ConsensusTopic {
        self.topic
    }

    /// Receives the next event, or `None` once the channel has hung up.
    pub async fn recv(&mut self) -> Option<ConsensusEvent> {
        self.receiver.recv().await
    }

    /// Deregisters the subscription.
    pub fn cancel(mut self) {
        self.receiver.close();
    }
}

/// Bidirectional notification bus between participants.
#[async_trait]
pub trait ConsensusChannel: Send + Sync {
    /// Durably stores a tale's chapter edits.
    async fn submit_tale_update(&self, tale: &Tale) -> Result<(), GameError>;

    /// Publishes a participant's intent.
    async fn publish_intent(&self, intent: Intent) -> Result<(), GameError>;

    /// Registers for consensus events on `topic`.
    fn subscribe(&self, topic: ConsensusTopic) -> Subscription;
}
