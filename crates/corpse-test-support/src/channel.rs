//! Test channels — mock `ConsensusChannel` implementations for tests.

use std::sync::Mutex;

use async_trait::async_trait;
use corpse_core::channel::{
    ConsensusChannel, ConsensusEvent, ConsensusTopic, Intent, Subscription,
};
use corpse_core::entities::Tale;
use corpse_core::error::GameError;
use tokio::sync::mpsc;

/// A call made against a test channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCall {
    /// `submit_tale_update` was called with this tale.
    SubmitTale(Tale),
    /// `publish_intent` was called with this intent.
    PublishIntent(Intent),
}

#[derive(Debug, Default)]
struct Subscribers(Mutex<Vec<(ConsensusTopic, mpsc::UnboundedSender<ConsensusEvent>)>>);

impl Subscribers {
    fn add(&self, topic: ConsensusTopic) -> Subscription {
        let (subscription, sender) = Subscription::new(topic);
        self.0.lock().unwrap().push((topic, sender));
        subscription
    }

    fn deliver(&self, event: &ConsensusEvent) -> usize {
        let mut subscribers = self.0.lock().unwrap();
        subscribers.retain(|(_, sender)| !sender.is_closed());
        subscribers
            .iter()
            .filter(|(topic, _)| *topic == event.topic())
            .filter(|(_, sender)| sender.send(event.clone()).is_ok())
            .count()
    }

    fn open(&self, topic: ConsensusTopic) -> usize {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, sender)| *t == topic && !sender.is_closed())
            .count()
    }
}

/// A channel that records every call and always succeeds. Consensus events
/// are injected by the test through `deliver`.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    calls: Mutex<Vec<ChannelCall>>,
    subscribers: Subscribers,
}

impl RecordingChannel {
    /// Creates an empty recording channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all calls in the order they were made.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<ChannelCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Returns only the published intents.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn intents(&self) -> Vec<Intent> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ChannelCall::PublishIntent(intent) => Some(intent),
                ChannelCall::SubmitTale(_) => None,
            })
            .collect()
    }

    /// Delivers `event` to every open subscription on its topic and returns
    /// how many received it.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn deliver(&self, event: &ConsensusEvent) -> usize {
        self.subscribers.deliver(event)
    }

    /// Number of open subscriptions on `topic`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn open_subscriptions(&self, topic: ConsensusTopic) -> usize {
        self.subscribers.open(topic)
    }
}

#[async_trait]
impl ConsensusChannel for RecordingChannel {
    async fn submit_tale_update(&self, tale: &Tale) -> Result<(), GameError> {
        self.calls
            .lock()
            .unwrap()
            .push(ChannelCall::SubmitTale(tale.clone()));
        Ok(())
    }

    async fn publish_intent(&self, intent: Intent) -> Result<(), GameError> {
        self.calls
            .lock()
            .unwrap()
            .push(ChannelCall::PublishIntent(intent));
        Ok(())
    }

    fn subscribe(&self, topic: ConsensusTopic) -> Subscription {
        self.subscribers.add(topic)
    }
}

/// A channel whose publishes always fail. Subscriptions still work, so
/// tests can check that a phase keeps advancing when publishing is down.
#[derive(Debug, Default)]
pub struct FailingChannel {
    subscribers: Subscribers,
}

impl FailingChannel {
    /// Creates a failing channel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to every open subscription on its topic.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn deliver(&self, event: &ConsensusEvent) -> usize {
        self.subscribers.deliver(event)
    }
}

#[async_trait]
impl ConsensusChannel for FailingChannel {
    async fn submit_tale_update(&self, _tale: &Tale) -> Result<(), GameError> {
        Err(GameError::Channel("connection refused".into()))
    }

    async fn publish_intent(&self, _intent: Intent) -> Result<(), GameError> {
        Err(GameError::Channel("connection refused".into()))
    }

    fn subscribe(&self, topic: ConsensusTopic) -> Subscription {
        self.subscribers.add(topic)
    }
}
