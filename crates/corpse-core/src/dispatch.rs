//! Ordered, non-blocking delivery of controller effects.
//!
//! A `Dispatcher` owns one background task per phase driver. Publishes are
//! queued from the driver loop without awaiting and sent one at a time, so a
//! tale submission always reaches the channel before the readiness intent
//! recorded after it. Failed publishes are logged and not retried.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::channel::ConsensusChannel;
use crate::error::GameError;
use crate::event::{Effect, GameNotification, Outbound};

/// Sequential publisher for one phase driver.
#[derive(Debug)]
pub struct Dispatcher {
    sender: mpsc::UnboundedSender<Outbound>,
    task: JoinHandle<()>,
}

impl Dispatcher {
    /// Spawns the publishing task on the current runtime.
    #[must_use]
    pub fn spawn(channel: Arc<dyn ConsensusChannel>) -> Self {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Outbound>();
        let task = tokio::spawn(async move {
            while let Some(outbound) = receiver.recv().await {
                deliver(channel.as_ref(), outbound).await;
            }
        });
        Self { sender, task }
    }

    /// Queues a publish behind everything queued before it.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Channel` if the publishing task has stopped.
    pub fn send(&self, outbound: Outbound) -> Result<(), GameError> {
        self.sender
            .send(outbound)
            .map_err(|_| GameError::Channel("dispatcher has stopped".to_owned()))
    }

    /// Closes the queue and waits until every queued publish was attempted.
    pub async fn finish(self) {
        drop(self.sender);
        if let Err(error) = self.task.await {
            warn!(%error, "dispatcher task ended abnormally");
        }
    }
}

async fn deliver(channel: &dyn ConsensusChannel, outbound: Outbound) {
    let result = match &outbound {
        Outbound::SubmitTale(tale) => channel.submit_tale_update(tale).await,
        Outbound::PublishIntent(intent) => channel.publish_intent(*intent).await,
    };
    match result {
        Ok(()) => debug!(kind = outbound.kind(), "published"),
        Err(error) => warn!(%error, kind = outbound.kind(), "publish failed"),
    }
}

/// Routes drained controller effects: publishes to the dispatcher,
/// notifications to the application.
///
/// A closed notification receiver is not an error; the application may stop
/// listening before the phase ends.
///
/// # Errors
///
/// Returns `GameError::Channel` if the dispatcher has stopped.
pub fn route_effects(
    effects: Vec<Effect>,
    dispatcher: &Dispatcher,
    notifications: &mpsc::UnboundedSender<GameNotification>,
) -> Result<(), GameError> {
    for effect in effects {
        match effect {
            Effect::Publish(outbound) => dispatcher.send(outbound)?,
            Effect::Notify(notification) => {
                debug!(
                    notification_type = notification.notification_type(),
                    "notifying application"
                );
                if notifications.send(notification).is_err() {
                    debug!("notification receiver dropped");
                }
            }
        }
    }
    Ok(())
}
