//! Reveal phase driver.
//!
//! Same actor shape as the writing driver: timer ticks, "everyone voted"
//! events, and local commands are applied one at a time and the recorded
//! effects are routed after each step.

use std::sync::Arc;

use corpse_core::channel::{ConsensusChannel, ConsensusEvent, ConsensusTopic, Subscription};
use corpse_core::clock::Clock;
use corpse_core::dispatch::{Dispatcher, route_effects};
use corpse_core::error::GameError;
use corpse_core::event::GameNotification;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::application::query_handlers::{RevealView, reveal_view};
use crate::domain::reveal::RevealController;

/// A local participant action routed into the driver loop.
#[derive(Debug)]
pub enum RevealCommand {
    /// Flip the skip vote; replies with the new value.
    ToggleSkip {
        /// Reply channel.
        response: oneshot::Sender<Result<bool, GameError>>,
    },
    /// Snapshot the current tale for display.
    View {
        /// Reply channel.
        response: oneshot::Sender<RevealView>,
    },
}

/// Cloneable handle for sending commands to a running reveal driver.
#[derive(Debug, Clone)]
pub struct RevealHandle {
    sender: mpsc::UnboundedSender<RevealCommand>,
}

/// Creates a command handle and the receiver the driver consumes.
#[must_use]
pub fn command_channel() -> (RevealHandle, mpsc::UnboundedReceiver<RevealCommand>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (RevealHandle { sender }, receiver)
}

impl RevealHandle {
    /// Flips the local skip vote.
    ///
    /// # Errors
    ///
    /// Returns the controller's error, or `GameError::Channel` if the driver
    /// is not running.
    pub async fn toggle_skip(&self) -> Result<bool, GameError> {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(RevealCommand::ToggleSkip { response })
            .map_err(|_| stopped())?;
        receiver.await.map_err(|_| stopped())?
    }

    /// Returns a view of the tale being revealed.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Channel` if the driver is not running.
    pub async fn view(&self) -> Result<RevealView, GameError> {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(RevealCommand::View { response })
            .map_err(|_| stopped())?;
        receiver.await.map_err(|_| stopped())
    }
}

fn stopped() -> GameError {
    GameError::Channel("reveal driver is not running".to_owned())
}

/// Owns a `RevealController` for the length of the reveal phase.
pub struct RevealDriver {
    controller: RevealController,
    channel: Arc<dyn ConsensusChannel>,
    clock: Arc<dyn Clock>,
    commands: mpsc::UnboundedReceiver<RevealCommand>,
    notifications: mpsc::UnboundedSender<GameNotification>,
}

impl RevealDriver {
    /// Wraps `controller`. Notifications go to `notifications`.
    #[must_use]
    pub fn new(
        controller: RevealController,
        channel: Arc<dyn ConsensusChannel>,
        clock: Arc<dyn Clock>,
        commands: mpsc::UnboundedReceiver<RevealCommand>,
        notifications: mpsc::UnboundedSender<GameNotification>,
    ) -> Self {
        Self {
            controller,
            channel,
            clock,
            commands,
            notifications,
        }
    }

    /// Reveals every tale, returning once the game has ended.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Channel` if the consensus subscription closes
    /// before the last tale, or the publishing task stops.
    pub async fn run(mut self) -> Result<(), GameError> {
        let mut subscription = self.channel.subscribe(ConsensusTopic::EveryoneVoted);
        let dispatcher = Dispatcher::spawn(Arc::clone(&self.channel));
        info!(tales = self.controller.tale_count(), "reveal phase started");

        let outcome = self.drive(&mut subscription, &dispatcher).await;

        subscription.cancel();
        dispatcher.finish().await;
        outcome
    }

    async fn drive(
        &mut self,
        subscription: &mut Subscription,
        dispatcher: &Dispatcher,
    ) -> Result<(), GameError> {
        self.flush(dispatcher)?;
        while !self.controller.is_finished() {
            tokio::select! {
                () = self.controller.timer_mut().wait_tick() => {
                    self.controller.on_tick(self.clock.as_ref());
                }
                event = subscription.recv() => match event {
                    Some(ConsensusEvent::EveryoneVoted { tale }) => {
                        if let Err(error) =
                            self.controller.on_everyone_voted(tale, self.clock.as_ref())
                        {
                            debug!(%error, "ignoring consensus event");
                        }
                    }
                    Some(other) => {
                        debug!(topic = ?other.topic(), "ignoring event for another topic");
                    }
                    None => {
                        return Err(GameError::Channel(
                            "consensus subscription closed".to_owned(),
                        ));
                    }
                },
                Some(command) = self.commands.recv() => self.handle(command),
            }
            self.flush(dispatcher)?;
        }
        Ok(())
    }

    fn handle(&mut self, command: RevealCommand) {
        let delivered = match command {
            RevealCommand::ToggleSkip { response } => {
                response.send(self.controller.toggle_skip()).is_ok()
            }
            RevealCommand::View { response } => {
                response.send(reveal_view(&self.controller)).is_ok()
            }
        };
        if !delivered {
            debug!("command caller went away");
        }
    }

    fn flush(&mut self, dispatcher: &Dispatcher) -> Result<(), GameError> {
        route_effects(
            self.controller.take_pending_effects(),
            dispatcher,
            &self.notifications,
        )
    }
}
