//! Writing phase driver.
//!
//! Runs a `RoundController` as an actor: one loop applies timer ticks,
//! consensus events, and local commands in arrival order, then routes the
//! effects each step recorded. Nothing else touches the controller, so every
//! transition sees a consistent state.

use std::sync::Arc;

use corpse_core::channel::{ConsensusChannel, ConsensusEvent, ConsensusTopic, Subscription};
use corpse_core::clock::Clock;
use corpse_core::dispatch::{Dispatcher, route_effects};
use corpse_core::entities::Tale;
use corpse_core::error::GameError;
use corpse_core::event::GameNotification;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::application::query_handlers::{RoundView, round_view};
use crate::domain::round::RoundController;

/// A local participant action routed into the driver loop.
#[derive(Debug)]
pub enum WritingCommand {
    /// Flip readiness; replies with the new value.
    ToggleReady {
        /// Reply channel.
        response: oneshot::Sender<Result<bool, GameError>>,
    },
    /// Replace the chapter text.
    WriteChapter {
        /// The new text.
        text: String,
        /// Reply channel.
        response: oneshot::Sender<Result<(), GameError>>,
    },
    /// Name the tale (first round only).
    SetTitle {
        /// The new title.
        title: String,
        /// Reply channel.
        response: oneshot::Sender<Result<(), GameError>>,
    },
    /// Snapshot the round for display.
    View {
        /// Reply channel.
        response: oneshot::Sender<Result<RoundView, GameError>>,
    },
}

/// Cloneable handle for sending commands to a running writing driver.
#[derive(Debug, Clone)]
pub struct WritingHandle {
    sender: mpsc::UnboundedSender<WritingCommand>,
}

/// Creates a command handle and the receiver the driver consumes.
#[must_use]
pub fn command_channel() -> (WritingHandle, mpsc::UnboundedReceiver<WritingCommand>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (WritingHandle { sender }, receiver)
}

impl WritingHandle {
    /// Flips the local readiness flag.
    ///
    /// # Errors
    ///
    /// Returns the controller's error, or `GameError::Channel` if the driver
    /// is not running.
    pub async fn toggle_ready(&self) -> Result<bool, GameError> {
        self.request(|response| WritingCommand::ToggleReady { response })
            .await?
    }

    /// Replaces the text of the chapter being edited.
    ///
    /// # Errors
    ///
    /// Returns the controller's error, or `GameError::Channel` if the driver
    /// is not running.
    pub async fn write_chapter(&self, text: impl Into<String>) -> Result<(), GameError> {
        let text = text.into();
        self.request(|response| WritingCommand::WriteChapter { text, response })
            .await?
    }

    /// Names the tale started this round.
    ///
    /// # Errors
    ///
    /// Returns the controller's error, or `GameError::Channel` if the driver
    /// is not running.
    pub async fn set_title(&self, title: impl Into<String>) -> Result<(), GameError> {
        let title = title.into();
        self.request(|response| WritingCommand::SetTitle { title, response })
            .await?
    }

    /// Returns a view of the open round.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Channel` if the driver is not running.
    pub async fn view(&self) -> Result<RoundView, GameError> {
        self.request(|response| WritingCommand::View { response })
            .await?
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> WritingCommand,
    ) -> Result<T, GameError> {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(command(response))
            .map_err(|_| stopped())?;
        receiver.await.map_err(|_| stopped())
    }
}

fn stopped() -> GameError {
    GameError::Channel("writing driver is not running".to_owned())
}

/// Owns a `RoundController` for the length of the writing phase.
pub struct WritingDriver {
    controller: RoundController,
    channel: Arc<dyn ConsensusChannel>,
    clock: Arc<dyn Clock>,
    commands: mpsc::UnboundedReceiver<WritingCommand>,
    notifications: mpsc::UnboundedSender<GameNotification>,
}

impl WritingDriver {
    /// Wraps `controller`. Notifications go to `notifications`.
    #[must_use]
    pub fn new(
        controller: RoundController,
        channel: Arc<dyn ConsensusChannel>,
        clock: Arc<dyn Clock>,
        commands: mpsc::UnboundedReceiver<WritingCommand>,
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

    /// Plays every writing round and returns the finished tale set.
    ///
    /// The "everyone ready" subscription is cancelled and every queued
    /// publish is attempted before this returns.
    ///
    /// # Errors
    ///
    /// Returns `GameError::Channel` if the consensus subscription closes
    /// before the last round, or the publishing task stops.
    pub async fn run(mut self) -> Result<Vec<Tale>, GameError> {
        let mut subscription = self.channel.subscribe(ConsensusTopic::EveryoneReady);
        let dispatcher = Dispatcher::spawn(Arc::clone(&self.channel));
        info!(
            players = self.controller.player_count(),
            "writing phase started"
        );

        let outcome = self.drive(&mut subscription, &dispatcher).await;

        subscription.cancel();
        dispatcher.finish().await;
        outcome?;
        Ok(self.controller.into_tales())
    }

    async fn drive(
        &mut self,
        subscription: &mut Subscription,
        dispatcher: &Dispatcher,
    ) -> Result<(), GameError> {
        self.flush(dispatcher)?;
        while !self.controller.is_finished() {
            tokio::select! {
                () = self.controller.timer_mut().wait_tick() => self.controller.on_tick(),
                event = subscription.recv() => match event {
                    Some(ConsensusEvent::EveryoneReady { round, tales }) => {
                        if let Err(error) =
                            self.controller
                                .on_remote_consensus(round, tales, self.clock.as_ref())
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

    fn handle(&mut self, command: WritingCommand) {
        match command {
            WritingCommand::ToggleReady { response } => {
                respond(response, self.controller.toggle_ready());
            }
            WritingCommand::WriteChapter { text, response } => {
                respond(response, self.controller.write_chapter(text));
            }
            WritingCommand::SetTitle { title, response } => {
                respond(response, self.controller.set_title(title));
            }
            WritingCommand::View { response } => {
                respond(response, round_view(&self.controller));
            }
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

fn respond<T>(response: oneshot::Sender<T>, value: T) {
    if response.send(value).is_err() {
        debug!("command caller went away");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use corpse_core::config::TimingConfig;
    use corpse_core::entities::{GameState, Player};
    use corpse_core::event::NotificationKind;
    use corpse_test_support::{
        ChannelCall, FailingChannel, RecordingChannel, fixed_clock, roster, room,
    };
    use tokio::task::JoinHandle;
    use tokio::time::sleep;

    use super::*;

    fn config() -> TimingConfig {
        TimingConfig {
            base_round_seconds: 3,
            first_round_bonus_seconds: 2,
            seconds_per_reveal_chapter: 2,
            tick: Duration::from_secs(1),
        }
    }

    struct Running {
        handle: WritingHandle,
        notifications: mpsc::UnboundedReceiver<GameNotification>,
        task: JoinHandle<Result<Vec<Tale>, GameError>>,
    }

    fn start(players: &[Player], channel: Arc<dyn ConsensusChannel>) -> Running {
        let controller = RoundController::new(
            &room(),
            players,
            &players[0],
            Tale::blank_set(players.len()),
            config(),
            &fixed_clock(),
        )
        .unwrap();
        let (handle, commands) = command_channel();
        let (notify_tx, notifications) = mpsc::unbounded_channel();
        let driver = WritingDriver::new(
            controller,
            channel,
            Arc::new(fixed_clock()),
            commands,
            notify_tx,
        );
        Running {
            handle,
            notifications,
            task: tokio::spawn(driver.run()),
        }
    }

    fn drain(receiver: &mut mpsc::UnboundedReceiver<GameNotification>) -> Vec<NotificationKind> {
        let mut kinds = Vec::new();
        while let Ok(notification) = receiver.try_recv() {
            kinds.push(notification.kind);
        }
        kinds
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_publishes_submit_then_ready() {
        // Arrange
        let players = roster(2);
        let channel = Arc::new(RecordingChannel::new());
        let running = start(&players, channel.clone());
        running.handle.write_chapter("Once upon a time").await.unwrap();

        // Act
        sleep(Duration::from_millis(4_500)).await;
        let before_deadline = channel.calls().len();
        sleep(Duration::from_secs(1)).await;

        // Assert
        assert_eq!(before_deadline, 0);
        match channel.calls().as_slice() {
            [ChannelCall::SubmitTale(tale), ChannelCall::PublishIntent(intent)] => {
                assert_eq!(tale.chapters[0].text, "Once upon a time");
                assert!(intent.value);
            }
            other => panic!("expected submit then ready, got {other:?}"),
        }
        running.task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_plays_rounds_and_returns_tales() {
        // Arrange
        let players = roster(2);
        let channel = Arc::new(RecordingChannel::new());
        let mut running = start(&players, channel.clone());
        sleep(Duration::from_millis(100)).await;

        // Act
        running.handle.toggle_ready().await.unwrap();
        sleep(Duration::from_millis(100)).await;
        let tales = match channel.calls().first() {
            Some(ChannelCall::SubmitTale(tale)) => {
                let mut tales = Tale::blank_set(2);
                tales[0] = tale.clone();
                tales
            }
            other => panic!("expected a submission, got {other:?}"),
        };
        channel.deliver(&ConsensusEvent::EveryoneReady {
            round: 0,
            tales: tales.clone(),
        });
        sleep(Duration::from_millis(100)).await;
        let view = running.handle.view().await.unwrap();
        channel.deliver(&ConsensusEvent::EveryoneReady { round: 1, tales });
        let result = running.task.await.unwrap().unwrap();

        // Assert
        assert_eq!(view.round, 1);
        assert_eq!(result.len(), 2);
        assert_eq!(channel.open_subscriptions(ConsensusTopic::EveryoneReady), 0);

        let kinds = drain(&mut running.notifications);
        assert_eq!(kinds.len(), 4);
        assert!(matches!(&kinds[0], NotificationKind::RoundStarted(s) if s.round == 0));
        assert!(matches!(&kinds[1], NotificationKind::RoundStarted(s) if s.round == 1));
        assert!(matches!(&kinds[2], NotificationKind::TalesUpdated(t) if t.len() == 2));
        assert_eq!(
            kinds[3],
            NotificationKind::GameStateChanged(GameState::AfterGame)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_consensus_advances_once() {
        // Arrange
        let players = roster(3);
        let channel = Arc::new(RecordingChannel::new());
        let running = start(&players, channel.clone());
        // A reply means the driver loop is up and subscribed.
        running.handle.view().await.unwrap();
        let tales = Tale::blank_set(3);

        // Act
        channel.deliver(&ConsensusEvent::EveryoneReady {
            round: 0,
            tales: tales.clone(),
        });
        channel.deliver(&ConsensusEvent::EveryoneReady { round: 0, tales });
        sleep(Duration::from_millis(100)).await;
        let view = running.handle.view().await.unwrap();

        // Assert
        assert_eq!(view.round, 1);
        assert!(!view.ready);
        running.task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_publishes_do_not_stall_phase() {
        // Arrange
        let players = roster(2);
        let channel = Arc::new(FailingChannel::new());
        let running = start(&players, channel.clone());
        sleep(Duration::from_millis(5_500)).await;

        // Act
        channel.deliver(&ConsensusEvent::EveryoneReady {
            round: 0,
            tales: Tale::blank_set(2),
        });
        sleep(Duration::from_millis(3_500)).await;
        channel.deliver(&ConsensusEvent::EveryoneReady {
            round: 1,
            tales: Tale::blank_set(2),
        });
        let result = running.task.await.unwrap();

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_reports_stopped_driver() {
        let players = roster(2);
        let channel = Arc::new(RecordingChannel::new());
        let running = start(&players, channel);
        running.task.abort();
        let _ = running.task.await;

        let result = running.handle.toggle_ready().await;

        assert!(matches!(result, Err(GameError::Channel(_))));
    }
}
