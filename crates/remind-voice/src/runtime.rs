//! **Session runtime**: one tokio task owns the controller.
//!
//! Platform callbacks and timer firings arrive on the event channel, user
//! actions on the command channel. The task feeds them to the controller one
//! at a time and publishes the resulting updates on a broadcast channel.
//! Nothing else touches session state, so no lock guards it.

use crate::config::SessionConfig;
use crate::error::{VoiceError, VoiceResult};
use crate::platform::{session_channel, EventReceiver, EventSender, SpeechCapture, SpeechSynth};
use crate::profile::ClientProfile;
use crate::session::{SessionController, SessionSnapshot, SessionUpdate};
use crate::timers::TokioTimers;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Updates buffered per subscriber before the slowest one starts lagging.
pub const UPDATE_CAPACITY: usize = 256;

#[derive(Debug)]
pub enum SessionCommand {
    SubmitProfile {
        profile: ClientProfile,
        reply: oneshot::Sender<VoiceResult<()>>,
    },
    Start,
    Stop,
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Shutdown,
}

/// Cloneable front door to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    events: EventSender,
    updates: broadcast::Sender<SessionUpdate>,
}

impl SessionHandle {
    pub async fn submit_profile(&self, profile: ClientProfile) -> VoiceResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::SubmitProfile { profile, reply })?;
        rx.await
            .map_err(|e| VoiceError::ChannelReceive(e.to_string()))?
    }

    pub fn start(&self) -> VoiceResult<()> {
        self.send(SessionCommand::Start)
    }

    pub fn stop(&self) -> VoiceResult<()> {
        self.send(SessionCommand::Stop)
    }

    pub async fn snapshot(&self) -> VoiceResult<SessionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Snapshot(reply))?;
        rx.await.map_err(|e| VoiceError::ChannelReceive(e.to_string()))
    }

    /// Tear the session down. Later commands fail with `SessionClosed`.
    pub fn shutdown(&self) -> VoiceResult<()> {
        self.send(SessionCommand::Shutdown)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }

    /// Sender platform adapters post their callbacks to.
    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    fn send(&self, command: SessionCommand) -> VoiceResult<()> {
        self.commands
            .send(command)
            .map_err(|_| VoiceError::SessionClosed)
    }
}

pub struct SessionRunner {
    controller: SessionController,
    events: EventReceiver,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    updates: broadcast::Sender<SessionUpdate>,
}

impl SessionRunner {
    /// Wrap a controller whose backends post to `events_tx`.
    pub fn new(
        controller: SessionController,
        events_tx: EventSender,
        events_rx: EventReceiver,
    ) -> (Self, SessionHandle) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        let handle = SessionHandle {
            commands: commands_tx,
            events: events_tx,
            updates: updates.clone(),
        };
        let runner = Self {
            controller,
            events: events_rx,
            commands: commands_rx,
            updates,
        };
        (runner, handle)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!("🎧 Session runtime started");
        self.publish();

        loop {
            enum Input {
                Command(SessionCommand),
                Event(crate::platform::SessionEvent),
                Closed,
            }

            // Commands first so a stop is never queued behind platform chatter.
            let input = tokio::select! {
                biased;
                cmd = self.commands.recv() => match cmd {
                    Some(c) => Input::Command(c),
                    None => Input::Closed,
                },
                Some(event) = self.events.recv() => Input::Event(event),
            };

            match input {
                Input::Command(SessionCommand::Shutdown) | Input::Closed => break,
                Input::Command(command) => self.apply(command),
                Input::Event(event) => self.controller.handle(event),
            }
            self.publish();
        }

        self.controller.teardown();
        self.publish();
        info!("session runtime stopped");
    }

    fn apply(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::SubmitProfile { profile, reply } => {
                let result = self.controller.submit_profile(profile);
                if let Err(e) = &result {
                    warn!(error = %e, "profile rejected");
                }
                let _ = reply.send(result);
            }
            SessionCommand::Start => self.controller.start(),
            SessionCommand::Stop => self.controller.stop(),
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(self.controller.snapshot());
            }
            SessionCommand::Shutdown => {}
        }
    }

    fn publish(&mut self) {
        for update in self.controller.drain_updates() {
            // No subscribers is fine; the snapshot still has everything.
            if self.updates.send(update).is_err() {
                debug!("no update subscribers");
            }
        }
    }
}

/// Build a controller with tokio timers and spawn its runtime.
///
/// `build` receives the event sender and returns the platform backends.
pub fn spawn_session<F>(config: SessionConfig, build: F) -> (SessionHandle, JoinHandle<()>)
where
    F: FnOnce(EventSender) -> (Box<dyn SpeechCapture>, Box<dyn SpeechSynth>),
{
    let (tx, rx) = session_channel();
    let (capture, synth) = build(tx.clone());
    let timers = TokioTimers::new(tx.clone());
    let controller = SessionController::new(config, capture, synth, Box::new(timers));
    let (runner, handle) = SessionRunner::new(controller, tx, rx);
    (handle, runner.spawn())
}
