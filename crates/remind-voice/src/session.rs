//! Session controller: the turn-taking state machine of a reminder call.
//!
//! ```text
//! Idle ──submit──► Speaking ──finished──► Listening ──utterance──► Processing
//!                     ▲                                                 │
//!                     └──────────────────── reply ──────────────────────┘
//! any ──stop──► Stopped ──start──► Listening        any ──fault──► Error
//! ```
//!
//! All mutation happens inside `&mut self` calls, one event at a time.

use crate::capture::{CaptureCoordinator, CaptureOutcome};
use crate::config::SessionConfig;
use crate::device::AudioOwner;
use crate::error::{SessionFault, VoiceError, VoiceResult};
use crate::greeting::greeting;
use crate::io::{SessionIo, STATUS_STOPPED, STATUS_UNSUPPORTED};
use crate::playback::{PlaybackCoordinator, SpeakOutcome};
use crate::platform::{SessionEvent, SpeechCapture, SpeechSynth, TimerKind, TimerPort};
use crate::profile::ClientProfile;
use crate::responder::{KeywordResponder, Responder, APOLOGY};
use crate::timers::TimerSet;
use crate::transcript::{ConversationEntry, Sender, Transcript};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum SessionState {
    #[default]
    Idle,
    Listening,
    Processing,
    Speaking,
    Stopped,
    Error(SessionFault),
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Listening => write!(f, "listening"),
            SessionState::Processing => write!(f, "processing"),
            SessionState::Speaking => write!(f, "speaking"),
            SessionState::Stopped => write!(f, "stopped"),
            SessionState::Error(fault) => write!(f, "error: {fault}"),
        }
    }
}

/// Something observers of the session should know about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "data")]
pub enum SessionUpdate {
    Entry(ConversationEntry),
    State(SessionState),
    Status(String),
}

/// Read-only view of a session at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub status: String,
    pub listening: bool,
    pub profile: Option<ClientProfile>,
    pub entries: Vec<ConversationEntry>,
}

/// At most one response generation at a time. Acquisition fails closed.
#[derive(Debug, Default)]
pub struct SingleFlight {
    held: bool,
}

impl SingleFlight {
    pub fn try_acquire(&mut self) -> bool {
        if self.held {
            return false;
        }
        self.held = true;
        true
    }

    pub fn release(&mut self) {
        self.held = false;
    }

    pub fn is_held(&self) -> bool {
        self.held
    }
}

pub struct SessionController {
    capture: CaptureCoordinator,
    playback: PlaybackCoordinator,
    io: SessionIo,
    responder: Box<dyn Responder>,
    profile: Option<ClientProfile>,
    transcript: Transcript,
    state: SessionState,
    processing: SingleFlight,
    today: Option<NaiveDate>,
    alive: bool,
    unsupported_reported: bool,
    updates: Vec<SessionUpdate>,
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        capture: Box<dyn SpeechCapture>,
        synth: Box<dyn SpeechSynth>,
        timers: Box<dyn TimerPort>,
    ) -> Self {
        let responder = KeywordResponder::new(&config.responder);
        let mut controller = Self {
            capture: CaptureCoordinator::new(capture, config.capture),
            playback: PlaybackCoordinator::new(synth, config.playback),
            io: SessionIo::new(TimerSet::new(timers)),
            responder: Box::new(responder),
            profile: None,
            transcript: Transcript::new(),
            state: SessionState::Idle,
            processing: SingleFlight::default(),
            today: None,
            alive: true,
            unsupported_reported: false,
            updates: Vec::new(),
        };
        if !controller.capture.is_available() {
            controller.fault(SessionFault::CapabilityUnavailable);
            controller.flush_status();
        }
        controller
    }

    /// Replace the keyword rules.
    pub fn with_responder(mut self, responder: Box<dyn Responder>) -> Self {
        self.responder = responder;
        self
    }

    /// Pin the date used for the greeting instead of the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn status(&self) -> &str {
        self.io.status.get()
    }

    pub fn is_listening(&self) -> bool {
        self.capture.is_listening()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn profile(&self) -> Option<&ClientProfile> {
        self.profile.as_ref()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn audio_owner(&self) -> AudioOwner {
        self.io.device.owner()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            status: self.io.status.get().to_string(),
            listening: self.capture.is_listening(),
            profile: self.profile.clone(),
            entries: self.transcript.entries().to_vec(),
        }
    }

    /// Take every update queued since the last call, oldest first.
    pub fn drain_updates(&mut self) -> Vec<SessionUpdate> {
        self.flush_status();
        std::mem::take(&mut self.updates)
    }

    /// Install a client and open the call with the greeting.
    ///
    /// Resets the session but keeps the transcript.
    pub fn submit_profile(&mut self, profile: ClientProfile) -> VoiceResult<()> {
        if !self.alive {
            return Err(VoiceError::SessionClosed);
        }
        profile.validate()?;

        self.halt();
        self.capture.reset_restarts();
        if self.state != SessionState::Error(SessionFault::CapabilityUnavailable) {
            self.set_state(SessionState::Idle);
        }

        let today = self.today.unwrap_or_else(|| Local::now().date_naive());
        let opening = greeting(&profile, today);
        info!(client = %profile.name, due = %profile.due_date, "📇 Client profile submitted");
        self.append(Sender::System, format!("Client data saved for {}", profile.name));
        self.profile = Some(profile);
        self.append(Sender::Agent, opening.clone());
        self.speak(&opening);
        self.flush_status();
        Ok(())
    }

    /// Resume listening after a manual stop. No-op without a profile.
    pub fn start(&mut self) {
        if !self.alive {
            return;
        }
        if !matches!(self.state, SessionState::Idle | SessionState::Stopped) {
            debug!(state = %self.state, "start ignored");
            return;
        }
        if self.profile.is_none() {
            debug!("start ignored: no client profile");
            return;
        }
        self.capture.reset_restarts();
        match self.capture.start(&mut self.io) {
            Ok(()) => {
                info!("▶️ Session started");
                self.set_state(SessionState::Listening);
            }
            Err(e) => self.on_capture_error(e),
        }
        self.flush_status();
    }

    /// Halt capture and playback. An error state stays in place.
    pub fn stop(&mut self) {
        if !self.alive {
            return;
        }
        self.halt();
        if !matches!(self.state, SessionState::Error(_)) {
            if self.state != SessionState::Stopped {
                info!("⏹️ Session stopped");
            }
            self.set_state(SessionState::Stopped);
            self.io.status.set(STATUS_STOPPED);
        }
        self.flush_status();
    }

    /// Release every platform resource. The controller ignores all later input.
    pub fn teardown(&mut self) {
        if !self.alive {
            return;
        }
        self.halt();
        self.alive = false;
        info!("session torn down");
    }

    pub fn handle(&mut self, event: SessionEvent) {
        if !self.alive {
            debug!(?event, "event after teardown ignored");
            return;
        }
        match event {
            SessionEvent::Capture { ticket, event } => {
                let outcome = self.capture.handle(
                    ticket,
                    event,
                    self.is_processing(),
                    self.profile.is_some(),
                    &mut self.io,
                );
                self.on_capture_outcome(outcome);
            }
            SessionEvent::SpeechFinished(id) => {
                match self.playback.complete(id, &mut self.capture, &mut self.io) {
                    Ok(true) => self.resume_listening(),
                    Ok(false) => {}
                    Err(e) => self.on_capture_error(e),
                }
            }
            SessionEvent::TimerFired(token) => {
                if !self.io.timers.take_fired(token) {
                    debug!(kind = ?token.kind, generation = token.generation, "stale timer ignored");
                    return;
                }
                self.on_timer(token.kind);
            }
        }
        self.flush_status();
    }

    fn on_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::Debounce => {
                let outcome = self.capture.on_debounce(self.is_processing());
                self.on_capture_outcome(outcome);
            }
            TimerKind::Restart => {
                if self.state != SessionState::Listening || self.profile.is_none() {
                    debug!(state = %self.state, "capture restart skipped");
                    return;
                }
                if let Err(e) = self.capture.start(&mut self.io) {
                    self.on_capture_error(e);
                }
            }
            TimerKind::Watchdog => {
                match self.playback.on_watchdog(&mut self.capture, &mut self.io) {
                    Ok(true) => self.resume_listening(),
                    Ok(false) => {}
                    Err(e) => self.on_capture_error(e),
                }
            }
        }
    }

    fn on_capture_outcome(&mut self, outcome: CaptureOutcome) {
        match outcome {
            CaptureOutcome::None => {}
            CaptureOutcome::Listening => {
                if matches!(self.state, SessionState::Idle | SessionState::Stopped) {
                    self.set_state(SessionState::Listening);
                }
            }
            CaptureOutcome::Finalized(text) => self.on_utterance(text),
            CaptureOutcome::Fault(fault) => self.fault(fault),
            CaptureOutcome::GaveUp => self.set_state(SessionState::Stopped),
        }
    }

    /// One complete caller utterance: record it, answer it, speak the answer.
    fn on_utterance(&mut self, text: String) {
        if self.state != SessionState::Listening || !self.processing.try_acquire() {
            warn!(state = %self.state, utterance = %text, "utterance dropped: session busy");
            return;
        }
        info!(utterance = %text, "🗣️ Caller said");
        self.append(Sender::User, text.clone());
        self.set_state(SessionState::Processing);
        self.capture.stop(&mut self.io);

        let reply = match self.responder.respond(&text, self.profile.as_ref()) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "responder failed; apologising");
                APOLOGY.to_string()
            }
        };
        self.append(Sender::Agent, reply.clone());
        self.processing.release();
        self.speak(&reply);
    }

    fn speak(&mut self, text: &str) {
        match self.playback.speak(text, &mut self.capture, &mut self.io) {
            Ok(SpeakOutcome::Playing(_)) => {
                if !matches!(self.state, SessionState::Error(_)) {
                    self.set_state(SessionState::Speaking);
                }
            }
            Ok(SpeakOutcome::Skipped) => self.resume_listening(),
            Err(e) => self.on_capture_error(e),
        }
    }

    fn resume_listening(&mut self) {
        if !matches!(self.state, SessionState::Error(_)) {
            self.set_state(SessionState::Listening);
        }
    }

    fn on_capture_error(&mut self, err: VoiceError) {
        match err {
            VoiceError::CapabilityUnavailable => self.fault(SessionFault::CapabilityUnavailable),
            VoiceError::PermissionDenied => self.fault(SessionFault::PermissionDenied),
            other => {
                warn!(error = %other, "capture could not be started");
                self.io.status.set(other.to_string());
            }
        }
    }

    fn fault(&mut self, fault: SessionFault) {
        self.capture.stop(&mut self.io);
        self.io.timers.disarm(TimerKind::Restart);
        if fault == SessionFault::CapabilityUnavailable {
            self.io.status.set(STATUS_UNSUPPORTED);
            if !self.unsupported_reported {
                self.unsupported_reported = true;
                error!("speech recognition is not supported on this platform");
            }
        } else {
            error!(%fault, "session entered error state");
        }
        self.set_state(SessionState::Error(fault));
    }

    fn halt(&mut self) {
        self.capture.stop(&mut self.io);
        self.playback.cancel(&mut self.io);
        self.io.timers.disarm_all();
        self.processing.release();
    }

    fn is_processing(&self) -> bool {
        self.processing.is_held() || self.state == SessionState::Processing
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "state change");
            self.state = state;
            self.updates.push(SessionUpdate::State(state));
        }
    }

    fn append(&mut self, sender: Sender, text: String) {
        let entry = self.transcript.push(sender, text);
        self.updates.push(SessionUpdate::Entry(entry));
    }

    fn flush_status(&mut self) {
        if let Some(status) = self.io.status.take_changed() {
            self.updates.push(SessionUpdate::Status(status));
        }
    }
}
