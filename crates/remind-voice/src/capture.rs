//! Capture coordinator: continuous recognition with debounced finalization.
//!
//! Implements the listening half of a turn. Final results hand the buffered
//! text over at once; interim results arm a silence window and the buffer is
//! handed over when it expires without a newer result.

use crate::config::CaptureSettings;
use crate::device::AudioOwner;
use crate::error::{SessionFault, VoiceError, VoiceResult};
use crate::io::{
    SessionIo, STATUS_ACCESS_REVOKED, STATUS_ENDED, STATUS_LISTENING, STATUS_PAUSED,
    STATUS_PERMISSION_DENIED,
};
use crate::platform::{CaptureErrorKind, CaptureEvent, CaptureTicket, SpeechCapture, TimerKind};
use tracing::{debug, info, warn};

/// Text heard so far in the current turn.
///
/// Final segments accumulate in `committed`. The interim hypothesis is the
/// platform's latest guess for the segment still being spoken, so each
/// interim result replaces it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PendingUtterance {
    committed: String,
    hypothesis: String,
}

impl PendingUtterance {
    pub fn commit(&mut self, segment: &str) {
        self.committed.push_str(segment);
        self.hypothesis.clear();
    }

    pub fn set_hypothesis(&mut self, text: &str) {
        self.hypothesis = text.to_string();
    }

    pub fn is_empty(&self) -> bool {
        self.committed.trim().is_empty() && self.hypothesis.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.committed.clear();
        self.hypothesis.clear();
    }

    /// Drain the buffer into one trimmed utterance; `None` if nothing was heard.
    pub fn take(&mut self) -> Option<String> {
        let mut text = self.committed.trim().to_string();
        let hypothesis = self.hypothesis.trim();
        if !hypothesis.is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(hypothesis);
        }
        self.clear();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// What the session has to act on after a capture event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    None,
    /// A recognition session is open.
    Listening,
    /// A complete caller utterance is ready for processing.
    Finalized(String),
    Fault(SessionFault),
    /// The platform kept ending sessions; listening is paused.
    GaveUp,
}

pub struct CaptureCoordinator {
    backend: Box<dyn SpeechCapture>,
    settings: CaptureSettings,
    next_ticket: u64,
    awaiting_permission: Option<CaptureTicket>,
    active: Option<CaptureTicket>,
    pending: PendingUtterance,
    consecutive_ends: u32,
}

impl CaptureCoordinator {
    pub fn new(backend: Box<dyn SpeechCapture>, settings: CaptureSettings) -> Self {
        Self {
            backend,
            settings,
            next_ticket: 1,
            awaiting_permission: None,
            active: None,
            pending: PendingUtterance::default(),
            consecutive_ends: 0,
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    pub fn is_listening(&self) -> bool {
        self.active.is_some()
    }

    /// True while a permission probe is outstanding.
    pub fn is_starting(&self) -> bool {
        self.awaiting_permission.is_some()
    }

    pub fn pending(&self) -> &PendingUtterance {
        &self.pending
    }

    /// Forget earlier platform-initiated ends, e.g. after a manual start.
    pub fn reset_restarts(&mut self) {
        self.consecutive_ends = 0;
    }

    /// Ask for microphone access; capture begins once it is granted.
    pub fn start(&mut self, io: &mut SessionIo) -> VoiceResult<()> {
        if !self.backend.is_available() {
            return Err(VoiceError::CapabilityUnavailable);
        }
        if let AudioOwner::Playback(id) = io.device.owner() {
            return Err(VoiceError::DeviceBusy {
                holder: id.to_string(),
            });
        }
        if self.active.is_some() || self.awaiting_permission.is_some() {
            debug!("capture already running or starting");
            return Ok(());
        }
        let ticket = CaptureTicket(self.next_ticket);
        self.next_ticket += 1;
        self.awaiting_permission = Some(ticket);
        debug!(%ticket, "requesting microphone permission");
        self.backend.request_permission(ticket);
        Ok(())
    }

    /// End capture, abandon any permission probe and drop buffered text.
    pub fn stop(&mut self, io: &mut SessionIo) {
        self.awaiting_permission = None;
        io.timers.disarm(TimerKind::Debounce);
        self.pending.clear();
        if let Some(ticket) = self.active.take() {
            info!(%ticket, "🛑 Capture stopped");
            self.backend.end(ticket);
            io.device.release_capture(ticket);
        }
    }

    pub fn handle(
        &mut self,
        ticket: CaptureTicket,
        event: CaptureEvent,
        processing: bool,
        has_profile: bool,
        io: &mut SessionIo,
    ) -> CaptureOutcome {
        match event {
            CaptureEvent::PermissionGranted => self.on_granted(ticket, io),
            CaptureEvent::PermissionDenied => {
                if self.awaiting_permission != Some(ticket) {
                    debug!(%ticket, "stale permission denial ignored");
                    return CaptureOutcome::None;
                }
                self.awaiting_permission = None;
                warn!(%ticket, "microphone permission denied");
                io.status.set(STATUS_PERMISSION_DENIED);
                CaptureOutcome::Fault(SessionFault::PermissionDenied)
            }
            event => {
                if self.active != Some(ticket) {
                    debug!(%ticket, ?event, "event for inactive capture ignored");
                    return CaptureOutcome::None;
                }
                self.on_session_event(ticket, event, processing, has_profile, io)
            }
        }
    }

    fn on_granted(&mut self, ticket: CaptureTicket, io: &mut SessionIo) -> CaptureOutcome {
        if self.awaiting_permission != Some(ticket) {
            debug!(%ticket, "stale permission grant ignored");
            return CaptureOutcome::None;
        }
        self.awaiting_permission = None;

        if let Err(e) = io.device.claim_capture(ticket) {
            warn!(%ticket, error = %e, "cannot capture while the device is held");
            return CaptureOutcome::None;
        }
        match self.backend.begin(ticket, &self.settings) {
            Ok(()) => {
                self.active = Some(ticket);
                info!(%ticket, locale = %self.settings.locale, "🎤 Capture started");
                io.status.set(STATUS_LISTENING);
                CaptureOutcome::Listening
            }
            Err(VoiceError::CapabilityUnavailable) => {
                io.device.release_capture(ticket);
                CaptureOutcome::Fault(SessionFault::CapabilityUnavailable)
            }
            Err(e) => {
                io.device.release_capture(ticket);
                warn!(%ticket, error = %e, "capture failed to begin");
                io.status.set(format!("Speech recognition error: {e}"));
                CaptureOutcome::None
            }
        }
    }

    fn on_session_event(
        &mut self,
        ticket: CaptureTicket,
        event: CaptureEvent,
        processing: bool,
        has_profile: bool,
        io: &mut SessionIo,
    ) -> CaptureOutcome {
        match event {
            CaptureEvent::Started => {
                io.status.set(STATUS_LISTENING);
                self.pending.clear();
                CaptureOutcome::None
            }
            CaptureEvent::Interim(text) => {
                self.consecutive_ends = 0;
                io.status.set(format!("{STATUS_LISTENING} \"{}\"", text.trim()));
                self.pending.set_hypothesis(&text);
                io.timers.arm(TimerKind::Debounce, self.settings.debounce());
                CaptureOutcome::None
            }
            CaptureEvent::Final(text) => {
                self.consecutive_ends = 0;
                self.pending.commit(&text);
                io.timers.disarm(TimerKind::Debounce);
                if processing {
                    return CaptureOutcome::None;
                }
                self.pending
                    .take()
                    .map_or(CaptureOutcome::None, CaptureOutcome::Finalized)
            }
            CaptureEvent::Error(CaptureErrorKind::PermissionRevoked) => {
                warn!(%ticket, "microphone access revoked during capture");
                self.stop(io);
                io.status.set(STATUS_ACCESS_REVOKED);
                CaptureOutcome::Fault(SessionFault::PermissionDenied)
            }
            CaptureEvent::Error(kind) => {
                let err = VoiceError::CaptureTransient(kind.to_string());
                warn!(%ticket, error = %err, "transient capture error");
                io.status.set(err.to_string());
                CaptureOutcome::None
            }
            CaptureEvent::Ended => self.on_ended(ticket, processing, has_profile, io),
            CaptureEvent::PermissionGranted | CaptureEvent::PermissionDenied => {
                CaptureOutcome::None
            }
        }
    }

    fn on_ended(
        &mut self,
        ticket: CaptureTicket,
        processing: bool,
        has_profile: bool,
        io: &mut SessionIo,
    ) -> CaptureOutcome {
        self.active = None;
        io.device.release_capture(ticket);
        io.status.set(STATUS_ENDED);
        info!(%ticket, "capture ended by platform");

        if processing || !has_profile {
            return CaptureOutcome::None;
        }

        self.consecutive_ends += 1;
        if self.consecutive_ends > self.settings.max_consecutive_restarts {
            warn!(
                ends = self.consecutive_ends,
                "platform keeps ending capture without results; pausing"
            );
            io.timers.disarm(TimerKind::Restart);
            io.status.set(STATUS_PAUSED);
            return CaptureOutcome::GaveUp;
        }
        let delay = self.settings.restart_delay(self.consecutive_ends);
        debug!(attempt = self.consecutive_ends, ?delay, "scheduling capture restart");
        io.timers.arm(TimerKind::Restart, delay);
        CaptureOutcome::None
    }

    /// The silence window expired with no newer result.
    pub fn on_debounce(&mut self, processing: bool) -> CaptureOutcome {
        if processing {
            return CaptureOutcome::None;
        }
        self.pending
            .take()
            .map_or(CaptureOutcome::None, CaptureOutcome::Finalized)
    }
}
