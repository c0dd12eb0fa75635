//! Placeholder platform backends that record every call.
//!
//! Use them to drive a session without a microphone or speaker: tests inject
//! the platform's answers as [`SessionEvent`]s, or let the placeholders post
//! the obvious ones (permission granted, capture started) on their own.

use crate::config::{CaptureSettings, VoiceSettings};
use crate::error::{VoiceError, VoiceResult};
use crate::platform::{
    CaptureEvent, CaptureTicket, EventSender, SessionEvent, SpeechCapture, SpeechSynth, TimerKind,
    TimerPort, TimerToken, UtteranceId,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct CaptureLog {
    permission_requests: Vec<CaptureTicket>,
    begins: Vec<CaptureTicket>,
    ends: Vec<CaptureTicket>,
    active: Option<CaptureTicket>,
    last_settings: Option<CaptureSettings>,
}

/// Read side of a [`PlaceholderCapture`].
#[derive(Debug, Clone, Default)]
pub struct CaptureProbe {
    log: Arc<Mutex<CaptureLog>>,
}

impl CaptureProbe {
    pub fn permission_requests(&self) -> usize {
        lock(&self.log).permission_requests.len()
    }

    /// Ticket of the most recent permission request.
    pub fn last_ticket(&self) -> Option<CaptureTicket> {
        lock(&self.log).permission_requests.last().copied()
    }

    pub fn begins(&self) -> usize {
        lock(&self.log).begins.len()
    }

    pub fn ends(&self) -> usize {
        lock(&self.log).ends.len()
    }

    /// Ticket of the capture session currently open, if any.
    pub fn active(&self) -> Option<CaptureTicket> {
        lock(&self.log).active
    }

    pub fn last_settings(&self) -> Option<CaptureSettings> {
        lock(&self.log).last_settings.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PermissionReply {
    Manual,
    Grant,
    Deny,
}

/// Recording capture backend.
#[derive(Debug)]
pub struct PlaceholderCapture {
    available: bool,
    reply: PermissionReply,
    events: Option<EventSender>,
    probe: CaptureProbe,
}

impl PlaceholderCapture {
    /// Backend that answers nothing on its own.
    pub fn new() -> (Self, CaptureProbe) {
        let probe = CaptureProbe::default();
        (
            Self {
                available: true,
                reply: PermissionReply::Manual,
                events: None,
                probe: probe.clone(),
            },
            probe,
        )
    }

    /// Grant permission and report `Started` automatically.
    pub fn auto_grant(events: EventSender) -> (Self, CaptureProbe) {
        let (mut capture, probe) = Self::new();
        capture.reply = PermissionReply::Grant;
        capture.events = Some(events);
        (capture, probe)
    }

    /// Deny every permission request automatically.
    pub fn auto_deny(events: EventSender) -> (Self, CaptureProbe) {
        let (mut capture, probe) = Self::new();
        capture.reply = PermissionReply::Deny;
        capture.events = Some(events);
        (capture, probe)
    }

    /// A platform without speech recognition.
    pub fn unavailable() -> (Self, CaptureProbe) {
        let (mut capture, probe) = Self::new();
        capture.available = false;
        (capture, probe)
    }

    fn post(&self, ticket: CaptureTicket, event: CaptureEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(SessionEvent::capture(ticket, event));
        }
    }
}

impl SpeechCapture for PlaceholderCapture {
    fn is_available(&self) -> bool {
        self.available
    }

    fn request_permission(&mut self, ticket: CaptureTicket) {
        lock(&self.probe.log).permission_requests.push(ticket);
        match self.reply {
            PermissionReply::Manual => {}
            PermissionReply::Grant => self.post(ticket, CaptureEvent::PermissionGranted),
            PermissionReply::Deny => self.post(ticket, CaptureEvent::PermissionDenied),
        }
    }

    fn begin(&mut self, ticket: CaptureTicket, settings: &CaptureSettings) -> VoiceResult<()> {
        if !self.available {
            return Err(VoiceError::CapabilityUnavailable);
        }
        {
            let mut log = lock(&self.probe.log);
            log.begins.push(ticket);
            log.active = Some(ticket);
            log.last_settings = Some(settings.clone());
        }
        if self.reply == PermissionReply::Grant {
            self.post(ticket, CaptureEvent::Started);
        }
        Ok(())
    }

    fn end(&mut self, ticket: CaptureTicket) {
        let mut log = lock(&self.probe.log);
        log.ends.push(ticket);
        if log.active == Some(ticket) {
            log.active = None;
        }
    }
}

#[derive(Debug, Default)]
struct SynthLog {
    spoken: Vec<(UtteranceId, String)>,
    cancelled: Vec<UtteranceId>,
    last_settings: Option<VoiceSettings>,
}

/// Read side of a [`PlaceholderSynth`].
#[derive(Debug, Clone, Default)]
pub struct SynthProbe {
    log: Arc<Mutex<SynthLog>>,
}

impl SynthProbe {
    pub fn spoken(&self) -> Vec<(UtteranceId, String)> {
        lock(&self.log).spoken.clone()
    }

    pub fn last(&self) -> Option<(UtteranceId, String)> {
        lock(&self.log).spoken.last().cloned()
    }

    pub fn cancelled(&self) -> Vec<UtteranceId> {
        lock(&self.log).cancelled.clone()
    }

    pub fn last_settings(&self) -> Option<VoiceSettings> {
        lock(&self.log).last_settings.clone()
    }
}

/// Recording synthesizer. Completion is never posted on its own; send
/// `SessionEvent::SpeechFinished` to simulate the end of speech.
#[derive(Debug)]
pub struct PlaceholderSynth {
    fail: bool,
    probe: SynthProbe,
}

impl PlaceholderSynth {
    pub fn new() -> (Self, SynthProbe) {
        let probe = SynthProbe::default();
        (
            Self {
                fail: false,
                probe: probe.clone(),
            },
            probe,
        )
    }

    /// Synthesizer that rejects every request.
    pub fn failing() -> (Self, SynthProbe) {
        let (mut synth, probe) = Self::new();
        synth.fail = true;
        (synth, probe)
    }
}

impl SpeechSynth for PlaceholderSynth {
    fn speak(&mut self, id: UtteranceId, text: &str, settings: &VoiceSettings) -> VoiceResult<()> {
        let mut log = lock(&self.probe.log);
        log.spoken.push((id, text.to_string()));
        log.last_settings = Some(settings.clone());
        if self.fail {
            return Err(VoiceError::Synthesis("placeholder rejects speech".to_string()));
        }
        Ok(())
    }

    fn cancel(&mut self, id: UtteranceId) {
        lock(&self.probe.log).cancelled.push(id);
    }
}

#[derive(Debug, Default)]
struct TimerLog {
    armed: Vec<(TimerToken, Duration)>,
    disarmed: Vec<TimerKind>,
}

/// Read side of [`ManualTimers`].
#[derive(Debug, Clone, Default)]
pub struct TimerProbe {
    log: Arc<Mutex<TimerLog>>,
}

impl TimerProbe {
    /// Most recently armed token of `kind` and its delay.
    pub fn latest(&self, kind: TimerKind) -> Option<(TimerToken, Duration)> {
        lock(&self.log)
            .armed
            .iter()
            .rev()
            .find(|(t, _)| t.kind == kind)
            .copied()
    }

    pub fn armed_count(&self, kind: TimerKind) -> usize {
        lock(&self.log)
            .armed
            .iter()
            .filter(|(t, _)| t.kind == kind)
            .count()
    }

    pub fn disarmed(&self, kind: TimerKind) -> usize {
        lock(&self.log)
            .disarmed
            .iter()
            .filter(|k| **k == kind)
            .count()
    }
}

/// Timers that only record; fire them by handing `TimerFired` to the session.
#[derive(Debug)]
pub struct ManualTimers {
    probe: TimerProbe,
}

impl ManualTimers {
    pub fn new() -> (Self, TimerProbe) {
        let probe = TimerProbe::default();
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }
}

impl TimerPort for ManualTimers {
    fn arm(&mut self, token: TimerToken, delay: Duration) {
        lock(&self.probe.log).armed.push((token, delay));
    }

    fn disarm(&mut self, kind: TimerKind) {
        lock(&self.probe.log).disarmed.push(kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::session_channel;

    #[test]
    fn auto_grant_posts_permission_then_started() {
        let (tx, mut rx) = session_channel();
        let (mut capture, probe) = PlaceholderCapture::auto_grant(tx);

        capture.request_permission(CaptureTicket(1));
        capture
            .begin(CaptureTicket(1), &CaptureSettings::default())
            .unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::capture(CaptureTicket(1), CaptureEvent::PermissionGranted)
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            SessionEvent::capture(CaptureTicket(1), CaptureEvent::Started)
        );
        assert_eq!(probe.active(), Some(CaptureTicket(1)));

        capture.end(CaptureTicket(1));
        assert_eq!(probe.active(), None);
        assert_eq!(probe.ends(), 1);
    }

    #[test]
    fn failing_synth_still_records() {
        let (mut synth, probe) = PlaceholderSynth::failing();
        let err = synth
            .speak(UtteranceId(1), "hello", &VoiceSettings::default())
            .unwrap_err();
        assert!(matches!(err, VoiceError::Synthesis(_)));
        assert_eq!(probe.spoken().len(), 1);
    }
}
