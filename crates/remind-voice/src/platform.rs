//! Host platform seams: speech capture, speech synthesis and timers.
//!
//! Platform callbacks never touch the session directly. Each one becomes a
//! typed [`SessionEvent`] tagged with the capture ticket, utterance id or
//! timer token it belongs to, and the controller drops anything whose tag is
//! no longer current.

use crate::config::{CaptureSettings, VoiceSettings};
use crate::error::VoiceResult;
use std::time::Duration;
use tokio::sync::mpsc;

/// Identifies one capture session, from permission probe to end event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaptureTicket(pub u64);

impl std::fmt::Display for CaptureTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "capture#{}", self.0)
    }
}

/// Identifies one synthesis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

impl std::fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "utterance#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Silence window after an interim result.
    Debounce,
    /// Re-open capture after the platform ended a session.
    Restart,
    /// Synthesis completion deadline.
    Watchdog,
}

/// One armed timer. A later `arm` of the same kind supersedes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken {
    pub kind: TimerKind,
    pub generation: u64,
}

/// Recognition errors as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureErrorKind {
    PermissionRevoked,
    NoSpeech,
    Aborted,
    AudioCapture,
    Network,
    Other(String),
}

impl CaptureErrorKind {
    /// Map a Web Speech style error code.
    pub fn from_platform(code: &str) -> Self {
        match code.trim() {
            "not-allowed" | "service-not-allowed" => CaptureErrorKind::PermissionRevoked,
            "no-speech" => CaptureErrorKind::NoSpeech,
            "aborted" => CaptureErrorKind::Aborted,
            "audio-capture" => CaptureErrorKind::AudioCapture,
            "network" => CaptureErrorKind::Network,
            other => CaptureErrorKind::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for CaptureErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureErrorKind::PermissionRevoked => write!(f, "not-allowed"),
            CaptureErrorKind::NoSpeech => write!(f, "no-speech"),
            CaptureErrorKind::Aborted => write!(f, "aborted"),
            CaptureErrorKind::AudioCapture => write!(f, "audio-capture"),
            CaptureErrorKind::Network => write!(f, "network"),
            CaptureErrorKind::Other(code) => write!(f, "{code}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    PermissionGranted,
    PermissionDenied,
    Started,
    Interim(String),
    Final(String),
    Error(CaptureErrorKind),
    Ended,
}

/// Everything the platform can tell a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Capture {
        ticket: CaptureTicket,
        event: CaptureEvent,
    },
    SpeechFinished(UtteranceId),
    TimerFired(TimerToken),
}

impl SessionEvent {
    pub fn capture(ticket: CaptureTicket, event: CaptureEvent) -> Self {
        SessionEvent::Capture { ticket, event }
    }
}

pub type EventSender = mpsc::UnboundedSender<SessionEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Channel platform adapters use to deliver callbacks to a session.
pub fn session_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Continuous speech-to-text service.
pub trait SpeechCapture: Send {
    /// False when the platform has no recognition support at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Probe microphone access. The answer arrives later as
    /// `PermissionGranted` or `PermissionDenied` for `ticket`; the probe's
    /// own audio resources must be released before granting.
    fn request_permission(&mut self, ticket: CaptureTicket);

    /// Open a recognition session. Events for it must carry `ticket`.
    fn begin(&mut self, ticket: CaptureTicket, settings: &CaptureSettings) -> VoiceResult<()>;

    /// Close the session. Must tolerate tickets that already ended.
    fn end(&mut self, ticket: CaptureTicket);
}

/// Text-to-speech service.
pub trait SpeechSynth: Send {
    /// Start speaking; completion arrives as `SpeechFinished(id)`.
    fn speak(&mut self, id: UtteranceId, text: &str, settings: &VoiceSettings) -> VoiceResult<()>;

    fn cancel(&mut self, id: UtteranceId);
}

/// One-shot timer service; firing arrives as `TimerFired(token)`.
pub trait TimerPort: Send {
    fn arm(&mut self, token: TimerToken, delay: Duration);

    fn disarm(&mut self, kind: TimerKind);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_platform_error_codes() {
        assert_eq!(
            CaptureErrorKind::from_platform("not-allowed"),
            CaptureErrorKind::PermissionRevoked
        );
        assert_eq!(
            CaptureErrorKind::from_platform("service-not-allowed"),
            CaptureErrorKind::PermissionRevoked
        );
        assert_eq!(
            CaptureErrorKind::from_platform("no-speech"),
            CaptureErrorKind::NoSpeech
        );
        assert_eq!(
            CaptureErrorKind::from_platform("bad-grammar"),
            CaptureErrorKind::Other("bad-grammar".to_string())
        );
        assert_eq!(CaptureErrorKind::Network.to_string(), "network");
    }

    #[test]
    fn ids_display_with_kind() {
        assert_eq!(CaptureTicket(3).to_string(), "capture#3");
        assert_eq!(UtteranceId(7).to_string(), "utterance#7");
    }
}
