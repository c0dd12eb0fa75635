//! Terminal stand-ins for the platform speech services.
//!
//! Capture is "granted" at once and stays open until the session ends it;
//! lines typed on stdin are posted as results for the open ticket. The
//! synthesizer prints the reply and reports completion after roughly the time
//! it would take to say it.

use remind_voice::{
    CaptureSettings, CaptureTicket, CaptureEvent, EventSender, SessionEvent, SpeechCapture,
    SpeechSynth, UtteranceId, VoiceError, VoiceResult, VoiceSettings,
};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Speaking time per character at rate 1.0.
const MS_PER_CHAR: f64 = 55.0;

/// Ticket of the capture session currently open, shared with the stdin reader.
pub type OpenTicket = Arc<Mutex<Option<CaptureTicket>>>;

pub fn open_ticket(slot: &OpenTicket) -> Option<CaptureTicket> {
    *slot.lock().unwrap_or_else(PoisonError::into_inner)
}

fn set_ticket(slot: &OpenTicket, value: Option<CaptureTicket>) {
    *slot.lock().unwrap_or_else(PoisonError::into_inner) = value;
}

pub struct ConsoleCapture {
    events: EventSender,
    open: OpenTicket,
}

impl ConsoleCapture {
    pub fn new(events: EventSender, open: OpenTicket) -> Self {
        Self { events, open }
    }

    fn post(&self, ticket: CaptureTicket, event: CaptureEvent) -> VoiceResult<()> {
        self.events
            .send(SessionEvent::capture(ticket, event))
            .map_err(|e| VoiceError::ChannelSend(e.to_string()))
    }
}

impl SpeechCapture for ConsoleCapture {
    fn request_permission(&mut self, ticket: CaptureTicket) {
        if let Err(e) = self.post(ticket, CaptureEvent::PermissionGranted) {
            debug!(error = %e, "session gone before permission grant");
        }
    }

    fn begin(&mut self, ticket: CaptureTicket, settings: &CaptureSettings) -> VoiceResult<()> {
        debug!(%ticket, locale = %settings.locale, "console capture open");
        set_ticket(&self.open, Some(ticket));
        self.post(ticket, CaptureEvent::Started)
    }

    fn end(&mut self, ticket: CaptureTicket) {
        if open_ticket(&self.open) == Some(ticket) {
            set_ticket(&self.open, None);
        }
    }
}

pub struct ConsoleSynth {
    events: EventSender,
    speaking: Option<(UtteranceId, JoinHandle<()>)>,
}

impl ConsoleSynth {
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            speaking: None,
        }
    }
}

fn speaking_time(text: &str, rate: f32) -> Duration {
    let chars = text.chars().count() as f64;
    let rate = f64::from(rate).max(0.1);
    Duration::from_millis((chars * MS_PER_CHAR / rate) as u64)
}

impl SpeechSynth for ConsoleSynth {
    fn speak(&mut self, id: UtteranceId, text: &str, settings: &VoiceSettings) -> VoiceResult<()> {
        println!("🔊 {text}");
        let events = self.events.clone();
        let delay = speaking_time(text, settings.rate);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(SessionEvent::SpeechFinished(id));
        });
        if let Some((_, previous)) = self.speaking.replace((id, task)) {
            previous.abort();
        }
        Ok(())
    }

    fn cancel(&mut self, id: UtteranceId) {
        if let Some((current, task)) = self.speaking.take() {
            if current == id {
                task.abort();
            } else {
                self.speaking = Some((current, task));
            }
        }
    }
}

impl Drop for ConsoleSynth {
    fn drop(&mut self) {
        if let Some((_, task)) = self.speaking.take() {
            task.abort();
        }
    }
}
