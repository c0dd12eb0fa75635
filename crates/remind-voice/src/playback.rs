//! Playback coordinator: speaks replies and hands the floor back to capture.
//!
//! Capture is always stopped before synthesis begins and restarted once the
//! utterance completes, so the agent never listens to itself. A watchdog
//! covers synthesizers that never report completion.

use crate::capture::CaptureCoordinator;
use crate::config::VoiceSettings;
use crate::error::{VoiceError, VoiceResult};
use crate::io::{SessionIo, STATUS_LISTENING, STATUS_SPEAKING};
use crate::platform::{SpeechSynth, TimerKind, UtteranceId};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakOutcome {
    /// Synthesis is running; completion arrives as `SpeechFinished(id)`.
    Playing(UtteranceId),
    /// The synthesizer refused the text; capture was restarted right away.
    Skipped,
}

pub struct PlaybackCoordinator {
    backend: Box<dyn SpeechSynth>,
    settings: VoiceSettings,
    next_id: u64,
    current: Option<(UtteranceId, Duration)>,
}

impl PlaybackCoordinator {
    pub fn new(backend: Box<dyn SpeechSynth>, settings: VoiceSettings) -> Self {
        Self {
            backend,
            settings,
            next_id: 1,
            current: None,
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<UtteranceId> {
        self.current.map(|(id, _)| id)
    }

    /// Stop capture, then hand `text` to the synthesizer.
    ///
    /// Errors only come from restarting capture after a rejected request.
    pub fn speak(
        &mut self,
        text: &str,
        capture: &mut CaptureCoordinator,
        io: &mut SessionIo,
    ) -> VoiceResult<SpeakOutcome> {
        capture.stop(io);
        self.cancel(io);

        let id = UtteranceId(self.next_id);
        self.next_id += 1;
        io.status.set(STATUS_SPEAKING);
        io.device.claim_playback(id)?;

        match self.backend.speak(id, text, &self.settings) {
            Ok(()) => {
                let deadline = self.settings.watchdog_for(text);
                io.timers.arm(TimerKind::Watchdog, deadline);
                self.current = Some((id, deadline));
                info!(utterance = %id, chars = text.chars().count(), "🔊 Speaking");
                Ok(SpeakOutcome::Playing(id))
            }
            Err(e) => {
                warn!(utterance = %id, error = %e, "synthesizer rejected reply; resuming capture");
                io.device.release_playback(id);
                io.status.set(STATUS_LISTENING);
                capture.start(io)?;
                Ok(SpeakOutcome::Skipped)
            }
        }
    }

    /// Synthesis finished. Returns false for an utterance that is no longer current.
    pub fn complete(
        &mut self,
        id: UtteranceId,
        capture: &mut CaptureCoordinator,
        io: &mut SessionIo,
    ) -> VoiceResult<bool> {
        match self.current {
            Some((current, _)) if current == id => {}
            _ => {
                debug!(utterance = %id, "stale completion ignored");
                return Ok(false);
            }
        }
        self.current = None;
        io.timers.disarm(TimerKind::Watchdog);
        io.device.release_playback(id);
        info!(utterance = %id, "playback complete");
        io.status.set(STATUS_LISTENING);
        capture.start(io)?;
        Ok(true)
    }

    /// The completion deadline passed. Cancels synthesis and resumes capture
    /// as if it had finished.
    pub fn on_watchdog(
        &mut self,
        capture: &mut CaptureCoordinator,
        io: &mut SessionIo,
    ) -> VoiceResult<bool> {
        let Some((id, deadline)) = self.current else {
            return Ok(false);
        };
        let stall = VoiceError::SynthesisStall {
            waited_ms: deadline.as_millis() as u64,
        };
        warn!(utterance = %id, error = %stall, "forcing playback to finish");
        self.backend.cancel(id);
        self.complete(id, capture, io)
    }

    /// Cancel any in-flight utterance and release the device.
    pub fn cancel(&mut self, io: &mut SessionIo) {
        io.timers.disarm(TimerKind::Watchdog);
        if let Some((id, _)) = self.current.take() {
            debug!(utterance = %id, "cancelling playback");
            self.backend.cancel(id);
            io.device.release_playback(id);
        }
    }
}
