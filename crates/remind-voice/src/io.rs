//! Per-session resources shared by the capture and playback coordinators.

use crate::device::AudioDevice;
use crate::timers::TimerSet;

pub const STATUS_IDLE: &str = "Idle";
pub const STATUS_LISTENING: &str = "Listening...";
pub const STATUS_SPEAKING: &str = "Speaking...";
pub const STATUS_ENDED: &str = "Stopped";
pub const STATUS_STOPPED: &str = "Stopped.";
pub const STATUS_PERMISSION_DENIED: &str = "Microphone permission denied.";
pub const STATUS_ACCESS_REVOKED: &str = "Microphone access denied.";
pub const STATUS_UNSUPPORTED: &str = "Speech recognition not supported";
pub const STATUS_PAUSED: &str = "Listening paused";

/// Human-readable status shown next to the transcript.
#[derive(Debug)]
pub struct StatusLine {
    text: String,
    changed: bool,
}

impl Default for StatusLine {
    fn default() -> Self {
        Self {
            text: STATUS_IDLE.to_string(),
            changed: false,
        }
    }
}

impl StatusLine {
    pub fn set(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text != self.text {
            self.text = text;
            self.changed = true;
        }
    }

    pub fn get(&self) -> &str {
        &self.text
    }

    /// The current text if it changed since the last call.
    pub fn take_changed(&mut self) -> Option<String> {
        if std::mem::take(&mut self.changed) {
            Some(self.text.clone())
        } else {
            None
        }
    }
}

pub struct SessionIo {
    pub device: AudioDevice,
    pub timers: TimerSet,
    pub status: StatusLine,
}

impl SessionIo {
    pub fn new(timers: TimerSet) -> Self {
        Self {
            device: AudioDevice::new(),
            timers,
            status: StatusLine::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_reports_only_real_changes() {
        let mut status = StatusLine::default();
        assert_eq!(status.get(), STATUS_IDLE);
        assert_eq!(status.take_changed(), None);

        status.set(STATUS_LISTENING);
        status.set(STATUS_LISTENING);
        assert_eq!(status.take_changed().as_deref(), Some(STATUS_LISTENING));
        assert_eq!(status.take_changed(), None);

        status.set(STATUS_IDLE);
        status.set(STATUS_LISTENING);
        assert_eq!(status.take_changed().as_deref(), Some(STATUS_LISTENING));
    }
}
