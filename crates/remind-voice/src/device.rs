//! Exclusive ownership of the audio device.
//!
//! Capture and playback never run at the same time. Every claim goes through
//! [`AudioDevice`], which holds at most one of them and refuses the other.

use crate::error::{VoiceError, VoiceResult};
use crate::platform::{CaptureTicket, UtteranceId};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioOwner {
    #[default]
    Free,
    Capture(CaptureTicket),
    Playback(UtteranceId),
}

impl std::fmt::Display for AudioOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioOwner::Free => write!(f, "nobody"),
            AudioOwner::Capture(t) => write!(f, "{t}"),
            AudioOwner::Playback(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct AudioDevice {
    owner: AudioOwner,
}

impl AudioDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(&self) -> AudioOwner {
        self.owner
    }

    pub fn is_free(&self) -> bool {
        self.owner == AudioOwner::Free
    }

    /// Claim for capture. Re-claiming with the same ticket is a no-op.
    pub fn claim_capture(&mut self, ticket: CaptureTicket) -> VoiceResult<()> {
        match self.owner {
            AudioOwner::Free => {
                self.owner = AudioOwner::Capture(ticket);
                debug!(%ticket, "audio device claimed for capture");
                Ok(())
            }
            AudioOwner::Capture(held) if held == ticket => Ok(()),
            held => Err(VoiceError::DeviceBusy {
                holder: held.to_string(),
            }),
        }
    }

    /// Claim for playback. Re-claiming with the same id is a no-op.
    pub fn claim_playback(&mut self, id: UtteranceId) -> VoiceResult<()> {
        match self.owner {
            AudioOwner::Free => {
                self.owner = AudioOwner::Playback(id);
                debug!(utterance = %id, "audio device claimed for playback");
                Ok(())
            }
            AudioOwner::Playback(held) if held == id => Ok(()),
            held => Err(VoiceError::DeviceBusy {
                holder: held.to_string(),
            }),
        }
    }

    /// Release a capture claim; a stale ticket leaves the device untouched.
    pub fn release_capture(&mut self, ticket: CaptureTicket) {
        if self.owner == AudioOwner::Capture(ticket) {
            self.owner = AudioOwner::Free;
        }
    }

    /// Release a playback claim; a stale id leaves the device untouched.
    pub fn release_playback(&mut self, id: UtteranceId) {
        if self.owner == AudioOwner::Playback(id) {
            self.owner = AudioOwner::Free;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_blocks_playback() {
        let mut device = AudioDevice::new();
        device.claim_capture(CaptureTicket(1)).unwrap();
        let err = device.claim_playback(UtteranceId(1)).unwrap_err();
        assert!(matches!(err, VoiceError::DeviceBusy { .. }));
        assert_eq!(device.owner(), AudioOwner::Capture(CaptureTicket(1)));
    }

    #[test]
    fn playback_blocks_capture() {
        let mut device = AudioDevice::new();
        device.claim_playback(UtteranceId(4)).unwrap();
        assert!(device.claim_capture(CaptureTicket(2)).is_err());
        device.release_playback(UtteranceId(4));
        assert!(device.claim_capture(CaptureTicket(2)).is_ok());
    }

    #[test]
    fn stale_release_is_ignored() {
        let mut device = AudioDevice::new();
        device.claim_capture(CaptureTicket(2)).unwrap();
        device.release_capture(CaptureTicket(1));
        device.release_playback(UtteranceId(2));
        assert_eq!(device.owner(), AudioOwner::Capture(CaptureTicket(2)));
        device.release_capture(CaptureTicket(2));
        assert!(device.is_free());
    }

    #[test]
    fn reclaim_by_same_holder_is_noop() {
        let mut device = AudioDevice::new();
        device.claim_capture(CaptureTicket(9)).unwrap();
        assert!(device.claim_capture(CaptureTicket(9)).is_ok());
        assert!(device.claim_capture(CaptureTicket(10)).is_err());
    }
}
