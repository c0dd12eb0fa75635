//! Error types for the reminder voice session

use thiserror::Error;

/// Result type alias for voice session operations
pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors that can occur while driving a reminder call session
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("Speech recognition not supported on this platform")]
    CapabilityUnavailable,

    #[error("Speech recognition error: {0}")]
    CaptureTransient(String),

    #[error("Speech synthesis stalled: no completion after {waited_ms}ms")]
    SynthesisStall { waited_ms: u64 },

    #[error("Audio device busy: held by {holder}")]
    DeviceBusy { holder: String },

    #[error("Invalid client profile: {0}")]
    InvalidProfile(String),

    #[error("Response generation failed: {0}")]
    Responder(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel send error: {0}")]
    ChannelSend(String),

    #[error("Channel receive error: {0}")]
    ChannelReceive(String),

    #[error("Session is closed")]
    SessionClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for VoiceError {
    fn from(err: config::ConfigError) -> Self {
        VoiceError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for VoiceError {
    fn from(err: serde_json::Error) -> Self {
        VoiceError::InvalidProfile(err.to_string())
    }
}

/// Why a session ended up in the terminal `Error` state.
///
/// Both faults need something outside the session to change (permission
/// re-granted, a platform that supports recognition) before listening can
/// resume, so they are reported and never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionFault {
    PermissionDenied,
    CapabilityUnavailable,
}

impl std::fmt::Display for SessionFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionFault::PermissionDenied => write!(f, "microphone permission denied"),
            SessionFault::CapabilityUnavailable => write!(f, "speech recognition unavailable"),
        }
    }
}

impl From<SessionFault> for VoiceError {
    fn from(fault: SessionFault) -> Self {
        match fault {
            SessionFault::PermissionDenied => VoiceError::PermissionDenied,
            SessionFault::CapabilityUnavailable => VoiceError::CapabilityUnavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stall_message_names_the_wait() {
        let err = VoiceError::SynthesisStall { waited_ms: 15000 };
        assert_eq!(
            err.to_string(),
            "Speech synthesis stalled: no completion after 15000ms"
        );
    }

    #[test]
    fn fault_converts_to_matching_error() {
        assert!(matches!(
            VoiceError::from(SessionFault::PermissionDenied),
            VoiceError::PermissionDenied
        ));
        assert!(matches!(
            VoiceError::from(SessionFault::CapabilityUnavailable),
            VoiceError::CapabilityUnavailable
        ));
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<VoiceError>();
    }
}
