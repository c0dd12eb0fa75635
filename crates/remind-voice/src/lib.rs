//! # Remind Voice - Turn-Taking Session Controller
//!
//! This crate runs the voice side of an EMI reminder call: it listens to the
//! caller, decides when an utterance is complete, answers with fixed keyword
//! rules and speaks the answer, turn after turn, without capture and playback
//! ever overlapping.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Session Runtime (tokio)                    │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
//! │  │   Capture    │→ │   Session    │→ │  Responder   │      │
//! │  │ (3s debounce)│  │  Controller  │  │  (keywords)  │      │
//! │  └──────────────┘  └──────────────┘  └──────────────┘      │
//! │         ↑                 ↓                  ↓              │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
//! │  │ Audio Device │← │   Playback   │← │  Transcript  │      │
//! │  │    Guard     │  │  (watchdog)  │  │ (append-only)│      │
//! │  └──────────────┘  └──────────────┘  └──────────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Platform speech services plug in through [`SpeechCapture`],
//! [`SpeechSynth`] and [`TimerPort`]; their callbacks come back as
//! [`SessionEvent`]s.

pub mod capture;
pub mod config;
pub mod device;
pub mod error;
pub mod greeting;
pub mod io;
pub mod placeholder;
pub mod platform;
pub mod playback;
pub mod profile;
pub mod responder;
pub mod runtime;
pub mod session;
pub mod timers;
pub mod transcript;

pub use capture::{CaptureCoordinator, CaptureOutcome, PendingUtterance};
pub use config::{CaptureSettings, ResponderSettings, SessionConfig, VoiceSettings};
pub use device::{AudioDevice, AudioOwner};
pub use error::{SessionFault, VoiceError, VoiceResult};
pub use greeting::{days_until_due, greeting};
pub use placeholder::{
    CaptureProbe, ManualTimers, PlaceholderCapture, PlaceholderSynth, SynthProbe, TimerProbe,
};
pub use platform::{
    session_channel, CaptureErrorKind, CaptureEvent, CaptureTicket, EventReceiver, EventSender,
    SessionEvent, SpeechCapture, SpeechSynth, TimerKind, TimerPort, TimerToken, UtteranceId,
};
pub use playback::{PlaybackCoordinator, SpeakOutcome};
pub use profile::{rupees, ClientProfile};
pub use responder::{generate, KeywordResponder, Responder, APOLOGY, NO_PROFILE_PROMPT};
pub use runtime::{spawn_session, SessionCommand, SessionHandle, SessionRunner};
pub use session::{SessionController, SessionSnapshot, SessionState, SessionUpdate, SingleFlight};
pub use timers::{TimerSet, TokioTimers};
pub use transcript::{ConversationEntry, Sender, Transcript};
