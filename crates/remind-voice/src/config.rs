//! Session configuration: timing windows, voice settings and responder rules.
//!
//! Precedence (lowest first): built-in defaults, the TOML file named by
//! `REMIND_CONFIG` (default `config/session`, optional), then environment
//! variables prefixed `REMIND` with `__` as the section separator.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | REMIND__CAPTURE__LOCALE | en-IN | Recognition locale. |
//! | REMIND__CAPTURE__DEBOUNCE_MS | 3000 | Silence after an interim result before the utterance is finalized. |
//! | REMIND__CAPTURE__RESTART_DELAY_MS | 500 | Delay before capture restarts after the platform ends a session. |
//! | REMIND__CAPTURE__RESTART_BACKOFF_MAX_MS | 8000 | Cap for the doubling restart delay. |
//! | REMIND__CAPTURE__MAX_CONSECUTIVE_RESTARTS | 8 | Platform ends without any result before listening is paused. |
//! | REMIND__PLAYBACK__LOCALE | en-IN | Synthesis locale. |
//! | REMIND__PLAYBACK__RATE | 0.9 | Synthesis speaking rate. |
//! | REMIND__PLAYBACK__WATCHDOG_BASE_MS | 15000 | Fixed part of the synthesis watchdog. |
//! | REMIND__PLAYBACK__WATCHDOG_PER_CHAR_MS | 120 | Per-character allowance added to the watchdog. |
//! | REMIND__RESPONDER__ACCEPT_THANKS_AS_FAREWELL | false | Treat "thank you" like "bye". |

use crate::error::{VoiceError, VoiceResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default config file stem (extension resolved by the `config` crate).
pub const DEFAULT_CONFIG_PATH: &str = "config/session";

/// Env var naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "REMIND_CONFIG";

/// Recognition settings and the listening timing policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub locale: String,
    /// Always true for reminder calls; kept explicit so backends can assert it.
    pub continuous: bool,
    pub interim_results: bool,
    pub debounce_ms: u64,
    pub restart_delay_ms: u64,
    pub restart_backoff_max_ms: u64,
    pub max_consecutive_restarts: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            locale: "en-IN".to_string(),
            continuous: true,
            interim_results: true,
            debounce_ms: 3000,
            restart_delay_ms: 500,
            restart_backoff_max_ms: 8000,
            max_consecutive_restarts: 8,
        }
    }
}

impl CaptureSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Delay before the `attempt`-th consecutive restart (1-based).
    ///
    /// Doubles from `restart_delay_ms` and saturates at `restart_backoff_max_ms`.
    pub fn restart_delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let ms = self
            .restart_delay_ms
            .saturating_mul(1u64 << shift)
            .min(self.restart_backoff_max_ms.max(self.restart_delay_ms));
        Duration::from_millis(ms)
    }
}

/// Synthesis settings and the stall watchdog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub locale: String,
    pub rate: f32,
    pub watchdog_base_ms: u64,
    pub watchdog_per_char_ms: u64,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            locale: "en-IN".to_string(),
            rate: 0.9,
            watchdog_base_ms: 15_000,
            watchdog_per_char_ms: 120,
        }
    }
}

impl VoiceSettings {
    /// How long to wait for a completion callback before declaring a stall.
    pub fn watchdog_for(&self, text: &str) -> Duration {
        let chars = text.chars().count() as u64;
        Duration::from_millis(
            self.watchdog_base_ms
                .saturating_add(self.watchdog_per_char_ms.saturating_mul(chars)),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponderSettings {
    pub accept_thanks_as_farewell: bool,
}

/// Everything a reminder session needs to know before it starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub capture: CaptureSettings,
    pub playback: VoiceSettings,
    pub responder: ResponderSettings,
}

impl SessionConfig {
    /// Load from `REMIND_CONFIG` (or `config/session`) and the environment.
    pub fn load() -> VoiceResult<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load with an explicit file path; a missing file falls back to defaults.
    pub fn load_from(path: &str) -> VoiceResult<Self> {
        let built = config::Config::builder()
            .add_source(config::Config::try_from(&SessionConfig::default())?)
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("REMIND")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: SessionConfig = built.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> VoiceResult<()> {
        if self.capture.debounce_ms == 0 {
            return Err(VoiceError::Config(
                "capture.debounce_ms must be greater than zero".to_string(),
            ));
        }
        if self.capture.restart_delay_ms == 0 {
            return Err(VoiceError::Config(
                "capture.restart_delay_ms must be greater than zero".to_string(),
            ));
        }
        if self.capture.locale.trim().is_empty() || self.playback.locale.trim().is_empty() {
            return Err(VoiceError::Config("locale must not be empty".to_string()));
        }
        if !(0.1..=10.0).contains(&self.playback.rate) {
            return Err(VoiceError::Config(format!(
                "playback.rate must be within 0.1..=10.0, got {}",
                self.playback.rate
            )));
        }
        if self.playback.watchdog_base_ms == 0 {
            return Err(VoiceError::Config(
                "playback.watchdog_base_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reminder_page_timings() {
        let c = SessionConfig::default();
        assert_eq!(c.capture.debounce(), Duration::from_millis(3000));
        assert_eq!(c.capture.restart_delay(1), Duration::from_millis(500));
        assert_eq!(c.capture.locale, "en-IN");
        assert!(c.capture.continuous && c.capture.interim_results);
        assert!((c.playback.rate - 0.9).abs() < 1e-6);
        assert!(!c.responder.accept_thanks_as_farewell);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn restart_delay_doubles_then_saturates() {
        let c = CaptureSettings::default();
        assert_eq!(c.restart_delay(2), Duration::from_millis(1000));
        assert_eq!(c.restart_delay(3), Duration::from_millis(2000));
        assert_eq!(c.restart_delay(5), Duration::from_millis(8000));
        assert_eq!(c.restart_delay(40), Duration::from_millis(8000));
    }

    #[test]
    fn watchdog_grows_with_text_length() {
        let v = VoiceSettings::default();
        assert_eq!(v.watchdog_for(""), Duration::from_millis(15_000));
        assert_eq!(v.watchdog_for("abcd"), Duration::from_millis(15_480));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut c = SessionConfig::default();
        c.capture.debounce_ms = 0;
        assert!(c.validate().is_err());

        let mut c = SessionConfig::default();
        c.playback.rate = 0.0;
        assert!(c.validate().is_err());

        let mut c = SessionConfig::default();
        c.capture.locale = "  ".to_string();
        assert!(c.validate().is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let c = SessionConfig::load_from("does/not/exist/session").unwrap();
        assert_eq!(c.capture.locale, "en-IN");
        assert_eq!(c.capture.max_consecutive_restarts, 8);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        std::fs::write(
            &path,
            "[capture]\ndebounce_ms = 1200\n\n[responder]\naccept_thanks_as_farewell = true\n",
        )
        .unwrap();

        let c = SessionConfig::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(c.capture.debounce_ms, 1200);
        assert!(c.responder.accept_thanks_as_farewell);
        // untouched keys keep their defaults
        assert_eq!(c.capture.restart_delay_ms, 500);
    }

    #[test]
    fn invalid_file_value_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[playback]\nrate = 42.0\n").unwrap();

        let err = SessionConfig::load_from(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, VoiceError::Config(_)));
    }

    #[test]
    fn environment_overrides_file() {
        std::env::set_var("REMIND__PLAYBACK__WATCHDOG_PER_CHAR_MS", "75");
        let c = SessionConfig::load_from("does/not/exist/session").unwrap();
        std::env::remove_var("REMIND__PLAYBACK__WATCHDOG_PER_CHAR_MS");
        assert_eq!(c.playback.watchdog_per_char_ms, 75);
    }
}
