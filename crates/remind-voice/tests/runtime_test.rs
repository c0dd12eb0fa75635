//! Session runtime on a paused tokio clock with real timers.

use chrono::{Duration as Days, NaiveDate};
use remind_voice::{
    session_channel, CaptureEvent, CaptureProbe, ClientProfile, PlaceholderCapture,
    PlaceholderSynth, Sender, SessionConfig, SessionController, SessionEvent, SessionHandle,
    SessionRunner, SessionState, SessionUpdate, SynthProbe, TokioTimers, VoiceError,
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_test::{assert_err, assert_ok};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
}

fn asha() -> ClientProfile {
    ClientProfile::new("Asha", "9876543210", 5000.0, 1200.0, today() + Days::days(5))
}

struct Running {
    handle: SessionHandle,
    task: JoinHandle<()>,
    capture: CaptureProbe,
    synth: SynthProbe,
}

fn spawn() -> Running {
    let (tx, rx) = session_channel();
    let (capture, capture_probe) = PlaceholderCapture::auto_grant(tx.clone());
    let (synth, synth_probe) = PlaceholderSynth::new();
    let timers = TokioTimers::new(tx.clone());
    let controller = SessionController::new(
        SessionConfig::default(),
        Box::new(capture),
        Box::new(synth),
        Box::new(timers),
    )
    .with_today(today());
    let (runner, handle) = SessionRunner::new(controller, tx, rx);
    Running {
        handle,
        task: runner.spawn(),
        capture: capture_probe,
        synth: synth_probe,
    }
}

/// Let the runner drain everything that is already queued.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

impl Running {
    async fn finish_speaking(&self) {
        let (id, _) = self.synth.last().expect("nothing was spoken");
        assert_ok!(self.handle.events().send(SessionEvent::SpeechFinished(id)));
        settle().await;
    }

    async fn say(&self, event: CaptureEvent) {
        let ticket = self.capture.active().expect("capture is not open");
        assert_ok!(self.handle.events().send(SessionEvent::capture(ticket, event)));
        settle().await;
    }

    async fn entries(&self) -> usize {
        self.handle.snapshot().await.unwrap().entries.len()
    }
}

#[tokio::test(start_paused = true)]
async fn test_greeting_then_listening() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let session = spawn();

    assert_ok!(session.handle.submit_profile(asha()).await);
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, SessionState::Speaking);
    assert_eq!(snapshot.entries.len(), 2);
    assert_eq!(snapshot.status, "Speaking...");

    session.finish_speaking().await;
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, SessionState::Listening);
    assert!(snapshot.listening);
    assert_eq!(snapshot.status, "Listening...");
}

#[tokio::test(start_paused = true)]
async fn test_debounce_window_on_real_timers() {
    let session = spawn();
    assert_ok!(session.handle.submit_profile(asha()).await);
    session.finish_speaking().await;

    session.say(CaptureEvent::Interim("what is my".into())).await;
    tokio::time::sleep(Duration::from_millis(2000)).await;
    session.say(CaptureEvent::Interim("what is my balance".into())).await;

    // 3s after the first interim, but only 2s after the second.
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(session.entries().await, 2);

    tokio::time::sleep(Duration::from_millis(2500)).await;
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.entries.len(), 4);
    assert_eq!(snapshot.entries[2].text, "what is my balance");
    assert_eq!(snapshot.entries[3].text, "Your total due amount is ₹5000.");
    assert_eq!(snapshot.state, SessionState::Speaking);
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_fires_without_completion() {
    let session = spawn();
    assert_ok!(session.handle.submit_profile(asha()).await);
    let greeting_len = session.synth.last().unwrap().1.chars().count() as u64;

    tokio::time::sleep(Duration::from_millis(15_000 + 120 * greeting_len - 100)).await;
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, SessionState::Speaking);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, SessionState::Listening);
    assert_eq!(session.synth.cancelled().len(), 1);
    assert!(snapshot.listening);
}

#[tokio::test(start_paused = true)]
async fn test_platform_end_restarts_after_delay() {
    let session = spawn();
    assert_ok!(session.handle.submit_profile(asha()).await);
    session.finish_speaking().await;
    let first = session.capture.active().unwrap();

    session.say(CaptureEvent::Ended).await;
    assert!(!session.handle.snapshot().await.unwrap().listening);

    tokio::time::sleep(Duration::from_millis(600)).await;
    let snapshot = session.handle.snapshot().await.unwrap();
    assert!(snapshot.listening);
    assert_ne!(session.capture.active(), Some(first));
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_transcript_in_order() {
    let session = spawn();
    let mut updates = session.handle.subscribe();

    assert_ok!(session.handle.submit_profile(asha()).await);
    session.finish_speaking().await;
    session.say(CaptureEvent::Final("bye".into())).await;

    let mut senders = Vec::new();
    while let Ok(update) = updates.try_recv() {
        if let SessionUpdate::Entry(entry) = update {
            senders.push(entry.sender);
        }
    }
    assert_eq!(
        senders,
        vec![Sender::System, Sender::Agent, Sender::User, Sender::Agent]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_and_start_commands() {
    let session = spawn();
    assert_ok!(session.handle.submit_profile(asha()).await);
    session.finish_speaking().await;

    assert_ok!(session.handle.stop());
    assert_ok!(session.handle.stop());
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, SessionState::Stopped);
    assert!(!snapshot.listening);

    assert_ok!(session.handle.start());
    settle().await;
    let snapshot = session.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, SessionState::Listening);
    assert!(snapshot.listening);
    assert_eq!(snapshot.entries.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_profile_is_reported() {
    let session = spawn();
    let mut profile = asha();
    profile.total_due = -1.0;

    let err = session.handle.submit_profile(profile).await.unwrap_err();
    assert!(matches!(err, VoiceError::InvalidProfile(_)));
    assert_eq!(session.entries().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_handle() {
    let session = spawn();
    assert_ok!(session.handle.submit_profile(asha()).await);
    session.finish_speaking().await;

    assert_ok!(session.handle.shutdown());
    assert_ok!(session.task.await);

    assert!(session.capture.active().is_none());
    assert_err!(session.handle.start());
    assert!(matches!(
        session.handle.snapshot().await,
        Err(VoiceError::SessionClosed)
    ));
}
