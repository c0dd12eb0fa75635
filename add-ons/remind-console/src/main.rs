//! Remind Console
//!
//! Rehearse a reminder call from a terminal. Typed lines stand in for the
//! caller's speech and replies are printed instead of spoken.
//!
//! ```text
//! remind-console profile.json
//!   <text>     final recognition result
//!   ~<text>    interim result (finalized after the debounce window)
//!   :start     resume listening after :stop
//!   :stop      stop listening and speaking
//!   :status    print the session snapshot
//!   :quit      end the session
//! ```

mod backends;

use anyhow::Context;
use backends::{open_ticket, ConsoleCapture, ConsoleSynth, OpenTicket};
use remind_voice::{
    spawn_session, CaptureEvent, ClientProfile, SessionConfig, SessionEvent, SessionHandle,
    SessionUpdate, SpeechCapture, SpeechSynth,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::{BroadcastStream, LinesStream};
use tokio_stream::StreamExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[remind-console] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = SessionConfig::load().context("load session config")?;
    let path = std::env::args()
        .nth(1)
        .context("usage: remind-console <profile.json>")?;
    let json = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("read client profile from {path}"))?;
    let profile = ClientProfile::from_json(&json)?;

    let open = OpenTicket::default();
    let capture_slot = open.clone();
    let (handle, task) = spawn_session(config, move |events| {
        let capture: Box<dyn SpeechCapture> =
            Box::new(ConsoleCapture::new(events.clone(), capture_slot));
        let synth: Box<dyn SpeechSynth> = Box::new(ConsoleSynth::new(events));
        (capture, synth)
    });

    let printer = tokio::spawn(print_updates(BroadcastStream::new(handle.subscribe())));
    handle.submit_profile(profile).await?;

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    loop {
        tokio::select! {
            line = lines.next() => match line {
                Some(Ok(line)) => {
                    if !dispatch(line.trim(), &handle, &open).await? {
                        break;
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    break;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("CTRL-C received; ending session");
                break;
            }
        }
    }

    handle.shutdown()?;
    task.await.context("session task")?;
    printer.abort();
    Ok(())
}

/// Act on one stdin line. Returns false when the user asked to quit.
async fn dispatch(line: &str, handle: &SessionHandle, open: &OpenTicket) -> anyhow::Result<bool> {
    match line {
        "" => {}
        ":quit" => return Ok(false),
        ":start" => handle.start()?,
        ":stop" => handle.stop()?,
        ":status" => {
            let snapshot = handle.snapshot().await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        text => {
            let Some(ticket) = open_ticket(open) else {
                println!("  (not listening)");
                return Ok(true);
            };
            let event = match text.strip_prefix('~') {
                Some(interim) => CaptureEvent::Interim(interim.trim().to_string()),
                None => CaptureEvent::Final(text.to_string()),
            };
            handle
                .events()
                .send(SessionEvent::capture(ticket, event))
                .context("session is gone")?;
        }
    }
    Ok(true)
}

async fn print_updates(mut updates: BroadcastStream<SessionUpdate>) {
    while let Some(update) = updates.next().await {
        match update {
            Ok(SessionUpdate::Entry(entry)) => println!("[{}] {}", entry.sender, entry.text),
            Ok(SessionUpdate::Status(status)) => println!("  ({status})"),
            Ok(SessionUpdate::State(state)) => tracing::debug!(%state, "session state"),
            Err(e) => tracing::warn!(error = %e, "update stream lagged"),
        }
    }
}
