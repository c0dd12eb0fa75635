//! Generation-tagged one-shot timers.
//!
//! [`TimerSet`] remembers the one live token per [`TimerKind`]. A firing whose
//! token is not the live one (disarmed, superseded, or from a torn-down
//! session) is stale and must be ignored.

use crate::platform::{EventSender, SessionEvent, TimerKind, TimerPort, TimerToken};
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

pub struct TimerSet {
    port: Box<dyn TimerPort>,
    next_generation: u64,
    live: HashMap<TimerKind, TimerToken>,
}

impl TimerSet {
    pub fn new(port: Box<dyn TimerPort>) -> Self {
        Self {
            port,
            next_generation: 1,
            live: HashMap::new(),
        }
    }

    /// Arm `kind`, superseding any live timer of the same kind.
    pub fn arm(&mut self, kind: TimerKind, delay: Duration) -> TimerToken {
        let token = TimerToken {
            kind,
            generation: self.next_generation,
        };
        self.next_generation += 1;
        self.port.disarm(kind);
        self.live.insert(kind, token);
        self.port.arm(token, delay);
        debug!(?kind, generation = token.generation, ?delay, "timer armed");
        token
    }

    pub fn disarm(&mut self, kind: TimerKind) {
        if self.live.remove(&kind).is_some() {
            self.port.disarm(kind);
        }
    }

    pub fn disarm_all(&mut self) {
        for kind in [TimerKind::Debounce, TimerKind::Restart, TimerKind::Watchdog] {
            self.disarm(kind);
        }
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.live.contains_key(&kind)
    }

    /// Consume a firing. True only for the live token, which is then cleared.
    pub fn take_fired(&mut self, token: TimerToken) -> bool {
        match self.live.get(&token.kind) {
            Some(live) if *live == token => {
                self.live.remove(&token.kind);
                true
            }
            _ => false,
        }
    }
}

/// Tokio implementation: each timer is a spawned sleep that posts
/// `TimerFired` into the session channel. Disarming aborts the task.
pub struct TokioTimers {
    events: EventSender,
    tasks: HashMap<TimerKind, JoinHandle<()>>,
}

impl TokioTimers {
    pub fn new(events: EventSender) -> Self {
        Self {
            events,
            tasks: HashMap::new(),
        }
    }
}

impl TimerPort for TokioTimers {
    fn arm(&mut self, token: TimerToken, delay: Duration) {
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Session gone means nobody is left to care about the firing.
            let _ = events.send(SessionEvent::TimerFired(token));
        });
        if let Some(previous) = self.tasks.insert(token.kind, handle) {
            previous.abort();
        }
    }

    fn disarm(&mut self, kind: TimerKind) {
        if let Some(task) = self.tasks.remove(&kind) {
            task.abort();
        }
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
