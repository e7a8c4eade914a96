//! Ping scheduling and server liveness

use crate::session::{Session, SessionSnapshot};
use shared::Command;
use std::time::{Duration, Instant};

/// Decides when a `Ping` is owed and whether the server still answers.
///
/// The monitor never reconnects on its own. It only exposes
/// [`Heartbeat::is_alive`]; the consumer decides what a stale server means.
#[derive(Debug, Clone, Copy)]
pub struct Heartbeat {
    interval: Duration,
    liveness_timeout: Duration,
}

impl Heartbeat {
    pub fn new(interval: Duration, liveness_timeout: Duration) -> Self {
        Self {
            interval,
            liveness_timeout,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn liveness_timeout(&self) -> Duration {
        self.liveness_timeout
    }

    /// Returns the ping to send if one is due, stamping the send time.
    ///
    /// Nothing is due before a player id is assigned. Callers driven by an
    /// interval pass the tick's deadline as `now`, so wake-up jitter cannot
    /// make a tick look early. The stamp is that `now`, so a stalled loop
    /// sends one ping rather than a burst of catch-up pings.
    pub fn poll(&self, session: &mut Session, now: Instant) -> Option<Command> {
        let player = session.player_id()?;

        let due = match session.last_ping_sent() {
            Some(last) => now.saturating_duration_since(last) >= self.interval,
            None => true,
        };
        if !due {
            return None;
        }

        session.record_ping(now);
        Some(Command::Ping { player })
    }

    pub fn is_alive(&self, snapshot: &SessionSnapshot, now: Instant) -> bool {
        snapshot.is_alive_at(now, self.liveness_timeout)
    }
}
