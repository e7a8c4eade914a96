//! Per-connection state shared between the receive loop and the consumer
//!
//! Only the receive task writes to a [`Session`] while the connection is
//! open: it assigns the player identity, latches the server address on the
//! handshake reply and stamps heartbeat times. The consumer reads
//! [`SessionSnapshot`] copies and never mutates the live session, except
//! through `Connection::disconnect` / `Connection::reconnect` once the
//! receive task has stopped.

use shared::PlayerId;
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

pub type SharedSession = Arc<RwLock<Session>>;

#[derive(Debug, Clone)]
pub struct Session {
    discovery_addr: SocketAddr,
    player_id: Option<PlayerId>,
    server_addr: SocketAddr,
    last_pong: Instant,
    last_ping_sent: Option<Instant>,
}

impl Session {
    pub fn new(discovery_addr: SocketAddr) -> Self {
        Self {
            discovery_addr,
            player_id: None,
            server_addr: discovery_addr,
            last_pong: Instant::now(),
            last_ping_sent: None,
        }
    }

    pub fn shared(discovery_addr: SocketAddr) -> SharedSession {
        Arc::new(RwLock::new(Self::new(discovery_addr)))
    }

    /// Back to the state of a freshly started client.
    pub fn reset(&mut self) {
        *self = Self::new(self.discovery_addr);
    }

    pub fn assign(&mut self, player_id: PlayerId) {
        self.player_id = Some(player_id);
    }

    pub fn latch_server(&mut self, addr: SocketAddr) {
        self.server_addr = addr;
    }

    pub fn record_pong(&mut self, at: Instant) {
        self.last_pong = at;
    }

    pub fn record_ping(&mut self, at: Instant) {
        self.last_ping_sent = Some(at);
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        self.player_id
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    pub fn last_ping_sent(&self) -> Option<Instant> {
        self.last_ping_sent
    }

    pub fn is_connected(&self) -> bool {
        self.player_id.is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            player_id: self.player_id,
            server_addr: self.server_addr,
            handshake_complete: self.server_addr != self.discovery_addr,
            last_pong: self.last_pong,
            last_ping_sent: self.last_ping_sent,
        }
    }
}

/// Point-in-time copy of a [`Session`] for readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub player_id: Option<PlayerId>,
    pub server_addr: SocketAddr,
    pub handshake_complete: bool,
    pub last_pong: Instant,
    pub last_ping_sent: Option<Instant>,
}

impl SessionSnapshot {
    pub fn is_connected(&self) -> bool {
        self.player_id.is_some()
    }

    /// True while less than `timeout` has passed since the last `Pong`.
    pub fn is_alive_at(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_pong) < timeout
    }
}

// A panic while holding the lock leaves plain data behind, so poisoning is ignored.
pub(crate) fn read(session: &SharedSession) -> RwLockReadGuard<'_, Session> {
    session.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write(session: &SharedSession) -> RwLockWriteGuard<'_, Session> {
    session.write().unwrap_or_else(PoisonError::into_inner)
}
