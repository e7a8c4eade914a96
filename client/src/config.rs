//! Client tunables, defaulting to the values the server is built around

use shared::{
    broadcast_addr, DISCONNECT_REPEAT, DISCOVERY_INTERVAL_MS, HEARTBEAT_INTERVAL_MS,
    LIVENESS_TIMEOUT_MS, MAX_DATAGRAM_SIZE, PHASE_DWELL_SECS, RECEIVE_TIMEOUT_MS,
    SEARCH_TIMEOUT_SECS,
};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Where `Conexion` goes until the server answers `OK`.
    pub discovery_addr: SocketAddr,
    pub bind_addr: SocketAddr,
    /// Upper bound on how long the receive loop blocks before it looks at
    /// its stop flag again.
    pub receive_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub liveness_timeout: Duration,
    pub search_timeout: Duration,
    pub discovery_interval: Duration,
    pub found_dwell: Duration,
    pub starting_dwell: Duration,
    pub disconnect_repeat: usize,
    /// How long `close` waits for the receive loop before aborting it.
    pub shutdown_timeout: Duration,
    pub buffer_size: usize,
    /// Probability in `0.0..=1.0` of dropping an inbound datagram on purpose.
    pub inbound_loss: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            discovery_addr: broadcast_addr(),
            bind_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)),
            receive_timeout: Duration::from_millis(RECEIVE_TIMEOUT_MS),
            heartbeat_interval: Duration::from_millis(HEARTBEAT_INTERVAL_MS),
            liveness_timeout: Duration::from_millis(LIVENESS_TIMEOUT_MS),
            search_timeout: Duration::from_secs(SEARCH_TIMEOUT_SECS),
            discovery_interval: Duration::from_millis(DISCOVERY_INTERVAL_MS),
            found_dwell: Duration::from_secs(PHASE_DWELL_SECS),
            starting_dwell: Duration::from_secs(PHASE_DWELL_SECS),
            disconnect_repeat: DISCONNECT_REPEAT,
            shutdown_timeout: Duration::from_millis(RECEIVE_TIMEOUT_MS + 500),
            buffer_size: MAX_DATAGRAM_SIZE,
            inbound_loss: 0.0,
        }
    }
}

impl ClientConfig {
    /// Skips broadcast and talks to a known server directly.
    pub fn with_server(mut self, addr: SocketAddr) -> Self {
        self.discovery_addr = addr;
        self
    }
}
