//! Wire protocol shared by the delivery game client and its tests.
//!
//! The server speaks a colon-delimited ASCII protocol over UDP, one message
//! per datagram and no length prefix. This crate owns both directions of
//! that mapping: [`decode`] turns an inbound datagram into a [`Message`],
//! and [`Command`] renders the handful of frames a client is allowed to send.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

pub mod command;
pub mod protocol;

pub use command::Command;
pub use protocol::{decode, DecodeError, HintKind, Message, Rect, Vec2};

/// Index of a player slot. A match has exactly two: 0 and 1.
pub type PlayerId = u8;

pub const PLAYER_SLOTS: usize = 2;

pub const SERVER_PORT: u16 = 6767;
pub const BROADCAST_IP: Ipv4Addr = Ipv4Addr::BROADCAST;

pub const RECEIVE_TIMEOUT_MS: u64 = 1000;
pub const HEARTBEAT_INTERVAL_MS: u64 = 1000;
pub const LIVENESS_TIMEOUT_MS: u64 = 3500;
pub const SEARCH_TIMEOUT_SECS: u64 = 10;
pub const DISCOVERY_INTERVAL_MS: u64 = 500;
pub const PHASE_DWELL_SECS: u64 = 3;
pub const DISCONNECT_REPEAT: usize = 3;

/// Receive buffer size. Server frames are short text lines.
pub const MAX_DATAGRAM_SIZE: usize = 1024;

// Key codes the server understands, as sent in `Input` frames.
pub const KEY_W: i32 = 51;
pub const KEY_A: i32 = 29;
pub const KEY_S: i32 = 47;
pub const KEY_D: i32 = 32;
pub const KEY_G: i32 = 35;
pub const KEY_E: i32 = 33;

pub const ALLOWED_KEYS: [i32; 6] = [KEY_W, KEY_A, KEY_S, KEY_D, KEY_G, KEY_E];

pub fn is_allowed_key(code: i32) -> bool {
    ALLOWED_KEYS.contains(&code)
}

/// Address discovery frames go to before the handshake completes.
pub fn broadcast_addr() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(BROADCAST_IP, SERVER_PORT))
}

pub fn is_valid_player(id: i64) -> bool {
    (0..PLAYER_SLOTS as i64).contains(&id)
}
