//! # Game Client Network Library
//!
//! This library is the network side of the two-player delivery game client.
//! It finds the server on the local network, performs the handshake, keeps
//! the connection alive and turns the server's text datagrams into typed
//! events for whatever screen is currently showing.
//!
//! ## Architecture Overview
//!
//! Two units of work run side by side:
//!
//! ### Receive Task
//! A background tokio task owned by [`network::Connection`]. It blocks on
//! the socket with a bounded receive timeout, decodes each datagram, keeps
//! the [`session::Session`] up to date and pushes events into a channel. It
//! also sends the heartbeat `Ping` once a player id is assigned. A stop
//! flag, checked at least once per receive timeout, ends it.
//!
//! ### Consumer Loop
//! The game's own frame loop. It issues sends (discovery, input,
//! disconnect), drains the event channel into an [`events::EventSink`] and
//! reads session snapshots. It never blocks on the network and its sink is
//! never called from the receive task.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! Socket lifecycle and outbound primitives:
//! - Broadcast discovery and handshake address latching
//! - Input, ping and repeated disconnect frames
//! - Cooperative shutdown with a bounded join
//!
//! ### Receiver Module (`receiver`)
//! The receive task itself, plus simulated inbound loss for testing.
//!
//! ### Session and Heartbeat Modules (`session`, `heartbeat`)
//! Player identity, server address and heartbeat timestamps, and the
//! liveness predicate built on them.
//!
//! ### Events Module (`events`)
//! [`events::ClientEvent`], the [`events::EventSink`] trait and the queue
//! that delivers events on the consumer's side.
//!
//! ### Screens (`search`, `match_state`)
//! Consumer-side state: the match-search state machine and the view model
//! of a running match. Both are plain event sinks with no I/O.
//!
//! ### Input Module (`input`)
//! Edge detection that turns held keys into signed press / release codes.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::config::ClientConfig;
//! use client::network::Connection;
//! use client::search::{MatchSearch, SearchAction};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::default();
//!     let mut connection = Connection::open(config.clone()).await?;
//!     let mut search = MatchSearch::new(&config);
//!
//!     loop {
//!         tokio::time::sleep(Duration::from_millis(16)).await;
//!         connection.poll_events(&mut search);
//!         match search.update(Duration::from_millis(16)) {
//!             Some(SearchAction::SendDiscovery) => connection.discover().await,
//!             Some(SearchAction::EnterMatch) => break,
//!             None => {}
//!         }
//!     }
//!
//!     connection.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod heartbeat;
pub mod input;
pub mod match_state;
pub mod network;
pub mod receiver;
pub mod search;
pub mod session;

pub use config::ClientConfig;
pub use error::ClientError;
pub use events::{ClientEvent, EventSink};
pub use network::Connection;
