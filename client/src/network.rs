//! Connection manager: socket lifecycle and outbound send primitives

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::events::{ClientEvent, EventQueue, EventSink};
use crate::heartbeat::Heartbeat;
use crate::receiver::{PacketLoss, ReceiveLoop};
use crate::session::{self, Session, SessionSnapshot, SharedSession};
use log::{debug, info, warn};
use shared::{Command, PlayerId};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

pub(crate) async fn send_frame(
    socket: &UdpSocket,
    dest: SocketAddr,
    text: &str,
) -> Result<(), ClientError> {
    socket
        .send_to(text.as_bytes(), dest)
        .await
        .map_err(ClientError::Send)?;
    Ok(())
}

/// Owns the UDP endpoint, the session and the background receive task.
///
/// All sends are fire-and-forget. Inbound traffic reaches the consumer only
/// as [`ClientEvent`]s drained through [`Connection::poll_events`] or
/// [`Connection::pump`] from the consumer's own loop.
pub struct Connection {
    config: ClientConfig,
    heartbeat: Heartbeat,
    socket: Option<Arc<UdpSocket>>,
    session: SharedSession,
    stop: Arc<AtomicBool>,
    receiver: Option<JoinHandle<()>>,
    events: EventQueue,
}

impl Connection {
    /// Binds the endpoint, enables broadcast and starts the receive task.
    pub async fn open(config: ClientConfig) -> Result<Self, ClientError> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut connection = Self {
            heartbeat: Heartbeat::new(config.heartbeat_interval, config.liveness_timeout),
            session: Session::shared(config.discovery_addr),
            config,
            socket: None,
            stop: Arc::new(AtomicBool::new(false)),
            receiver: None,
            events: EventQueue::new(events_rx),
        };

        connection.start(events_tx).await?;
        Ok(connection)
    }

    async fn start(
        &mut self,
        events_tx: mpsc::UnboundedSender<ClientEvent>,
    ) -> Result<(), ClientError> {
        let socket = UdpSocket::bind(self.config.bind_addr)
            .await
            .map_err(ClientError::Socket)?;
        socket.set_broadcast(true).map_err(ClientError::Socket)?;
        let socket = Arc::new(socket);

        let stop = Arc::new(AtomicBool::new(false));
        let receive_loop = ReceiveLoop {
            socket: Arc::clone(&socket),
            session: Arc::clone(&self.session),
            stop: Arc::clone(&stop),
            events: events_tx,
            heartbeat: self.heartbeat,
            receive_timeout: self.config.receive_timeout,
            buffer_size: self.config.buffer_size,
            loss: PacketLoss::new(self.config.inbound_loss),
        };

        match socket.local_addr() {
            Ok(addr) => info!("Client socket bound to {}", addr),
            Err(e) => debug!("Client socket bound, local address unavailable: {}", e),
        }

        self.receiver = Some(tokio::spawn(receive_loop.run()));
        self.stop = stop;
        self.socket = Some(socket);
        Ok(())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|socket| socket.local_addr().ok())
    }

    pub fn session(&self) -> SessionSnapshot {
        session::read(&self.session).snapshot()
    }

    pub fn player_id(&self) -> Option<PlayerId> {
        session::read(&self.session).player_id()
    }

    pub fn is_connected(&self) -> bool {
        self.player_id().is_some()
    }

    pub fn is_server_alive(&self) -> bool {
        self.heartbeat.is_alive(&self.session(), Instant::now())
    }

    /// `ConnectionLost` once the server has gone quiet for longer than the
    /// liveness timeout. The caller is expected to `disconnect` next.
    pub fn check_liveness(&self) -> Option<ClientEvent> {
        if !self.is_open() || self.is_server_alive() {
            return None;
        }
        warn!(
            "No heartbeat reply for {:?}, server considered lost",
            self.heartbeat.liveness_timeout()
        );
        Some(ClientEvent::ConnectionLost)
    }

    /// Sends `text` to the current server address: the discovery address
    /// until the handshake completes, the server's own address after.
    /// Does nothing once the socket is closed.
    pub async fn send_raw(&self, text: &str) {
        let Some(socket) = self.socket.as_ref() else {
            debug!("Socket closed, not sending {:?}", text);
            return;
        };
        let dest = session::read(&self.session).server_addr();

        if let Err(e) = send_frame(socket, dest, text).await {
            warn!("{} (frame {:?} to {})", e, text, dest);
        }
    }

    pub async fn send(&self, command: Command) {
        self.send_raw(&command.to_string()).await;
    }

    /// One discovery frame. Repeating it is up to the caller.
    pub async fn discover(&self) {
        debug!("Sending discovery frame");
        self.send(Command::Connect).await;
    }

    /// `key` is the signed key code: positive press, negative release.
    /// Dropped while no player id is assigned.
    pub async fn send_input(&self, key: i32) {
        match self.player_id() {
            Some(player) => self.send(Command::Input { player, key }).await,
            None => debug!("No player id yet, input {} not sent", key),
        }
    }

    pub async fn send_ping(&self) {
        if let Some(player) = self.player_id() {
            self.send(Command::Ping { player }).await;
        }
    }

    /// Tells the server we are leaving, then tears everything down.
    ///
    /// With an identity assigned, `Disconnect:<id>` is sent
    /// `disconnect_repeat` times without waiting for an answer. Safe to call
    /// repeatedly; once the socket is gone it does nothing.
    pub async fn disconnect(&mut self) {
        if !self.is_open() {
            return;
        }

        if let Some(player) = self.player_id() {
            let frame = Command::Disconnect { player }.to_string();
            for _ in 0..self.config.disconnect_repeat {
                self.send_raw(&frame).await;
            }
            info!("Disconnected player {}", player);
        }

        self.close().await;
        session::write(&self.session).reset();
    }

    /// Stops the receive task and releases the socket.
    ///
    /// The task notices the stop flag within one receive timeout; it is
    /// aborted if it has not finished within the shutdown timeout.
    pub async fn close(&mut self) {
        self.stop.store(true, Ordering::Release);

        if let Some(mut task) = self.receiver.take() {
            match timeout(self.config.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Receive loop ended with join error: {}", e),
                Err(_) => {
                    warn!("Receive loop did not stop in time, aborting it");
                    task.abort();
                }
            }
        }

        if self.socket.take().is_some() {
            debug!("Client socket released");
        }
    }

    /// Drops any current socket and session, then opens a fresh endpoint
    /// with a new receive task. The registered event sink is kept.
    pub async fn reconnect(&mut self) -> Result<(), ClientError> {
        self.close().await;
        session::write(&self.session).reset();

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.events.replace_source(events_rx);
        self.start(events_tx).await
    }

    /// Delivers every queued event to `sink` on the caller's task.
    pub fn poll_events(&mut self, sink: &mut dyn EventSink) -> usize {
        self.events.drain_into(sink)
    }

    pub fn next_event(&mut self) -> Option<ClientEvent> {
        self.events.try_next()
    }

    pub fn set_sink(&mut self, sink: Box<dyn EventSink + Send>) -> Option<Box<dyn EventSink + Send>> {
        self.events.set_sink(sink)
    }

    pub fn clear_sink(&mut self) -> Option<Box<dyn EventSink + Send>> {
        self.events.clear_sink()
    }

    /// Delivers every queued event to the registered sink.
    pub fn pump(&mut self) -> usize {
        self.events.pump()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}
