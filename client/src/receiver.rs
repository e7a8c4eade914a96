//! Background task that reads datagrams, keeps the session current and
//! forwards decoded events to the consumer

use crate::events::ClientEvent;
use crate::heartbeat::Heartbeat;
use crate::network::send_frame;
use crate::session::{self, SharedSession};
use log::{debug, error, info, warn};
use rand::Rng;
use shared::{decode, Message};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, timeout, MissedTickBehavior};

/// Randomly discards inbound datagrams to rehearse a lossy network.
#[derive(Debug, Clone, Copy, Default)]
pub struct PacketLoss {
    probability: f64,
}

impl PacketLoss {
    pub fn new(probability: f64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
        }
    }

    pub fn should_drop(&self) -> bool {
        self.probability > 0.0 && rand::thread_rng().gen_bool(self.probability)
    }
}

/// What one datagram did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Event(ClientEvent),
    Pong,
    Handshake(SocketAddr),
    Ignored,
    Dropped,
}

pub struct ReceiveLoop {
    pub(crate) socket: Arc<UdpSocket>,
    pub(crate) session: SharedSession,
    pub(crate) stop: Arc<AtomicBool>,
    pub(crate) events: mpsc::UnboundedSender<ClientEvent>,
    pub(crate) heartbeat: Heartbeat,
    pub(crate) receive_timeout: Duration,
    pub(crate) buffer_size: usize,
    pub(crate) loss: PacketLoss,
}

impl ReceiveLoop {
    /// Runs until the stop flag is raised. The flag is checked at least once
    /// per receive timeout even when nothing arrives.
    pub async fn run(self) {
        let mut buffer = vec![0u8; self.buffer_size];
        let mut heartbeat_tick = interval(self.heartbeat.interval());
        heartbeat_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!("Receive loop started");

        while !self.stop.load(Ordering::Acquire) {
            tokio::select! {
                result = timeout(self.receive_timeout, self.socket.recv_from(&mut buffer)) => {
                    match result {
                        Err(_) => continue,
                        Ok(Ok((len, from))) => {
                            let outcome = self.handle_datagram(&buffer[..len], from);
                            if let Outcome::Event(event) = outcome {
                                if self.events.send(event).is_err() {
                                    debug!("Event queue closed, discarding event");
                                }
                            }
                        }
                        Ok(Err(e)) => {
                            if !self.stop.load(Ordering::Acquire) {
                                error!("Error receiving datagram: {}", e);
                            }
                            sleep(Duration::from_millis(10)).await;
                        }
                    }
                },

                tick = heartbeat_tick.tick() => {
                    self.send_heartbeat(tick.into_std()).await;
                },
            }
        }

        debug!("Receive loop stopped");
    }

    /// Decodes one datagram and applies it to the session. Only the bytes
    /// actually received are looked at.
    pub fn handle_datagram(&self, bytes: &[u8], from: SocketAddr) -> Outcome {
        if self.loss.should_drop() {
            debug!("Simulated loss of {} bytes from {}", bytes.len(), from);
            return Outcome::Dropped;
        }

        let text = String::from_utf8_lossy(bytes);
        let message = match decode(&text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping datagram from {}: {}", from, e);
                return Outcome::Dropped;
            }
        };

        match message {
            Message::HeartbeatReply => {
                session::write(&self.session).record_pong(Instant::now());
                Outcome::Pong
            }
            Message::Ack => {
                session::write(&self.session).latch_server(from);
                info!("Server answered handshake from {}", from);
                Outcome::Handshake(from)
            }
            Message::Unknown(text) => {
                debug!("Ignoring unknown frame {:?} from {}", text, from);
                Outcome::Ignored
            }
            message => {
                if let Message::AssignId(id) = message {
                    session::write(&self.session).assign(id);
                    info!("Assigned player id {}", id);
                }
                match ClientEvent::from_message(message) {
                    Some(event) => Outcome::Event(event),
                    None => Outcome::Ignored,
                }
            }
        }
    }

    /// `tick` is the interval's scheduled deadline, not the wake-up time,
    /// so scheduling jitter never makes a tick look early to `poll`.
    async fn send_heartbeat(&self, tick: Instant) {
        let due = {
            let mut session = session::write(&self.session);
            let server = session.server_addr();
            self.heartbeat
                .poll(&mut session, tick)
                .map(|ping| (ping, server))
        };

        if let Some((ping, server)) = due {
            if let Err(e) = send_frame(&self.socket, server, &ping.to_string()).await {
                warn!("Heartbeat not sent: {}", e);
            }
        }
    }
}
