//! Decoded events and their delivery on the consumer's side
//!
//! The receive task never calls consumer code. It pushes [`ClientEvent`]s
//! into a channel, and the consumer drains that channel from its own loop
//! through an [`EventQueue`], which hands each event to an [`EventSink`].

use log::debug;
use shared::{HintKind, Message, PlayerId, Rect, Vec2};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Connected(PlayerId),
    MatchStarted,
    Positions {
        p1: Vec2,
        p2: Vec2,
        heading1: f32,
        heading2: f32,
    },
    Fuel {
        player: PlayerId,
        value: f32,
    },
    Money {
        player: PlayerId,
        value: i32,
    },
    Health {
        player: PlayerId,
        value: i32,
    },
    DeliveryAssigned {
        player: PlayerId,
        target: Rect,
        dangerous: bool,
        reward: i32,
    },
    DeliveryCleared {
        player: PlayerId,
    },
    ProximityHint {
        player: PlayerId,
        hint: HintKind,
    },
    FuelZoneHint {
        player: PlayerId,
        in_zone: bool,
    },
    GameOver {
        winner: i32,
    },
    Reset,
    OpponentLeft,
    /// Raised by the consumer's liveness check, never by the wire.
    ConnectionLost,
}

impl ClientEvent {
    /// Messages handled inside the connection layer (`OK`, `Pong`, unknown
    /// verbs) have no consumer-facing event.
    pub fn from_message(message: Message) -> Option<Self> {
        let event = match message {
            Message::AssignId(id) => ClientEvent::Connected(id),
            Message::MatchStart => ClientEvent::MatchStarted,
            Message::Move {
                p1,
                p2,
                heading1,
                heading2,
            } => ClientEvent::Positions {
                p1,
                p2,
                heading1,
                heading2,
            },
            Message::FuelLevel { player, value } => ClientEvent::Fuel { player, value },
            Message::Money { player, value } => ClientEvent::Money { player, value },
            Message::Health { player, value } => ClientEvent::Health { player, value },
            Message::DeliveryAssigned {
                player,
                target,
                dangerous,
                reward,
            } => ClientEvent::DeliveryAssigned {
                player,
                target,
                dangerous,
                reward,
            },
            Message::DeliveryCleared { player } => ClientEvent::DeliveryCleared { player },
            Message::ProximityHint { player, hint } => ClientEvent::ProximityHint { player, hint },
            Message::FuelZoneHint { player, in_zone } => {
                ClientEvent::FuelZoneHint { player, in_zone }
            }
            Message::GameOver { winner } => ClientEvent::GameOver { winner },
            Message::Reset => ClientEvent::Reset,
            Message::OpponentLeft => ClientEvent::OpponentLeft,
            Message::Ack | Message::HeartbeatReply | Message::Unknown(_) => return None,
        };
        Some(event)
    }
}

/// Receiver of decoded events. Every method defaults to doing nothing so a
/// screen only implements what it shows.
pub trait EventSink {
    fn on_connected(&mut self, _player: PlayerId) {}
    fn on_match_started(&mut self) {}
    fn on_positions(&mut self, _p1: Vec2, _p2: Vec2, _heading1: f32, _heading2: f32) {}
    fn on_fuel(&mut self, _player: PlayerId, _value: f32) {}
    fn on_money(&mut self, _player: PlayerId, _value: i32) {}
    fn on_health(&mut self, _player: PlayerId, _value: i32) {}
    fn on_delivery_assigned(
        &mut self,
        _player: PlayerId,
        _target: Rect,
        _dangerous: bool,
        _reward: i32,
    ) {
    }
    fn on_delivery_cleared(&mut self, _player: PlayerId) {}
    fn on_proximity_hint(&mut self, _player: PlayerId, _hint: HintKind) {}
    fn on_fuel_zone_hint(&mut self, _player: PlayerId, _in_zone: bool) {}
    fn on_game_over(&mut self, _winner: i32) {}
    fn on_reset(&mut self) {}
    fn on_opponent_left(&mut self) {}
    fn on_connection_lost(&mut self) {}
}

pub fn dispatch(event: ClientEvent, sink: &mut dyn EventSink) {
    match event {
        ClientEvent::Connected(player) => sink.on_connected(player),
        ClientEvent::MatchStarted => sink.on_match_started(),
        ClientEvent::Positions {
            p1,
            p2,
            heading1,
            heading2,
        } => sink.on_positions(p1, p2, heading1, heading2),
        ClientEvent::Fuel { player, value } => sink.on_fuel(player, value),
        ClientEvent::Money { player, value } => sink.on_money(player, value),
        ClientEvent::Health { player, value } => sink.on_health(player, value),
        ClientEvent::DeliveryAssigned {
            player,
            target,
            dangerous,
            reward,
        } => sink.on_delivery_assigned(player, target, dangerous, reward),
        ClientEvent::DeliveryCleared { player } => sink.on_delivery_cleared(player),
        ClientEvent::ProximityHint { player, hint } => sink.on_proximity_hint(player, hint),
        ClientEvent::FuelZoneHint { player, in_zone } => sink.on_fuel_zone_hint(player, in_zone),
        ClientEvent::GameOver { winner } => sink.on_game_over(winner),
        ClientEvent::Reset => sink.on_reset(),
        ClientEvent::OpponentLeft => sink.on_opponent_left(),
        ClientEvent::ConnectionLost => sink.on_connection_lost(),
    }
}

/// Consumer end of the event channel, with at most one registered sink.
pub struct EventQueue {
    source: mpsc::UnboundedReceiver<ClientEvent>,
    sink: Option<Box<dyn EventSink + Send>>,
}

impl EventQueue {
    pub fn new(source: mpsc::UnboundedReceiver<ClientEvent>) -> Self {
        Self { source, sink: None }
    }

    /// Points the queue at a new receive task, keeping the registered sink.
    pub fn replace_source(&mut self, source: mpsc::UnboundedReceiver<ClientEvent>) {
        self.source = source;
    }

    /// Registers `sink`, returning the one it replaces.
    pub fn set_sink(&mut self, sink: Box<dyn EventSink + Send>) -> Option<Box<dyn EventSink + Send>> {
        self.sink.replace(sink)
    }

    pub fn clear_sink(&mut self) -> Option<Box<dyn EventSink + Send>> {
        self.sink.take()
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    pub fn try_next(&mut self) -> Option<ClientEvent> {
        self.source.try_recv().ok()
    }

    /// Drains everything queued into `sink`, in arrival order.
    pub fn drain_into(&mut self, sink: &mut dyn EventSink) -> usize {
        let mut delivered = 0;
        while let Some(event) = self.try_next() {
            dispatch(event, sink);
            delivered += 1;
        }
        delivered
    }

    /// Drains everything queued into the registered sink. Without a sink
    /// the events are discarded, as nobody is listening.
    pub fn pump(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.source.try_recv() {
            match self.sink.as_deref_mut() {
                Some(sink) => {
                    dispatch(event, sink);
                    delivered += 1;
                }
                None => debug!("No event sink registered, dropping {:?}", event),
            }
        }
        delivered
    }
}
