//! Client-side view of a running match
//!
//! The server is authoritative; this model only mirrors what it reports so
//! a renderer or HUD can read it. Updates are last-write-wins in arrival
//! order, with no staleness check.

use crate::events::EventSink;
use log::{info, warn};
use shared::{HintKind, PlayerId, Rect, Vec2, PLAYER_SLOTS};

pub const SPAWN_POSITIONS: [Vec2; PLAYER_SLOTS] =
    [Vec2 { x: 1700.0, y: 500.0 }, Vec2 { x: 1700.0, y: 450.0 }];
pub const FULL_HEALTH: i32 = 100;
pub const FULL_FUEL: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delivery {
    pub target: Rect,
    pub dangerous: bool,
    pub reward: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerView {
    pub position: Vec2,
    pub heading: f32,
    pub fuel: f32,
    pub money: i32,
    pub health: i32,
    pub delivery: Option<Delivery>,
    pub hint: HintKind,
    pub in_fuel_zone: bool,
}

impl PlayerView {
    fn spawn(slot: usize) -> Self {
        Self {
            position: SPAWN_POSITIONS[slot],
            heading: 0.0,
            fuel: FULL_FUEL,
            money: 0,
            health: FULL_HEALTH,
            delivery: None,
            hint: HintKind::None,
            in_fuel_zone: false,
        }
    }

    pub fn near_pickup(&self) -> bool {
        self.hint == HintKind::Pickup
    }

    pub fn near_dropoff(&self) -> bool {
        self.hint == HintKind::Dropoff
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Winner(i32),
    OpponentLeft,
    ConnectionLost,
}

#[derive(Debug, Clone)]
pub struct MatchView {
    local: Option<PlayerId>,
    players: [PlayerView; PLAYER_SLOTS],
    outcome: Option<MatchOutcome>,
}

impl MatchView {
    pub fn new(local: Option<PlayerId>) -> Self {
        Self {
            local,
            players: [PlayerView::spawn(0), PlayerView::spawn(1)],
            outcome: None,
        }
    }

    pub fn local_id(&self) -> Option<PlayerId> {
        self.local
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerView> {
        self.players.get(usize::from(id))
    }

    pub fn local_player(&self) -> Option<&PlayerView> {
        self.local.and_then(|id| self.player(id))
    }

    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// HUD line describing the player's current order.
    pub fn delivery_status(&self, id: PlayerId) -> String {
        match self.player(id).and_then(|p| p.delivery) {
            None => "Order: none".to_string(),
            Some(d) if d.dangerous => format!("Order: DANGEROUS ${}", d.reward),
            Some(d) => format!("Order: normal ${}", d.reward),
        }
    }

    /// Spawn values for both players, no orders, no hints.
    pub fn reset(&mut self) {
        self.players = [PlayerView::spawn(0), PlayerView::spawn(1)];
    }

    fn player_mut(&mut self, id: PlayerId) -> Option<&mut PlayerView> {
        self.players.get_mut(usize::from(id))
    }

    fn finish(&mut self, outcome: MatchOutcome) {
        if self.outcome.is_some() {
            return;
        }
        info!("Match over: {:?}", outcome);
        self.outcome = Some(outcome);
    }
}

impl EventSink for MatchView {
    fn on_positions(&mut self, p1: Vec2, p2: Vec2, heading1: f32, heading2: f32) {
        self.players[0].position = p1;
        self.players[0].heading = heading1;
        self.players[1].position = p2;
        self.players[1].heading = heading2;
    }

    fn on_fuel(&mut self, player: PlayerId, value: f32) {
        if let Some(p) = self.player_mut(player) {
            p.fuel = value;
        }
    }

    fn on_money(&mut self, player: PlayerId, value: i32) {
        if let Some(p) = self.player_mut(player) {
            p.money = value;
        }
    }

    fn on_health(&mut self, player: PlayerId, value: i32) {
        if let Some(p) = self.player_mut(player) {
            p.health = value;
        }
    }

    fn on_delivery_assigned(&mut self, player: PlayerId, target: Rect, dangerous: bool, reward: i32) {
        if let Some(p) = self.player_mut(player) {
            p.delivery = Some(Delivery {
                target,
                dangerous,
                reward,
            });
        }
    }

    fn on_delivery_cleared(&mut self, player: PlayerId) {
        if let Some(p) = self.player_mut(player) {
            p.delivery = None;
        }
    }

    fn on_proximity_hint(&mut self, player: PlayerId, hint: HintKind) {
        if let Some(p) = self.player_mut(player) {
            p.hint = hint;
        }
    }

    fn on_fuel_zone_hint(&mut self, player: PlayerId, in_zone: bool) {
        if let Some(p) = self.player_mut(player) {
            p.in_fuel_zone = in_zone;
        }
    }

    fn on_game_over(&mut self, winner: i32) {
        self.finish(MatchOutcome::Winner(winner));
    }

    fn on_reset(&mut self) {
        self.reset();
    }

    fn on_opponent_left(&mut self) {
        warn!("Opponent left the match");
        self.finish(MatchOutcome::OpponentLeft);
    }

    fn on_connection_lost(&mut self) {
        self.finish(MatchOutcome::ConnectionLost);
    }
}
