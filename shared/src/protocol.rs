//! Inbound message set and the text decoder for it

use crate::{is_valid_player, PlayerId};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Parses an `x,y` pair, tolerating the `Vector2(x,y)` / `(x,y)`
    /// decoration some server builds wrap around positions.
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        let bare = strip_vector_decoration(text);
        let mut coords = bare.split(',').map(str::trim);

        match (coords.next(), coords.next()) {
            (Some(x), Some(y)) => {
                let x = x.parse().map_err(|_| DecodeError::InvalidVector(text.to_string()))?;
                let y = y.parse().map_err(|_| DecodeError::InvalidVector(text.to_string()))?;
                Ok(Self { x, y })
            }
            _ => Err(DecodeError::InvalidVector(text.to_string())),
        }
    }
}

impl fmt::Display for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

fn strip_vector_decoration(text: &str) -> String {
    text.replace("Vector2", "")
        .replace(&['(', ')'][..], "")
        .trim()
        .to_string()
}

/// Axis-aligned target area of a delivery, in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Parses `x,y,w,h`.
    pub fn parse(text: &str) -> Result<Self, DecodeError> {
        let values: Vec<f32> = text
            .split(',')
            .map(|part| part.trim().parse::<f32>())
            .collect::<Result<_, _>>()
            .map_err(|_| DecodeError::InvalidRect(text.to_string()))?;

        match values[..] {
            [x, y, width, height, ..] => Ok(Self::new(x, y, width, height)),
            _ => Err(DecodeError::InvalidRect(text.to_string())),
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

/// What a player is standing next to, as computed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HintKind {
    #[default]
    None,
    Pickup,
    Dropoff,
}

impl HintKind {
    /// Codes other than 1 and 2 mean "nothing nearby".
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => HintKind::Pickup,
            2 => HintKind::Dropoff,
            _ => HintKind::None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            HintKind::None => 0,
            HintKind::Pickup => 1,
            HintKind::Dropoff => 2,
        }
    }
}

/// Every frame the server can send, decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Handshake reply. The sender becomes the real server address.
    Ack,
    AssignId(PlayerId),
    MatchStart,
    Move {
        p1: Vec2,
        p2: Vec2,
        heading1: f32,
        heading2: f32,
    },
    FuelLevel {
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
    HeartbeatReply,
    /// A head this client does not know. Dropped by the receive loop.
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("empty datagram")]
    Empty,
    #[error("{head}: missing field `{field}`")]
    MissingField { head: String, field: &'static str },
    #[error("{head}: field `{field}` is not a number: {value:?}")]
    InvalidNumber {
        head: String,
        field: &'static str,
        value: String,
    },
    #[error("malformed position: {0:?}")]
    InvalidVector(String),
    #[error("malformed rectangle: {0:?}")]
    InvalidRect(String),
    #[error("{head}: player index {id} out of range")]
    UnknownPlayer { head: String, id: i64 },
    #[error("unknown verb: {0:?}")]
    UnknownVerb(String),
}

/// Positional view over the colon-separated fields of one frame.
struct Frame<'a> {
    head: &'a str,
    fields: Vec<&'a str>,
}

impl<'a> Frame<'a> {
    fn new(text: &'a str) -> Self {
        let mut parts = text.split(':');
        let head = parts.next().unwrap_or_default();
        Self {
            head,
            fields: parts.collect(),
        }
    }

    /// `index` counts fields after the head, starting at 0.
    fn field(&self, index: usize, name: &'static str) -> Result<&'a str, DecodeError> {
        self.fields
            .get(index)
            .map(|field| field.trim())
            .ok_or_else(|| DecodeError::MissingField {
                head: self.head.to_string(),
                field: name,
            })
    }

    fn number<T: FromStr>(&self, index: usize, name: &'static str) -> Result<T, DecodeError> {
        let value = self.field(index, name)?;
        value.parse().map_err(|_| DecodeError::InvalidNumber {
            head: self.head.to_string(),
            field: name,
            value: value.to_string(),
        })
    }

    fn player(&self, index: usize, name: &'static str) -> Result<PlayerId, DecodeError> {
        let id: i64 = self.number(index, name)?;
        if !is_valid_player(id) {
            return Err(DecodeError::UnknownPlayer {
                head: self.head.to_string(),
                id,
            });
        }
        Ok(id as PlayerId)
    }

    /// `1` is set, anything else is clear.
    fn flag(&self, index: usize, name: &'static str) -> Result<bool, DecodeError> {
        Ok(self.field(index, name)? == "1")
    }

    fn vector(&self, index: usize, name: &'static str) -> Result<Vec2, DecodeError> {
        Vec2::parse(self.field(index, name)?)
    }

    fn rect(&self, index: usize, name: &'static str) -> Result<Rect, DecodeError> {
        Rect::parse(self.field(index, name)?)
    }
}

/// Decodes one datagram's text.
///
/// Unknown heads decode to [`Message::Unknown`] so newer servers can add
/// verbs. A known head with missing or unparsable fields is an error and
/// the caller is expected to drop the datagram.
pub fn decode(text: &str) -> Result<Message, DecodeError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(DecodeError::Empty);
    }
    if text == "OK" {
        return Ok(Message::Ack);
    }

    let frame = Frame::new(text);
    let message = match frame.head {
        "Pong" => Message::HeartbeatReply,
        "ID" => Message::AssignId(frame.player(0, "playerId")?),
        "Comienza" => Message::MatchStart,
        "Movimiento" => Message::Move {
            p1: frame.vector(0, "pos1")?,
            p2: frame.vector(1, "pos2")?,
            heading1: frame.number(2, "ang1")?,
            heading2: frame.number(3, "ang2")?,
        },
        "Gas" => Message::FuelLevel {
            value: frame.number(0, "value")?,
            player: frame.player(1, "id")?,
        },
        "Dinero" => Message::Money {
            value: frame.number(0, "value")?,
            player: frame.player(1, "id")?,
        },
        "Vida" => Message::Health {
            value: frame.number(0, "value")?,
            player: frame.player(1, "id")?,
        },
        "Delivery" => Message::DeliveryAssigned {
            target: frame.rect(0, "rect")?,
            dangerous: frame.flag(1, "dangerous")?,
            reward: frame.number(2, "reward")?,
            player: frame.player(3, "id")?,
        },
        "DeliveryFin" => Message::DeliveryCleared {
            player: frame.player(0, "id")?,
        },
        "Hint" => Message::ProximityHint {
            player: frame.player(0, "id")?,
            hint: HintKind::from_code(frame.number(1, "type")?),
        },
        "GasHint" => Message::FuelZoneHint {
            player: frame.player(0, "id")?,
            in_zone: frame.flag(1, "flag")?,
        },
        "GameOver" => Message::GameOver {
            winner: frame.number(0, "winnerIndex")?,
        },
        "Reset" => Message::Reset,
        "OpponentLeft" => Message::OpponentLeft,
        _ => Message::Unknown(text.to_string()),
    };

    Ok(message)
}

/// Renders the frame exactly as the server sends it.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Ack => write!(f, "OK"),
            Message::AssignId(id) => write!(f, "ID:{}", id),
            Message::MatchStart => write!(f, "Comienza"),
            Message::Move {
                p1,
                p2,
                heading1,
                heading2,
            } => write!(f, "Movimiento:{}:{}:{}:{}", p1, p2, heading1, heading2),
            Message::FuelLevel { player, value } => write!(f, "Gas:{}:{}", value, player),
            Message::Money { player, value } => write!(f, "Dinero:{}:{}", value, player),
            Message::Health { player, value } => write!(f, "Vida:{}:{}", value, player),
            Message::DeliveryAssigned {
                player,
                target,
                dangerous,
                reward,
            } => write!(
                f,
                "Delivery:{}:{}:{}:{}",
                target,
                u8::from(*dangerous),
                reward,
                player
            ),
            Message::DeliveryCleared { player } => write!(f, "DeliveryFin:{}", player),
            Message::ProximityHint { player, hint } => {
                write!(f, "Hint:{}:{}", player, hint.code())
            }
            Message::FuelZoneHint { player, in_zone } => {
                write!(f, "GasHint:{}:{}", player, u8::from(*in_zone))
            }
            Message::GameOver { winner } => write!(f, "GameOver:{}", winner),
            Message::Reset => write!(f, "Reset"),
            Message::OpponentLeft => write!(f, "OpponentLeft"),
            Message::HeartbeatReply => write!(f, "Pong"),
            Message::Unknown(text) => write!(f, "{}", text),
        }
    }
}
