//! Outbound frames a client may send

use crate::protocol::DecodeError;
use crate::{is_valid_player, PlayerId};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Discovery / handshake request, broadcast until the server answers `OK`.
    Connect,
    /// `key` is positive for a press and the negated code for a release.
    Input { player: PlayerId, key: i32 },
    Ping { player: PlayerId },
    Disconnect { player: PlayerId },
}

impl Command {
    pub fn press(player: PlayerId, code: i32) -> Self {
        Command::Input {
            player,
            key: code.abs(),
        }
    }

    pub fn release(player: PlayerId, code: i32) -> Self {
        Command::Input {
            player,
            key: -code.abs(),
        }
    }

    /// Parses a client frame. Servers and test harnesses use this side.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let text = text.trim();
        let mut parts = text.split(':');
        let head = parts.next().unwrap_or_default();
        let fields: Vec<&str> = parts.collect();

        let number = |index: usize, field: &'static str| -> Result<i64, DecodeError> {
            let value = fields.get(index).ok_or_else(|| DecodeError::MissingField {
                head: head.to_string(),
                field,
            })?;
            value.trim().parse().map_err(|_| DecodeError::InvalidNumber {
                head: head.to_string(),
                field,
                value: value.to_string(),
            })
        };
        let player = |index: usize| -> Result<PlayerId, DecodeError> {
            let id = number(index, "playerId")?;
            if !is_valid_player(id) {
                return Err(DecodeError::UnknownPlayer {
                    head: head.to_string(),
                    id,
                });
            }
            Ok(id as PlayerId)
        };

        let key = |index: usize| -> Result<i32, DecodeError> {
            let code = number(index, "key")?;
            i32::try_from(code).map_err(|_| DecodeError::InvalidNumber {
                head: head.to_string(),
                field: "key",
                value: code.to_string(),
            })
        };

        match head {
            "" => Err(DecodeError::Empty),
            "Conexion" => Ok(Command::Connect),
            "Input" => Ok(Command::Input {
                player: player(0)?,
                key: key(1)?,
            }),
            "Ping" => Ok(Command::Ping { player: player(0)? }),
            "Disconnect" => Ok(Command::Disconnect { player: player(0)? }),
            _ => Err(DecodeError::UnknownVerb(head.to_string())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Connect => write!(f, "Conexion"),
            Command::Input { player, key } => write!(f, "Input:{}:{}", player, key),
            Command::Ping { player } => write!(f, "Ping:{}", player),
            Command::Disconnect { player } => write!(f, "Disconnect:{}", player),
        }
    }
}
