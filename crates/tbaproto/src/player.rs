use serde::{Deserialize, Serialize};

use crate::ProtoError;
use crate::ids::UserId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainCard {
    pub url: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResp {
    pub id: UserId,
    pub secret: String,
    pub domain: DomainCard,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandReq {
    #[serde(default)]
    pub user: Option<UserId>,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub fn parse(token: &str) -> Result<Self, ProtoError> {
        match token {
            "north" => Ok(Direction::North),
            "south" => Ok(Direction::South),
            "east" => Ok(Direction::East),
            "west" => Ok(Direction::West),
            _ => Err(ProtoError::UnknownDirection(token.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }
}

/// A hub command, dispatched on its first word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Region,
    /// Remaining words, validated by the journey handler.
    Journey(Vec<String>),
    Inventory,
    Score,
    /// Remaining words; joined with spaces they name an item or an item id.
    Drop(Vec<String>),
    Unknown(String),
}

impl Command {
    pub fn parse(words: &[String]) -> Result<Self, ProtoError> {
        let Some((verb, rest)) = words.split_first() else {
            return Err(ProtoError::Empty);
        };
        Ok(match verb.as_str() {
            "region" => Command::Region,
            "journey" => Command::Journey(rest.to_vec()),
            "inventory" => Command::Inventory,
            "score" => Command::Score,
            "drop" => Command::Drop(rest.to_vec()),
            other => Command::Unknown(other.to_string()),
        })
    }
}
