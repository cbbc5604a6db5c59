//! `tbaproto`: JSON wire types shared by the tba hub, domain servers and clients.
//!
//! Three surfaces live here:
//! - [`hub`]: bodies a domain server sends to the hub (`/register`, `/score`,
//!   `/transfer`, `/query`) and the hub's replies;
//! - [`callback`]: bodies the hub sends to a domain server (`/arrive`,
//!   `/depart`, `/dropped`);
//! - [`player`]: the player-facing `/login` reply and `/command` request.
//!
//! Ids are plain JSON integers on the wire; see [`ids`].

pub mod callback;
pub mod hub;
pub mod ids;
pub mod location;
pub mod player;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtoError {
    Empty,
    UnknownDirection(String),
}

impl std::fmt::Display for ProtoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtoError::Empty => write!(f, "empty command"),
            ProtoError::UnknownDirection(d) => write!(f, "unknown direction: {d:?}"),
        }
    }
}

impl std::error::Error for ProtoError {}
