#[macro_use]
extern crate serde_derive;
extern crate thiserror;
extern crate url;

pub mod outcome;
pub mod protocol;

pub use outcome::{Outcome, WinAnnouncements};
pub use protocol::{GameRequest, Method, CSRF_HEADER};

use std::fmt;

use thiserror::Error;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub x: u32,
    pub y: u32,
}

impl Coord {
    pub fn new(x: u32, y: u32) -> Coord {
        Coord { x, y }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceColour {
    Light,
    Dark,
}

impl PieceColour {
    /// Name used for `pieces[i][color]` in request bodies.
    pub fn wire_name(self) -> &'static str {
        match self {
            PieceColour::Light => "LightPiece",
            PieceColour::Dark => "DarkPiece",
        }
    }

    /// Name used by the server for the `last_move` descriptor and the event stream.
    pub fn move_name(self) -> &'static str {
        match self {
            PieceColour::Light => "light",
            PieceColour::Dark => "dark",
        }
    }

    pub fn from_move_name(name: &str) -> Option<PieceColour> {
        match name {
            "light" => Some(PieceColour::Light),
            "dark" => Some(PieceColour::Dark),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub x: u32,
    pub y: u32,
    pub colour: PieceColour,
}

impl Piece {
    pub fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("two pieces share the square {0}")]
pub struct DuplicateSquare(pub Coord);

/// Every piece on the board at one instant, in document order.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardSnapshot {
    pieces: Vec<Piece>,
}

impl BoardSnapshot {
    pub fn new(pieces: Vec<Piece>) -> Result<BoardSnapshot, DuplicateSquare> {
        let mut seen = std::collections::HashSet::with_capacity(pieces.len());
        for piece in &pieces {
            if !seen.insert(piece.coord()) {
                return Err(DuplicateSquare(piece.coord()));
            }
        }
        Ok(BoardSnapshot { pieces })
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn piece_at(&self, coord: Coord) -> Option<&Piece> {
        self.pieces.iter().find(|piece| piece.coord() == coord)
    }

    pub fn count(&self, colour: PieceColour) -> usize {
        self.pieces.iter().filter(|piece| piece.colour == colour).count()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveIntent {
    /// Opening placement; there is no origin square.
    FirstMove { target: Coord },
    Move {
        origin: Coord,
        target: Coord,
        board_size: u32,
    },
}

impl MoveIntent {
    pub fn target(&self) -> Coord {
        match *self {
            MoveIntent::FirstMove { target } | MoveIntent::Move { target, .. } => target,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    AwaitingFirstMove,
    AwaitingOrigin,
    AwaitingDestination(Coord),
}

impl GamePhase {
    /// Parses the phase a page declares for itself. A declared game in progress
    /// always starts without a selected origin.
    pub fn from_declaration(value: &str) -> Option<GamePhase> {
        match value.trim() {
            "awaiting-first-move" => Some(GamePhase::AwaitingFirstMove),
            "in-progress" => Some(GamePhase::AwaitingOrigin),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct GameIdentity(pub String);

impl GameIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CsrfToken(pub String);

impl CsrfToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("CsrfToken(..)")
    }
}

/// Opaque last-move descriptor, forwarded to the server as-is.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct LastMove(pub Option<String>);

impl LastMove {
    pub fn as_str(&self) -> &str {
        self.0.as_ref().map(String::as_str).unwrap_or("")
    }

    pub fn colour(&self) -> Option<PieceColour> {
        self.0.as_ref().and_then(|name| PieceColour::from_move_name(name))
    }
}
