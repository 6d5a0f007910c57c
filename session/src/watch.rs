//! Decides when the opponent's moves call for a board update.

use common::{LastMove, PieceColour};

/// Follows the server's move feed, whose events read `Waiting;<colour>` with
/// the colour of the latest recorded move (`None` before any move).
#[derive(Debug, Default)]
pub struct OpponentWatch {
    last_seen: Option<String>,
    own_moves_seen: u64,
}

impl OpponentWatch {
    pub fn new() -> OpponentWatch {
        OpponentWatch::default()
    }

    /// True when `data` reports a move not seen before that was not made by
    /// the side which played `own_last_move`. The feed only names the colour
    /// that moved last, so a repeated colour is a new move when this client
    /// has moved since the previous event (`own_moves` counts its moves).
    pub fn observe(&mut self, data: &str, own_last_move: &LastMove, own_moves: u64) -> bool {
        let colour = match data.trim().split(';').nth(1) {
            Some(colour) => colour.trim(),
            None => {
                warn!("Unexpected move feed event {:?}", data);
                return false;
            }
        };

        let repeated = self.last_seen.as_ref().map(String::as_str) == Some(colour);
        let moved_since = own_moves != self.own_moves_seen;
        self.own_moves_seen = own_moves;
        if repeated && !moved_since {
            return false;
        }
        self.last_seen = Some(colour.to_owned());

        match PieceColour::from_move_name(colour) {
            Some(mover) => own_last_move.colour() != Some(mover),
            None => false,
        }
    }
}
