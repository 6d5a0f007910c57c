//! Game end decisions over piece counts.

use crate::PieceColour;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    InProgress,
    LightWins,
    DarkWins,
    Draw,
}

impl Outcome {
    /// Transition over the counts of a game that is still being played: only an
    /// eliminated side ends it.
    pub fn from_counts(light: usize, dark: usize) -> Outcome {
        match (light, dark) {
            (0, 0) => Outcome::Draw,
            (_, 0) => Outcome::LightWins,
            (0, _) => Outcome::DarkWins,
            _ => Outcome::InProgress,
        }
    }

    /// Decision for a game stopped by a player: elimination first, then the side
    /// with more pieces left, and a draw on equal counts.
    pub fn on_stop(light: usize, dark: usize) -> Outcome {
        match Outcome::from_counts(light, dark) {
            Outcome::InProgress if light > dark => Outcome::LightWins,
            Outcome::InProgress if dark > light => Outcome::DarkWins,
            Outcome::InProgress => Outcome::Draw,
            decided => decided,
        }
    }

    pub fn winner(self) -> Option<PieceColour> {
        match self {
            Outcome::LightWins => Some(PieceColour::Light),
            Outcome::DarkWins => Some(PieceColour::Dark),
            Outcome::InProgress | Outcome::Draw => None,
        }
    }
}

/// The two independent checks players have always been shown when a game is
/// stopped. Both can hold at once.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinAnnouncements {
    pub light_won: bool,
    pub dark_eliminated: bool,
}

impl WinAnnouncements {
    pub fn from_counts(light: usize, dark: usize) -> WinAnnouncements {
        WinAnnouncements {
            light_won: light > dark,
            dark_eliminated: dark == 0,
        }
    }
}
