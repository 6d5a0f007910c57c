//! Requests understood by the game server, and their form encoding.

use url::form_urlencoded::Serializer;

use crate::{BoardSnapshot, GameIdentity, LastMove, MoveIntent};

pub const CSRF_HEADER: &str = "X-CSRFToken";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameRequest {
    /// Opens the play page of a game.
    Join(GameIdentity),
    Submit {
        game: GameIdentity,
        intent: MoveIntent,
        snapshot: BoardSnapshot,
        last_move: LastMove,
    },
    Stop {
        game: GameIdentity,
        light_pieces: usize,
        dark_pieces: usize,
    },
    /// Asks for the board as recorded by the server, after the opponent moved.
    Update(GameIdentity),
    /// Event stream announcing the colour of the latest recorded move.
    Watch {
        game: GameIdentity,
        username: String,
    },
}

impl GameRequest {
    pub fn method(&self) -> Method {
        match *self {
            GameRequest::Join(_) | GameRequest::Watch { .. } => Method::Get,
            _ => Method::Post,
        }
    }

    /// Path relative to the server root.
    pub fn path(&self) -> String {
        match *self {
            GameRequest::Join(ref game) => format!("/join_game/{}", game),
            GameRequest::Submit { intent: MoveIntent::FirstMove { .. }, ref game, .. } => {
                format!("/first_move/{}", game)
            }
            GameRequest::Submit { intent: MoveIntent::Move { .. }, .. } => "/move".to_owned(),
            GameRequest::Stop { ref game, .. } => format!("/stop_game/{}", game),
            GameRequest::Update(ref game) => format!("/update_board/{}", game),
            GameRequest::Watch { ref game, ref username } => {
                format!("/stream/{}&{}", game, username)
            }
        }
    }

    /// Requests that change game state and so must carry the CSRF header.
    pub fn is_state_mutating(&self) -> bool {
        match *self {
            GameRequest::Submit { .. } | GameRequest::Stop { .. } => true,
            _ => false,
        }
    }

    /// Form body for POST requests, `None` for GET.
    pub fn form_body(&self) -> Option<String> {
        let mut form = Serializer::new(String::new());
        match *self {
            GameRequest::Join(_) | GameRequest::Watch { .. } => return None,
            GameRequest::Submit { ref intent, ref snapshot, ref last_move, .. } => {
                match *intent {
                    MoveIntent::FirstMove { target } => {
                        form.append_pair("x", &target.x.to_string());
                        form.append_pair("y", &target.y.to_string());
                        append_snapshot(&mut form, snapshot);
                    }
                    MoveIntent::Move { origin, target, board_size } => {
                        form.append_pair("cur_x", &origin.x.to_string());
                        form.append_pair("cur_y", &origin.y.to_string());
                        form.append_pair("dst_x", &target.x.to_string());
                        form.append_pair("dst_y", &target.y.to_string());
                        append_snapshot(&mut form, snapshot);
                        form.append_pair("board_size", &board_size.to_string());
                    }
                }
                form.append_pair("last_move", last_move.as_str());
            }
            GameRequest::Stop { light_pieces, dark_pieces, .. } => {
                form.append_pair("light_pieces", &light_pieces.to_string());
                form.append_pair("dark_pieces", &dark_pieces.to_string());
            }
            GameRequest::Update(_) => (),
        }
        Some(form.finish())
    }
}

// Nested-array layout the server reads back as `pieces[i][x]`; an empty
// board sends no `pieces` keys at all, only the count.
fn append_snapshot(form: &mut Serializer<String>, snapshot: &BoardSnapshot) {
    for (i, piece) in snapshot.pieces().iter().enumerate() {
        form.append_pair(&format!("pieces[{}][x]", i), &piece.x.to_string());
        form.append_pair(&format!("pieces[{}][y]", i), &piece.y.to_string());
        form.append_pair(&format!("pieces[{}][color]", i), piece.colour.wire_name());
    }
    form.append_pair("pieces_count", &snapshot.len().to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Coord, Piece, PieceColour};

    fn game() -> GameIdentity {
        GameIdentity("game01".to_owned())
    }

    fn snapshot() -> BoardSnapshot {
        BoardSnapshot::new(vec![
            Piece { x: 2, y: 3, colour: PieceColour::Dark },
            Piece { x: 5, y: 0, colour: PieceColour::Light },
        ]).unwrap()
    }

    #[test]
    fn first_move_on_empty_board_sends_only_the_count() {
        let request = GameRequest::Submit {
            game: game(),
            intent: MoveIntent::FirstMove { target: Coord::new(4, 4) },
            snapshot: BoardSnapshot::default(),
            last_move: LastMove(None),
        };

        assert_eq!(request.method(), Method::Post);
        assert_eq!(request.path(), "/first_move/game01");
        assert_eq!(
            request.form_body().unwrap(),
            "x=4&y=4&pieces_count=0&last_move="
        );
    }

    #[test]
    fn move_encodes_origin_destination_and_pieces() {
        let request = GameRequest::Submit {
            game: game(),
            intent: MoveIntent::Move {
                origin: Coord::new(2, 3),
                target: Coord::new(3, 4),
                board_size: 9,
            },
            snapshot: snapshot(),
            last_move: LastMove(Some("light".to_owned())),
        };

        assert_eq!(request.path(), "/move");
        assert!(request.is_state_mutating());
        assert_eq!(
            request.form_body().unwrap(),
            "cur_x=2&cur_y=3&dst_x=3&dst_y=4\
             &pieces%5B0%5D%5Bx%5D=2&pieces%5B0%5D%5By%5D=3&pieces%5B0%5D%5Bcolor%5D=DarkPiece\
             &pieces%5B1%5D%5Bx%5D=5&pieces%5B1%5D%5By%5D=0&pieces%5B1%5D%5Bcolor%5D=LightPiece\
             &pieces_count=2&board_size=9&last_move=light"
        );
    }

    #[test]
    fn stop_reports_both_counts() {
        let request = GameRequest::Stop { game: game(), light_pieces: 5, dark_pieces: 0 };

        assert_eq!(request.path(), "/stop_game/game01");
        assert_eq!(request.form_body().unwrap(), "light_pieces=5&dark_pieces=0");
        assert!(request.is_state_mutating());
    }

    #[test]
    fn update_and_join_carry_no_csrf() {
        let update = GameRequest::Update(game());
        let join = GameRequest::Join(game());

        assert_eq!(update.form_body().unwrap(), "");
        assert!(!update.is_state_mutating());
        assert_eq!(join.method(), Method::Get);
        assert_eq!(join.path(), "/join_game/game01");
        assert!(join.form_body().is_none());
    }

    #[test]
    fn watch_path_joins_game_and_user() {
        let watch = GameRequest::Watch { game: game(), username: "alice".to_owned() };

        assert_eq!(watch.path(), "/stream/game01&alice");
        assert_eq!(watch.method(), Method::Get);
    }
}
