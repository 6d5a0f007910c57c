//! Reconstructs the board snapshot from the pieces rendered on a page.

use common::{BoardSnapshot, Piece, PieceColour};

use crate::error::ScanError;
use crate::page::{Page, PieceMarker};

/// Reads every rendered piece, in document order. A page without pieces gives
/// an empty snapshot.
pub fn scan(page: &Page) -> Result<BoardSnapshot, ScanError> {
    let pieces = page.pieces()
        .iter()
        .enumerate()
        .map(|(index, marker)| read_piece(index, marker))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BoardSnapshot::new(pieces)?)
}

fn read_piece(index: usize, marker: &PieceMarker) -> Result<Piece, ScanError> {
    let colour = match (marker.dark, marker.light) {
        (true, false) => PieceColour::Dark,
        (false, true) => PieceColour::Light,
        (false, false) => return Err(ScanError::MissingColour { index }),
        (true, true) => return Err(ScanError::ConflictingColour { index }),
    };

    Ok(Piece {
        x: read_coordinate(index, 'x', marker.x.as_ref())?,
        y: read_coordinate(index, 'y', marker.y.as_ref())?,
        colour,
    })
}

fn read_coordinate(index: usize, axis: char, value: Option<&String>) -> Result<u32, ScanError> {
    let value = value.ok_or(ScanError::MissingCoordinate { index, axis })?;
    value.trim().parse().map_err(|_| ScanError::InvalidCoordinate {
        index,
        axis,
        value: value.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Coord, DuplicateSquare};
    use proptest::collection::btree_map;
    use proptest::prelude::*;

    fn board(size: u32, pieces: &[(u32, u32, &str)]) -> String {
        let mut markup = String::from("<table>");
        for y in 0..size {
            markup.push_str("<tr>");
            for x in 0..size {
                markup.push_str(&format!(r#"<td data-x="{}" data-y="{}">"#, x, y));
                for &(px, py, class) in pieces {
                    if (px, py) == (x, y) {
                        markup.push_str(&format!(r#"<div class="{}"></div>"#, class));
                    }
                }
                markup.push_str("</td>");
            }
            markup.push_str("</tr>");
        }
        markup.push_str("</table>");
        markup
    }

    fn scan_markup(markup: &str) -> Result<BoardSnapshot, ScanError> {
        scan(&Page::parse(markup))
    }

    #[test]
    fn empty_board_gives_empty_snapshot() {
        let snapshot = scan_markup(&board(9, &[])).unwrap();

        assert!(snapshot.is_empty());
    }

    #[test]
    fn page_without_board_gives_empty_snapshot() {
        assert!(scan(&Page::empty()).unwrap().is_empty());
    }

    #[test]
    fn pieces_come_out_in_document_order() {
        let snapshot = scan_markup(&board(3, &[
            (2, 1, "board__piece board__piece--light"),
            (1, 0, "board__piece board__piece--dark"),
        ])).unwrap();

        assert_eq!(
            snapshot.pieces(),
            &[
                Piece { x: 1, y: 0, colour: PieceColour::Dark },
                Piece { x: 2, y: 1, colour: PieceColour::Light },
            ]
        );
    }

    #[test]
    fn piece_without_colour_is_an_integrity_error() {
        let result = scan_markup(&board(3, &[
            (0, 0, "board__piece board__piece--dark"),
            (1, 1, "board__piece"),
        ]));

        assert_eq!(result, Err(ScanError::MissingColour { index: 1 }));
    }

    #[test]
    fn piece_with_both_colours_is_an_integrity_error() {
        let result = scan_markup(&board(3, &[
            (1, 1, "board__piece board__piece--dark board__piece--light"),
        ]));

        assert_eq!(result, Err(ScanError::ConflictingColour { index: 0 }));
    }

    #[test]
    fn stacked_pieces_are_an_integrity_error() {
        let result = scan_markup(&board(3, &[
            (1, 1, "board__piece board__piece--dark"),
            (1, 1, "board__piece board__piece--light"),
        ]));

        assert_eq!(
            result,
            Err(ScanError::Duplicate(DuplicateSquare(Coord::new(1, 1))))
        );
    }

    #[test]
    fn coordinates_come_from_the_parent_cell() {
        let missing = scan_markup(
            r#"<table><tr><td data-y="0"><div class="board__piece board__piece--dark"></div></td></tr></table>"#,
        );
        let invalid = scan_markup(
            r#"<table><tr><td data-x="a" data-y="0"><div class="board__piece board__piece--dark"></div></td></tr></table>"#,
        );

        assert_eq!(missing, Err(ScanError::MissingCoordinate { index: 0, axis: 'x' }));
        assert_eq!(
            invalid,
            Err(ScanError::InvalidCoordinate { index: 0, axis: 'x', value: "a".to_owned() })
        );
    }

    proptest! {
        #[test]
        fn scan_returns_every_rendered_piece_once(
            layout in btree_map((0u32..9, 0u32..9), any::<bool>(), 0..40)
        ) {
            let pieces: Vec<_> = layout.iter()
                .map(|(&(x, y), &dark)| {
                    let class = if dark {
                        "board__piece board__piece--dark"
                    } else {
                        "board__piece board__piece--light"
                    };
                    (x, y, class)
                })
                .collect();

            let snapshot = scan_markup(&board(9, &pieces)).unwrap();

            prop_assert_eq!(snapshot.len(), layout.len());
            for (&(x, y), &dark) in &layout {
                let colour = if dark { PieceColour::Dark } else { PieceColour::Light };
                prop_assert_eq!(
                    snapshot.piece_at(Coord::new(x, y)).map(|p| p.colour),
                    Some(colour)
                );
            }
        }
    }
}
