use std::fmt;

use common::PieceColour;

use crate::bindings::Bindings;
use crate::page::Page;
use crate::scanner::scan;

// Text view of the installed page: `x` dark, `o` light, `.` playable empty
// square, blank for the rest.
impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let snapshot = match scan(self) {
            Ok(snapshot) => snapshot,
            Err(e) => return write!(f, "<unreadable board: {}>", e),
        };
        let bindings = Bindings::bind(self, 0);

        if let Some(notice) = self.notice() {
            writeln!(f, "! {}", notice)?;
        }
        for row in self.rows() {
            let line: Vec<&str> = row.cells
                .iter()
                .map(|cell| match cell.coord {
                    Some(coord) => match snapshot.piece_at(coord).map(|p| p.colour) {
                        Some(PieceColour::Dark) => "x",
                        Some(PieceColour::Light) => "o",
                        None if bindings.is_bound(coord) => ".",
                        None => " ",
                    },
                    None => " ",
                })
                .collect();
            writeln!(f, "{}", line.join(" ").trim_end())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::page::Page;

    #[test]
    fn draws_pieces_and_playable_squares() {
        let page = Page::parse(
            r#"<table>
                <tr><td data-x="0" data-y="0"/><td data-x="1" data-y="0"><i class="board__piece board__piece--dark"></i></td></tr>
                <tr><td data-x="0" data-y="1"/><td data-x="1" data-y="1"/></tr>
                <tr><td data-x="0" data-y="2"><i class="board__piece board__piece--light"></i></td><td data-x="1" data-y="2"/></tr>
            </table>"#,
        );

        assert_eq!(page.to_string(), "  x\n.\no .\n");
    }
}
