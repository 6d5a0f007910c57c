//! Which squares react to clicks on the installed page.

use common::Coord;
use itertools::Itertools;

use crate::page::Page;

/// One click handler per playable square of one installed page. Installing a
/// new page builds a fresh set with the next generation; nothing carries over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    generation: u64,
    squares: Vec<Coord>,
}

impl Bindings {
    /// Binds the dark squares: cells whose row and column positions have odd
    /// sum, as in `tr:nth-child(odd) td:nth-child(even), tr:nth-child(even) td:nth-child(odd)`.
    /// Cells without coordinates cannot be reported to the server and stay unbound.
    pub fn bind(page: &Page, generation: u64) -> Bindings {
        let squares = page.rows()
            .iter()
            .flat_map(|row| {
                row.cells
                    .iter()
                    .filter(move |cell| (row.position + cell.position) % 2 == 1)
                    .filter_map(|cell| cell.coord)
            })
            .unique()
            .collect();

        Bindings { generation, squares }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_bound(&self, square: Coord) -> bool {
        self.handlers_for(square) > 0
    }

    pub fn handlers_for(&self, square: Coord) -> usize {
        self.squares.iter().filter(|&&bound| bound == square).count()
    }

    pub fn squares(&self) -> &[Coord] {
        &self.squares
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(size: u32) -> Page {
        let mut markup = String::from("<table>");
        for y in 0..size {
            markup.push_str("<tr>");
            for x in 0..size {
                markup.push_str(&format!(r#"<td data-x="{}" data-y="{}"/>"#, x, y));
            }
            markup.push_str("</tr>");
        }
        markup.push_str("</table>");
        Page::parse(&markup)
    }

    #[test]
    fn binds_only_dark_squares() {
        let bindings = Bindings::bind(&page(3), 1);

        assert_eq!(
            bindings.squares(),
            &[Coord::new(1, 0), Coord::new(0, 1), Coord::new(2, 1), Coord::new(1, 2)]
        );
        assert!(!bindings.is_bound(Coord::new(0, 0)));
        assert!(bindings.is_bound(Coord::new(2, 1)));
    }

    #[test]
    fn rebinding_never_duplicates_handlers() {
        let page = page(9);
        let first = Bindings::bind(&page, 1);
        let second = Bindings::bind(&page, 2);

        assert_eq!(first.squares(), second.squares());
        assert_eq!(second.generation(), 2);
        assert_eq!(second.handlers_for(Coord::new(3, 0)), 1);
    }

    #[test]
    fn cells_without_coordinates_stay_unbound() {
        let page = Page::parse(r#"<table><tr><td/><td/></tr></table>"#);

        assert!(Bindings::bind(&page, 1).squares().is_empty());
    }

    #[test]
    fn empty_page_binds_nothing() {
        assert!(Bindings::bind(&Page::empty(), 0).squares().is_empty());
    }
}
