//! The server-rendered document, reduced to what the client acts on.

use common::{Coord, CsrfToken, GameIdentity, GamePhase, LastMove};
use scraper::{ElementRef, Html};

const PIECE_CLASS: &str = "board__piece";
const DARK_CLASS: &str = "board__piece--dark";
const LIGHT_CLASS: &str = "board__piece--light";
const ERROR_CLASS: &str = "board__message--error";

/// A `td` cell and where it sits among its row's elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub position: usize,
    pub coord: Option<Coord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub position: usize,
    pub cells: Vec<Cell>,
}

/// A `board__piece` element as written in the markup, before any validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceMarker {
    pub dark: bool,
    pub light: bool,
    pub x: Option<String>,
    pub y: Option<String>,
}

/// Values the server template injects into the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageConfig {
    pub gamename: Option<GameIdentity>,
    pub csrf_token: Option<CsrfToken>,
    pub last_move: Option<LastMove>,
    pub phase: Option<GamePhase>,
}

impl PageConfig {
    fn absorb(&mut self, name: &str, content: &str) {
        match name {
            "gamename" => self.gamename = Some(GameIdentity(content.to_owned())),
            "csrf-token" => self.csrf_token = Some(CsrfToken(content.to_owned())),
            "last-move" => {
                let value = if content.is_empty() { None } else { Some(content.to_owned()) };
                self.last_move = Some(LastMove(value));
            }
            "game-phase" => match GamePhase::from_declaration(content) {
                Some(phase) => self.phase = Some(phase),
                None => warn!("Ignoring unknown game phase {:?}", content),
            },
            _ => (),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    rows: Vec<Row>,
    pieces: Vec<PieceMarker>,
    config: PageConfig,
    notice: Option<String>,
}

impl Page {
    /// The page shown before the server has sent anything.
    pub fn empty() -> Page {
        Page::default()
    }

    /// Parses the document the way a browser would: unclosed and void
    /// elements are repaired, never rejected.
    pub fn parse(markup: &str) -> Page {
        let document = Html::parse_document(markup);
        let mut page = Page::default();

        for element in document.tree.root().descendants().filter_map(ElementRef::wrap) {
            match element.value().name() {
                "tr" => page.rows.push(Row {
                    position: element_position(element),
                    cells: element.children()
                        .filter_map(ElementRef::wrap)
                        .filter(|cell| cell.value().name() == "td")
                        .map(|cell| Cell {
                            position: element_position(cell),
                            coord: cell_coord(cell),
                        })
                        .collect(),
                }),
                "meta" => if let (Some(name), Some(content)) =
                    (element.value().attr("name"), element.value().attr("content"))
                {
                    page.config.absorb(name, content);
                },
                _ => (),
            }

            if has_class(element, PIECE_CLASS) {
                let cell = element.parent().and_then(ElementRef::wrap);
                page.pieces.push(PieceMarker {
                    dark: has_class(element, DARK_CLASS),
                    light: has_class(element, LIGHT_CLASS),
                    x: cell.and_then(|c| c.value().attr("data-x")).map(str::to_owned),
                    y: cell.and_then(|c| c.value().attr("data-y")).map(str::to_owned),
                });
            }

            if page.notice.is_none() && has_class(element, ERROR_CLASS) {
                let text: String = element.text().collect();
                let text = text.trim();
                if !text.is_empty() {
                    page.notice = Some(text.to_owned());
                }
            }
        }

        debug!(
            "Parsed page: {} rows, {} pieces, config {:?}",
            page.rows.len(),
            page.pieces.len(),
            page.config
        );
        page
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn pieces(&self) -> &[PieceMarker] {
        &self.pieces
    }

    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    /// Move error the server rendered alongside the board, if any.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_ref().map(String::as_str)
    }

    /// Number of rendered rows, sent as `board_size` with moves.
    pub fn board_size(&self) -> u32 {
        self.rows.len() as u32
    }
}

// 0-based index among element siblings, i.e. `nth-child` minus one.
fn element_position(element: ElementRef) -> usize {
    element.prev_siblings().filter(|n| n.value().is_element()).count()
}

fn has_class(element: ElementRef, class: &str) -> bool {
    element.value()
        .attr("class")
        .map_or(false, |classes| classes.split_whitespace().any(|c| c == class))
}

fn cell_coord(cell: ElementRef) -> Option<Coord> {
    let x = cell.value().attr("data-x")?.trim().parse().ok()?;
    let y = cell.value().attr("data-y")?.trim().parse().ok()?;
    Some(Coord::new(x, y))
}
