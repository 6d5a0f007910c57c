//! The client's game state and the move protocol built around it.
//!
//! `Session` performs no I/O. It hands out [`Outbound`] requests tagged with a
//! ticket, is told about their responses through [`Session::on_response`], and
//! installs the returned page once the refresh delay has elapsed
//! ([`Session::poll_refresh`]). Input is locked from submission until the new
//! page is installed or the request fails, so one gesture cannot be sent twice.

use std::time::{Duration, Instant};

use common::{
    BoardSnapshot, Coord, CsrfToken, GameIdentity, GamePhase, GameRequest, LastMove, Method,
    MoveIntent, Outcome, PieceColour, WinAnnouncements, CSRF_HEADER,
};
use common::protocol::FORM_CONTENT_TYPE;
use http::header::CONTENT_TYPE;
use http::{Request, Response};
use itertools::Itertools;

use crate::bindings::Bindings;
use crate::error::{ScanError, SessionError, SubmitError};
use crate::page::Page;
use crate::scanner::scan;

pub type Ticket = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Pause between a response arriving and its page being installed, so the
    /// piece slide can finish.
    pub refresh_delay: Duration,
    pub square_px: i64,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            refresh_delay: Duration::from_millis(300),
            square_px: 64,
        }
    }
}

/// Pixel offset a moved piece slides by before the page is replaced. Never sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slide {
    pub dx: i64,
    pub dy: i64,
}

#[derive(Debug)]
pub struct Outbound {
    pub ticket: Ticket,
    pub request: Request<String>,
    pub game_request: GameRequest,
    pub slide: Option<Slide>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    InputLocked,
    NotPlayable,
    EmptyOrigin,
}

#[derive(Debug)]
pub enum ClickOutcome {
    Ignored(IgnoreReason),
    Selected(Coord),
    Deselected,
    Submitted(Outbound),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The new page will be installed at this instant.
    Scheduled(Instant),
    /// Response to a request the session no longer waits for.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refreshed {
    pub generation: u64,
    pub notice: Option<String>,
}

#[derive(Debug)]
pub struct GameEnd {
    pub light: usize,
    pub dark: usize,
    pub announcements: WinAnnouncements,
    pub outcome: Outcome,
    pub outbound: Outbound,
}

#[derive(Debug)]
struct PendingRefresh {
    deadline: Instant,
    page: Page,
    snapshot: BoardSnapshot,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    ticket: Ticket,
    plays_move: bool,
}

#[derive(Debug)]
pub struct Session {
    settings: Settings,
    game: Option<GameIdentity>,
    csrf: Option<CsrfToken>,
    last_move: LastMove,
    page: Page,
    bindings: Bindings,
    phase: GamePhase,
    in_flight: Option<InFlight>,
    pending: Option<PendingRefresh>,
    next_ticket: Ticket,
    moves_played: u64,
}

impl Session {
    /// A session with nothing installed yet; the first page arrives through
    /// [`Session::join`].
    pub fn new(settings: Settings, game: Option<GameIdentity>, csrf: Option<CsrfToken>) -> Session {
        Session {
            settings,
            game,
            csrf,
            last_move: LastMove::default(),
            page: Page::empty(),
            bindings: Bindings::default(),
            phase: GamePhase::AwaitingFirstMove,
            in_flight: None,
            pending: None,
            next_ticket: 0,
            moves_played: 0,
        }
    }

    /// A session starting from an already rendered page.
    pub fn with_page(
        settings: Settings,
        page: Page,
        game: Option<GameIdentity>,
        csrf: Option<CsrfToken>,
    ) -> Result<Session, ScanError> {
        let snapshot = scan(&page)?;
        let mut session = Session::new(settings, game, csrf);
        session.install(page, &snapshot);
        Ok(session)
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn game(&self) -> Option<&GameIdentity> {
        self.game.as_ref()
    }

    pub fn last_move(&self) -> &LastMove {
        &self.last_move
    }

    /// The colour this client plays. Pages declare it as their last move.
    pub fn own_colour(&self) -> Option<PieceColour> {
        self.last_move.colour()
    }

    /// Placements and moves the server has answered so far.
    pub fn moves_played(&self) -> u64 {
        self.moves_played
    }

    pub fn is_locked(&self) -> bool {
        self.in_flight.is_some() || self.pending.is_some()
    }

    /// When the event loop must wake up to install a pending page.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.deadline)
    }

    pub fn snapshot(&self) -> Result<BoardSnapshot, ScanError> {
        scan(&self.page)
    }

    pub fn join(&mut self) -> Result<Outbound, SessionError> {
        let game = self.require_game()?;
        self.submit(GameRequest::Join(game), None)
    }

    pub fn click(&mut self, square: Coord) -> Result<ClickOutcome, SessionError> {
        if self.is_locked() {
            debug!("Click on {} ignored while a request is outstanding", square);
            return Ok(ClickOutcome::Ignored(IgnoreReason::InputLocked));
        }
        if !self.bindings.is_bound(square) {
            debug!("Click on unbound square {}", square);
            return Ok(ClickOutcome::Ignored(IgnoreReason::NotPlayable));
        }

        match self.phase {
            GamePhase::AwaitingFirstMove => {
                let intent = MoveIntent::FirstMove { target: square };
                self.submit_intent(intent, None)
            }
            GamePhase::AwaitingOrigin => {
                if self.snapshot()?.piece_at(square).is_none() {
                    debug!("No piece to pick up at {}", square);
                    return Ok(ClickOutcome::Ignored(IgnoreReason::EmptyOrigin));
                }
                self.phase = GamePhase::AwaitingDestination(square);
                Ok(ClickOutcome::Selected(square))
            }
            GamePhase::AwaitingDestination(origin) if origin == square => {
                self.phase = GamePhase::AwaitingOrigin;
                Ok(ClickOutcome::Deselected)
            }
            GamePhase::AwaitingDestination(origin) => {
                let slide = Slide {
                    dx: (i64::from(square.x) - i64::from(origin.x)) * self.settings.square_px,
                    dy: (i64::from(square.y) - i64::from(origin.y)) * self.settings.square_px,
                };
                let intent = MoveIntent::Move {
                    origin,
                    target: square,
                    board_size: self.page.board_size(),
                };
                let outcome = self.submit_intent(intent, Some(slide))?;
                self.phase = GamePhase::AwaitingOrigin;
                Ok(outcome)
            }
        }
    }

    /// Counts both sides and reports them to the server. Both announcements are
    /// evaluated independently; `outcome` is the single decision.
    pub fn check_game_end(&mut self) -> Result<GameEnd, SessionError> {
        if self.is_locked() {
            return Err(SessionError::Busy);
        }
        let game = self.require_game()?;
        let counts = self.snapshot()?.pieces().iter().map(|piece| piece.colour).counts();
        let light = counts.get(&PieceColour::Light).cloned().unwrap_or(0);
        let dark = counts.get(&PieceColour::Dark).cloned().unwrap_or(0);

        let announcements = WinAnnouncements::from_counts(light, dark);
        let outcome = Outcome::on_stop(light, dark);
        info!("Stopping game {}: {} light, {} dark, {:?}", game, light, dark, outcome);

        let outbound = self.submit(
            GameRequest::Stop { game, light_pieces: light, dark_pieces: dark },
            None,
        )?;
        Ok(GameEnd { light, dark, announcements, outcome, outbound })
    }

    /// Asks the server for the board as it has recorded it. Allowed while a
    /// refresh is pending; its page then replaces the pending one.
    pub fn update_board(&mut self) -> Result<Outbound, SessionError> {
        if self.in_flight.is_some() {
            return Err(SessionError::Busy);
        }
        let game = self.require_game()?;
        self.submit(GameRequest::Update(game), None)
    }

    /// Takes the response to `ticket`. On success the page is parsed and checked
    /// now, and installed after the refresh delay. On failure input is unlocked
    /// and the installed page stays as it was.
    pub fn on_response(
        &mut self,
        ticket: Ticket,
        response: Result<Response<Vec<u8>>, SubmitError>,
        now: Instant,
    ) -> Result<Delivery, SubmitError> {
        let in_flight = match self.in_flight {
            Some(in_flight) if in_flight.ticket == ticket => in_flight,
            _ => {
                debug!("Dropping response to stale request #{}", ticket);
                return Ok(Delivery::Stale);
            }
        };
        self.in_flight = None;

        let response = response?;
        let status = response.status();
        if !status.is_success() {
            return Err(SubmitError::ServerRejected { status });
        }

        let (page, snapshot) = parse_response(response.into_body())?;
        if in_flight.plays_move {
            self.moves_played += 1;
        }
        let deadline = now + self.settings.refresh_delay;
        if self.pending.is_some() {
            debug!("Superseding pending refresh with response to #{}", ticket);
        }
        self.pending = Some(PendingRefresh { deadline, page, snapshot });
        Ok(Delivery::Scheduled(deadline))
    }

    /// Installs the pending page once its deadline has passed.
    pub fn poll_refresh(&mut self, now: Instant) -> Option<Refreshed> {
        match self.pending {
            Some(ref pending) if pending.deadline <= now => (),
            _ => return None,
        }
        let pending = self.pending.take()?;
        self.install(pending.page, &pending.snapshot);

        Some(Refreshed {
            generation: self.bindings.generation(),
            notice: self.page.notice().map(str::to_owned),
        })
    }

    fn install(&mut self, page: Page, snapshot: &BoardSnapshot) {
        {
            let config = page.config();
            if self.game.is_none() {
                self.game = config.gamename.clone();
            }
            if let Some(ref token) = config.csrf_token {
                self.csrf = Some(token.clone());
            }
            if let Some(ref last_move) = config.last_move {
                self.last_move = last_move.clone();
            }
        }

        self.phase = page.config()
            .phase
            .unwrap_or_else(|| infer_phase(snapshot, self.own_colour()));
        self.bindings = Bindings::bind(&page, self.bindings.generation() + 1);
        self.page = page;
        info!(
            "Installed page generation {} ({} bound squares, {:?})",
            self.bindings.generation(),
            self.bindings.squares().len(),
            self.phase
        );
    }

    fn require_game(&self) -> Result<GameIdentity, SessionError> {
        self.game.clone().ok_or(SessionError::NoGame)
    }

    fn submit_intent(
        &mut self,
        intent: MoveIntent,
        slide: Option<Slide>,
    ) -> Result<ClickOutcome, SessionError> {
        let game = self.require_game()?;
        let request = GameRequest::Submit {
            game,
            intent,
            snapshot: self.snapshot()?,
            last_move: self.last_move.clone(),
        };
        let outbound = self.submit(request, slide)?;
        self.in_flight = Some(InFlight { ticket: outbound.ticket, plays_move: true });
        Ok(ClickOutcome::Submitted(outbound))
    }

    fn submit(&mut self, game_request: GameRequest, slide: Option<Slide>) -> Result<Outbound, SessionError> {
        let mut builder = Request::builder().uri(game_request.path());
        builder = match game_request.method() {
            Method::Get => builder.method(http::Method::GET),
            Method::Post => builder
                .method(http::Method::POST)
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE),
        };
        if game_request.is_state_mutating() {
            match self.csrf {
                Some(ref token) => builder = builder.header(CSRF_HEADER, token.as_str()),
                None => warn!("No CSRF token known for {}", game_request.path()),
            }
        }
        let request = builder.body(game_request.form_body().unwrap_or_default())?;

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some(InFlight { ticket, plays_move: false });
        info!("Request #{}: {} {}", ticket, request.method(), request.uri());
        debug!("Request #{} body: {}", ticket, request.body());

        Ok(Outbound { ticket, request, game_request, slide })
    }
}

fn parse_response(body: Vec<u8>) -> Result<(Page, BoardSnapshot), SubmitError> {
    let markup = String::from_utf8(body).map_err(|e| SubmitError::MalformedResponse(e.into()))?;
    let page = Page::parse(&markup);
    let snapshot = scan(&page).map_err(|e| SubmitError::MalformedResponse(e.into()))?;
    Ok((page, snapshot))
}

// Undeclared phase: a player places a first stone until one of their colour
// is on the board. With the colour unknown, only an empty board asks for one.
fn infer_phase(snapshot: &BoardSnapshot, own: Option<PieceColour>) -> GamePhase {
    let placed = match own {
        Some(colour) => snapshot.count(colour) > 0,
        None => !snapshot.is_empty(),
    };
    if placed {
        GamePhase::AwaitingOrigin
    } else {
        GamePhase::AwaitingFirstMove
    }
}
