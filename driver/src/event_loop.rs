//! Single-threaded event loop tying the session to the network and the player.

use std::io::{self, BufRead, ErrorKind, Read, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::GameRequest;
use http::Request;
use mio::event::Event;
use mio::net::TcpStream;
use mio::{Events, Interest, Poll, Token, Waker};
use session::{
    ClickOutcome, Delivery, OpponentWatch, Outbound, ResponseError, Session, SessionError,
    SubmitError, Ticket,
};
use slab::Slab;
use thiserror::Error;
use url::Url;

use crate::command::Command;
use crate::config::{Config, ConfigError};
use crate::exchange::{encode_request, parse_head, parse_response, redirect_target};
use crate::stream::EventStreamDecoder;

const INPUT: Token = Token(0);
const FIRST_EXCHANGE: Token = Token(1);

const MAX_REDIRECTS: u8 = 5;
/// Largest response head and body accepted from the server.
const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;
const WATCH_RETRY: Duration = Duration::from_secs(3);

fn exchange_token(index: usize) -> Token {
    Token(index + FIRST_EXCHANGE.0)
}

fn exchange_untoken(token: Token) -> usize {
    token.0 - FIRST_EXCHANGE.0
}

fn is_exchange(token: Token) -> bool {
    token.0 >= FIRST_EXCHANGE.0
}

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not start the game: {0}")]
    Session(#[from] SessionError),
}

/// Why an exchange ended before the server closed the connection.
#[derive(Error, Debug)]
enum ExchangeError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Response(#[from] ResponseError),
}

impl From<ExchangeError> for SubmitError {
    fn from(e: ExchangeError) -> SubmitError {
        match e {
            ExchangeError::Io(e) => SubmitError::Network(e),
            ExchangeError::Response(e) => SubmitError::MalformedResponse(e),
        }
    }
}

/// Appends `chunk` unless that takes `incoming` past the response limit.
fn buffer_response(incoming: &mut Vec<u8>, chunk: &[u8]) -> Result<(), ResponseError> {
    if incoming.len() + chunk.len() > MAX_RESPONSE_BYTES {
        return Err(ResponseError::TooLarge { limit: MAX_RESPONSE_BYTES });
    }
    incoming.extend_from_slice(chunk);
    Ok(())
}

enum Purpose {
    /// Answer to a session request, possibly reached through redirects.
    Reply { ticket: Ticket, redirects: u8 },
    /// The long-lived move feed.
    Watch {
        decoder: EventStreamDecoder,
        head_seen: bool,
    },
}

struct Exchange {
    purpose: Purpose,
    url: Url,
    stream: TcpStream,
    outgoing: Vec<u8>,
    written: usize,
    incoming: Vec<u8>,
}

struct State<'a> {
    config: &'a Config,
    server: Url,
    poll: Poll,
    exchanges: Slab<Exchange>,
    session: Session,
    watch: OpponentWatch,
    next_watch: Option<Instant>,
    commands: Receiver<Command>,
    quit_requested: bool,
}

impl<'a> State<'a> {
    fn open(&mut self, purpose: Purpose, url: Url, request: &Request<String>) -> io::Result<()> {
        let addr = url.socket_addrs(|| Some(80))?
            .into_iter()
            .next()
            .ok_or_else(|| io::Error::new(ErrorKind::AddrNotAvailable, format!("{} did not resolve", url)))?;
        let mut stream = TcpStream::connect(addr)?;
        let outgoing = encode_request(request, &url, self.config.session_cookie.as_deref());

        let entry = self.exchanges.vacant_entry();
        self.poll.registry().register(
            &mut stream,
            exchange_token(entry.key()),
            Interest::WRITABLE,
        )?;
        debug!("Connecting to {} for {}", addr, url);

        entry.insert(Exchange {
            purpose,
            url,
            stream,
            outgoing,
            written: 0,
            incoming: Vec::new(),
        });
        Ok(())
    }

    fn send(&mut self, outbound: Outbound) {
        if let Some(slide) = outbound.slide {
            debug!("Sliding piece by ({}, {}) px", slide.dx, slide.dy);
        }

        let target = outbound.request
            .uri()
            .path_and_query()
            .map(|target| target.as_str())
            .unwrap_or("/");
        let opened = self.server
            .join(target)
            .map_err(|e| io::Error::new(ErrorKind::InvalidInput, e))
            .and_then(|url| {
                self.open(
                    Purpose::Reply { ticket: outbound.ticket, redirects: 0 },
                    url,
                    &outbound.request,
                )
            });

        if let Err(e) = opened {
            self.deliver(outbound.ticket, Err(SubmitError::Network(e)));
        }
    }

    fn deliver(&mut self, ticket: Ticket, response: Result<http::Response<Vec<u8>>, SubmitError>) {
        match self.session.on_response(ticket, response, Instant::now()) {
            Ok(Delivery::Scheduled(deadline)) => {
                debug!(
                    "Request #{} answered, refreshing in {:?}",
                    ticket,
                    deadline.saturating_duration_since(Instant::now())
                )
            }
            Ok(Delivery::Stale) => (),
            Err(e) => {
                warn!("Request #{} failed: {}", ticket, e);
                println!("! {}", e);
            }
        }
    }

    fn exchange_event(&mut self, event: &Event) {
        let index = exchange_untoken(event.token());
        if !self.exchanges.contains(index) {
            return;
        }

        if event.is_writable() || event.is_error() {
            if let Err(e) = self.write_exchange(index) {
                self.fail(index, e.into());
                return;
            }
        }

        if event.is_readable() || event.is_read_closed() {
            match self.read_exchange(index) {
                Ok(true) => self.complete(index),
                Ok(false) => (),
                Err(e) => self.fail(index, e),
            }
        }
    }

    fn write_exchange(&mut self, index: usize) -> io::Result<()> {
        let exchange = &mut self.exchanges[index];
        if let Some(e) = exchange.stream.take_error()? {
            return Err(e);
        }

        while exchange.written < exchange.outgoing.len() {
            match exchange.stream.write(&exchange.outgoing[exchange.written..]) {
                Ok(0) => {
                    return Err(io::Error::new(ErrorKind::WriteZero, "connection closed while sending"))
                }
                Ok(sent) => exchange.written += sent,
                // still connecting
                Err(ref e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::NotConnected => {
                    return Ok(())
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        self.poll.registry().reregister(
            &mut exchange.stream,
            exchange_token(index),
            Interest::READABLE,
        )
    }

    /// Reads what is available; true once the server has closed the connection.
    fn read_exchange(&mut self, index: usize) -> Result<bool, ExchangeError> {
        let mut buffer = [0; 4096];
        loop {
            let read = match self.exchanges[index].stream.read(&mut buffer) {
                Ok(0) => return Ok(true),
                Ok(read) => read,
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => return Ok(false),
                Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            self.received(index, &buffer[..read])?;
        }
    }

    fn received(&mut self, index: usize, chunk: &[u8]) -> Result<(), ExchangeError> {
        let events = {
            let exchange = &mut self.exchanges[index];
            match exchange.purpose {
                Purpose::Reply { .. } => {
                    buffer_response(&mut exchange.incoming, chunk)?;
                    Vec::new()
                }
                Purpose::Watch { ref mut decoder, head_seen: true } => decoder.feed(chunk),
                Purpose::Watch { ref mut decoder, ref mut head_seen } => {
                    buffer_response(&mut exchange.incoming, chunk)?;
                    match parse_head(&exchange.incoming)? {
                        None => Vec::new(),
                        Some((head, length)) => {
                            if !head.status().is_success() {
                                return Err(ResponseError::Head(
                                    format!("move feed answered {}", head.status()),
                                ).into());
                            }
                            info!("Following the move feed at {}", exchange.url);
                            *head_seen = true;
                            let body = exchange.incoming.split_off(length);
                            decoder.feed(&body)
                        }
                    }
                }
            }
        };

        for data in events {
            self.feed_event(&data);
        }
        Ok(())
    }

    fn feed_event(&mut self, data: &str) {
        debug!("Move feed: {}", data);
        if !self.watch.observe(data, self.session.last_move(), self.session.moves_played()) {
            return;
        }

        info!("Opponent moved, fetching the board");
        match self.session.update_board() {
            Ok(outbound) => self.send(outbound),
            Err(e) => warn!("Board update skipped: {}", e),
        }
    }

    fn complete(&mut self, index: usize) {
        let Exchange { purpose, url, mut stream, incoming, .. } = self.exchanges.remove(index);
        let _ = self.poll.registry().deregister(&mut stream);

        match purpose {
            Purpose::Reply { ticket, redirects } => {
                let response = parse_response(&incoming);
                if let Ok(ref response) = response {
                    if let Some(location) = redirect_target(response, &url) {
                        if redirects < MAX_REDIRECTS {
                            info!("Request #{} redirected to {}", ticket, location);
                            self.follow(ticket, redirects + 1, location);
                            return;
                        }
                        warn!("Request #{} redirected too many times", ticket);
                    }
                }
                self.deliver(ticket, response.map_err(SubmitError::from));
            }
            Purpose::Watch { .. } => {
                warn!("Move feed closed by the server");
                self.schedule_watch();
            }
        }
    }

    fn fail(&mut self, index: usize, e: ExchangeError) {
        let Exchange { purpose, mut stream, .. } = self.exchanges.remove(index);
        let _ = self.poll.registry().deregister(&mut stream);

        match purpose {
            Purpose::Reply { ticket, .. } => self.deliver(ticket, Err(e.into())),
            Purpose::Watch { .. } => {
                warn!("Move feed failed: {}", e);
                self.schedule_watch();
            }
        }
    }

    // Redirects are followed with a plain GET, as a browser does after a form post.
    fn follow(&mut self, ticket: Ticket, redirects: u8, location: Url) {
        let request = Request::new(String::new());
        if let Err(e) = self.open(Purpose::Reply { ticket, redirects }, location, &request) {
            self.deliver(ticket, Err(SubmitError::Network(e)));
        }
    }

    fn start_watch(&mut self) {
        let username = match self.config.watch_username {
            Some(ref username) => username.clone(),
            None => return,
        };
        let game = match self.session.game() {
            Some(game) => game.clone(),
            None => {
                self.schedule_watch();
                return;
            }
        };

        let path = GameRequest::Watch { game, username }.path();
        let opened = self.server
            .join(&path)
            .map_err(|e| io::Error::new(ErrorKind::InvalidInput, e))
            .and_then(|url| {
                let purpose = Purpose::Watch {
                    decoder: EventStreamDecoder::new(),
                    head_seen: false,
                };
                self.open(purpose, url, &Request::new(String::new()))
            });

        if let Err(e) = opened {
            warn!("Could not open the move feed: {}", e);
            self.schedule_watch();
        }
    }

    fn schedule_watch(&mut self) {
        if self.config.watch_username.is_some() {
            self.next_watch = Some(Instant::now() + WATCH_RETRY);
        }
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            self.handle_command(command);
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Click(square) => match self.session.click(square) {
                Ok(ClickOutcome::Submitted(outbound)) => self.send(outbound),
                Ok(ClickOutcome::Selected(origin)) => println!("Selected {}", origin),
                Ok(ClickOutcome::Deselected) => println!("Selection cleared"),
                Ok(ClickOutcome::Ignored(reason)) => {
                    println!("Click on {} ignored ({:?})", square, reason)
                }
                Err(e) => {
                    warn!("Click on {} failed: {}", square, e);
                    println!("! {}", e);
                }
            },
            Command::End => match self.session.check_game_end() {
                Ok(end) => {
                    println!("Light: {}, dark: {}", end.light, end.dark);
                    if end.announcements.light_won {
                        println!("Light pieces won!");
                    }
                    if end.announcements.dark_eliminated {
                        println!("Dark pieces eliminated!");
                    }
                    println!("Outcome: {:?}", end.outcome);
                    self.send(end.outbound);
                }
                Err(e) => println!("! {}", e),
            },
            Command::Update => match self.session.update_board() {
                Ok(outbound) => self.send(outbound),
                Err(e) => println!("! {}", e),
            },
            Command::Show => print!("{}", self.session.page()),
            Command::Dump => {
                let dumped = self.session
                    .snapshot()
                    .map_err(|e| e.to_string())
                    .and_then(|snapshot| {
                        serde_json::to_string_pretty(&snapshot).map_err(|e| e.to_string())
                    });
                match dumped {
                    Ok(json) => println!("{}", json),
                    Err(e) => println!("! {}", e),
                }
            }
            Command::Quit => self.quit_requested = true,
        }
    }

    fn finished(&self) -> bool {
        self.quit_requested && !self.session.is_locked()
    }
}

fn spawn_input(sender: Sender<Command>, waker: Arc<Waker>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => break,
            };
            if line.trim().is_empty() {
                continue;
            }
            match line.parse() {
                Ok(command) => if sender.send(command).is_err() {
                    return;
                },
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            }
            if waker.wake().is_err() {
                return;
            }
        }
        let _ = sender.send(Command::Quit);
        let _ = waker.wake();
    });
}

/// Joins the configured game and plays it from stdin until `quit` or end of input.
pub fn run(config: &Config) -> Result<(), DriverError> {
    let server = config.server_url()?;
    let poll = Poll::new()?;
    let waker = Arc::new(Waker::new(poll.registry(), INPUT)?);
    let (sender, commands) = mpsc::channel();
    spawn_input(sender, waker);

    let mut state = State {
        config,
        server,
        poll,
        exchanges: Slab::new(),
        session: Session::new(config.settings(), config.game(), config.csrf()),
        watch: OpponentWatch::new(),
        next_watch: None,
        commands,
        quit_requested: false,
    };

    let join = state.session.join()?;
    state.send(join);
    if config.watch_username.is_some() {
        state.next_watch = Some(Instant::now());
    }

    let mut events = Events::with_capacity(1024);

    while !state.finished() {
        let now = Instant::now();

        if let Some(refreshed) = state.session.poll_refresh(now) {
            debug!("Page generation {} installed", refreshed.generation);
            print!("{}", state.session.page());
        }

        if let Some(next_watch) = state.next_watch {
            if now >= next_watch {
                state.next_watch = None;
                state.start_watch();
            }
        }

        let timeout = [state.session.next_deadline(), state.next_watch]
            .iter()
            .filter_map(|deadline| *deadline)
            .min()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()));

        if let Err(e) = state.poll.poll(&mut events, timeout) {
            if e.kind() == ErrorKind::Interrupted {
                continue;
            }
            return Err(e.into());
        }

        for event in events.iter() {
            match event.token() {
                INPUT => state.drain_commands(),
                token if is_exchange(token) => state.exchange_event(event),
                Token(_) => (),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_tokens_skip_the_input_waker() {
        assert_eq!(exchange_token(0), FIRST_EXCHANGE);
        assert_eq!(exchange_untoken(exchange_token(7)), 7);
        assert!(!is_exchange(INPUT));
    }

    #[test]
    fn oversized_response_is_malformed() {
        let mut incoming = vec![0; MAX_RESPONSE_BYTES - 2];

        buffer_response(&mut incoming, b"ok").unwrap();
        let error = buffer_response(&mut incoming, b"!").unwrap_err();
        assert_eq!(incoming.len(), MAX_RESPONSE_BYTES);

        match SubmitError::from(ExchangeError::from(error)) {
            SubmitError::MalformedResponse(ResponseError::TooLarge { limit }) => {
                assert_eq!(limit, MAX_RESPONSE_BYTES)
            }
            other => panic!("expected malformed response, got {:?}", other),
        }
    }
}
