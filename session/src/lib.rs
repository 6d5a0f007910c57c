extern crate common;
extern crate http;
extern crate itertools;
extern crate scraper;
extern crate thiserror;

#[macro_use]
extern crate log;

pub mod bindings;
pub mod error;
pub mod page;
mod render;
pub mod scanner;
pub mod session;
pub mod watch;

pub use bindings::Bindings;
pub use error::{ResponseError, ScanError, SessionError, SubmitError};
pub use page::{Page, PageConfig};
pub use scanner::scan;
pub use session::{
    ClickOutcome, Delivery, GameEnd, IgnoreReason, Outbound, Refreshed, Session, Settings, Slide,
    Ticket,
};
pub use watch::OpponentWatch;
