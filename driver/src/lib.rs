extern crate common;
extern crate http;
extern crate httparse;
extern crate mio;
extern crate serde_json;
extern crate session;
extern crate slab;
extern crate thiserror;
extern crate toml;
extern crate url;

#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate log;

pub mod command;
pub mod config;
pub mod event_loop;
pub mod exchange;
pub mod stream;

pub use command::Command;
pub use config::{Config, ConfigError};
pub use event_loop::{run, DriverError};
