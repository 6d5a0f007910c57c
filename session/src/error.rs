use std::io;
use std::string::FromUtf8Error;

use common::DuplicateSquare;
use http::StatusCode;
use thiserror::Error;

/// Board markup that does not describe a consistent set of pieces.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("piece #{index} carries no colour marker")]
    MissingColour { index: usize },
    #[error("piece #{index} carries both colour markers")]
    ConflictingColour { index: usize },
    #[error("piece #{index} has no {axis} coordinate")]
    MissingCoordinate { index: usize, axis: char },
    #[error("piece #{index} has invalid {axis} coordinate {value:?}")]
    InvalidCoordinate {
        index: usize,
        axis: char,
        value: String,
    },
    #[error(transparent)]
    Duplicate(#[from] DuplicateSquare),
}

#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("invalid HTTP response head: {0}")]
    Head(String),
    #[error("response body is not UTF-8")]
    Encoding(#[from] FromUtf8Error),
    #[error("response exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("page board is inconsistent: {0}")]
    Scan(#[from] ScanError),
}

/// Why a submission produced no new page.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("request failed to complete: {0}")]
    Network(#[from] io::Error),
    #[error("server rejected the request with status {status}")]
    ServerRejected { status: StatusCode },
    #[error("malformed response: {0}")]
    MalformedResponse(#[from] ResponseError),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("could not build request: {0}")]
    Request(#[from] http::Error),
    #[error("no game name is known yet")]
    NoGame,
    #[error("a request is already in flight")]
    Busy,
}
