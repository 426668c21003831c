//! The virtual board: live arrival estimates and stop details, behind a captcha.

pub mod board;
pub mod captcha;
pub mod stopinfo;
pub mod time;

use crate::{page, transit};

pub use board::{LineArrivals, StopBoard};
pub use captcha::{CaptchaSolver, CommandSolver};
pub use stopinfo::{enrich_stop_metadata, VirtualBoard};
pub use time::parse_arrival_time;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Page error: {0}")]
    Page(#[from] page::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Line(#[from] transit::Error),

    #[error("Captcha error: {0}")]
    Captcha(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("unable to get info for stop {id:04}: {source}")]
    Stop {
        id: i64,
        #[source]
        source: Box<Error>,
    },
}

pub type RtResult<T> = Result<T, Error>;
