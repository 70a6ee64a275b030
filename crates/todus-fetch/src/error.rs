//! Error types for todus-fetch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("credentials rejected by the auth service")]
    Unauthorized,

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("response carries no Content-Length")]
    MissingContentLength,

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
