//! Error types for todus-proto.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed bearer token: {0}")]
    MalformedToken(String),

    #[error("token rejected by the handshake server (not-authorized)")]
    NotAuthorized,

    #[error("handshake stream closed by the server")]
    EndOfStream,

    #[error("no handshake data within {0:?}")]
    Timeout(Duration),

    #[error("unexpected handshake response: {0}")]
    UnexpectedResponse(String),

    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
