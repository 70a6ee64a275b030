use std::time::Duration;

use thiserror::Error;
use todus_task::RunError;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("session expired for account {phone}")]
    Authentication { phone: String },

    #[error("malformed bearer token: {0}")]
    MalformedToken(String),

    #[error("operation aborted")]
    Aborted,

    #[error("account {phone} is not registered, login first")]
    NotRegistered { phone: String },

    #[error("giving up on {subject} after {attempts} failed attempts")]
    RetriesExhausted {
        subject:  String,
        attempts: u32,
        #[source]
        last:     Box<TransferError>,
    },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("handshake failed: {0}")]
    Broker(#[source] todus_proto::Error),

    #[error(transparent)]
    Http(todus_fetch::Error),

    #[error(transparent)]
    Fs(#[from] todus_fs::Error),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transfer task panicked: {0}")]
    Panicked(String),
}

impl TransferError {
    /// Retrying cannot help; the whole run stops.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. }
                | Self::MalformedToken(_)
                | Self::Aborted
                | Self::NotRegistered { .. }
                | Self::RetriesExhausted { .. }
                | Self::Fs(_)
                | Self::Io(_)
        )
    }
}

impl From<todus_proto::Error> for TransferError {
    fn from(err: todus_proto::Error) -> Self {
        match err {
            todus_proto::Error::MalformedToken(msg) => Self::MalformedToken(msg),
            other => Self::Broker(other),
        }
    }
}

impl From<todus_fetch::Error> for TransferError {
    fn from(err: todus_fetch::Error) -> Self { Self::Http(err) }
}

impl<E> From<RunError<E>> for TransferError
where
    E: Into<TransferError>,
{
    fn from(err: RunError<E>) -> Self {
        match err {
            RunError::Timeout(limit) => Self::Timeout(limit),
            RunError::Aborted => Self::Aborted,
            RunError::Failed(err) => err.into(),
            RunError::Panicked(msg) => Self::Panicked(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransferError>;
