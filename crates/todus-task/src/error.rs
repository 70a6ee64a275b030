use std::time::Duration;

use thiserror::Error;

/// Why a bounded operation produced no value.
#[derive(Debug, Error)]
pub enum RunError<E> {
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("operation aborted")]
    Aborted,

    #[error("{0}")]
    Failed(E),

    #[error("operation panicked: {0}")]
    Panicked(String),
}
