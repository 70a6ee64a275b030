use std::time::Duration;

use todus_proto::FileType;

/// How many times a failed transfer is tried again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// Keep retrying until success, a fatal error or an abort.
    #[default]
    Infinite,
    /// At most this many retries after the first failure.
    Limited(u32),
}

impl RetryPolicy {
    pub fn from_max_retries(max: Option<u32>) -> Self {
        max.map_or(Self::Infinite, Self::Limited)
    }

    /// Whether another attempt is allowed after `failures` failed ones.
    pub fn allows_retry(&self, failures: u32) -> bool {
        match self {
            Self::Infinite => true,
            Self::Limited(max) => failures <= *max,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Deadline of one login or one handshake negotiation.
    pub negotiation_timeout: Duration,
    /// Deadline of one PUT or one (possibly resumed) GET.
    pub transfer_timeout:    Duration,
    pub upload_backoff:      Duration,
    pub download_backoff:    Duration,
    pub retry:               RetryPolicy,
    pub upload_workers:      usize,
    pub download_workers:    usize,
    pub file_type:           FileType,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            negotiation_timeout: Duration::from_secs(60),
            transfer_timeout:    Duration::from_secs(60 * 60),
            upload_backoff:      Duration::from_secs(15),
            download_backoff:    Duration::from_secs(15),
            retry:               RetryPolicy::Infinite,
            upload_workers:      1,
            download_workers:    4,
            file_type:           FileType::Voice,
        }
    }
}
