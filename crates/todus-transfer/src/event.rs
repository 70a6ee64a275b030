use crate::error::TransferError;

/// Progress notifications emitted while a transfer runs.
#[derive(Debug, Clone, Copy)]
pub enum TransferEvent<'a> {
    /// Already uploaded or already on disk; nothing to do.
    Skipping { name: &'a str },
    Uploading { name: &'a str },
    Uploaded { name: &'a str },
    Downloading { name: &'a str, url: &'a str },
    /// Bytes of `name` on disk so far, out of `total`.
    Progress { name: &'a str, pos: u64, total: u64 },
    Downloaded { name: &'a str, size: u64 },
    Retrying { name: &'a str, error: &'a TransferError },
}

/// Receives [`TransferEvent`]s. Called from worker tasks, so keep it quick.
pub trait Observer: Send + Sync {
    fn on_event(&self, event: TransferEvent<'_>);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn on_event(&self, _event: TransferEvent<'_>) {}
}
