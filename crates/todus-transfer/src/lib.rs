//! Transfer orchestration for the ToDus client.
//!
//! An [`Orchestrator`] pushes file parts (or whole files) through
//! reserve-then-PUT and pulls downloads through resolve-then-GET. Every network
//! step runs on a shared [`TaskRunner`](todus_task::TaskRunner) so a hung socket
//! is cut at its deadline. Failures back off, log in again and retry; progress
//! of split uploads is kept in a [`Manifest`] so a rerun skips finished parts.

mod account;
mod config;
mod error;
mod event;
mod job;
mod manifest;
mod orchestrator;

pub use account::{Account, AccountStore};
pub use config::{RetryPolicy, TransferConfig};
pub use error::{Result, TransferError};
pub use event::{NoopObserver, Observer, TransferEvent};
pub use job::{DownloadJob, share_link};
pub use manifest::{Manifest, ManifestEntry, parse_entries};
pub use orchestrator::{Orchestrator, Summary};
