//! Bounded execution of single network operations.
//!
//! [`TaskRunner::run`] spawns the operation as its own tokio task and waits for
//! its result with a deadline. Whatever happens (success, failure, timeout,
//! abort, panic) the task is torn down and joined before `run` returns, so any
//! socket or file the operation owns is closed by then.

mod error;
mod runner;

pub use error::RunError;
pub use runner::TaskRunner;
