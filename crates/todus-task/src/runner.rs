use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::RunError;

/// Executes operations under a deadline, with a shared abort switch.
///
/// One runner is usually shared (behind an `Arc`) by all workers of a
/// transfer. [`abort`](Self::abort) is sticky: operations in flight fail with
/// [`RunError::Aborted`], and so does every later `run`.
#[derive(Debug, Default)]
pub struct TaskRunner {
    cancel:    CancellationToken,
    in_flight: AtomicUsize,
}

impl TaskRunner {
    pub fn new() -> Self { Self::default() }

    /// Runner that aborts together with `cancel`.
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self { cancel, in_flight: AtomicUsize::new(0) }
    }

    /// Run `op` in its own task and wait at most `limit` for its result.
    pub async fn run<F, T, E>(&self, op: F, limit: Duration) -> Result<T, RunError<E>>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        if self.cancel.is_cancelled() {
            return Err(RunError::Aborted);
        }

        let (tx, rx) = oneshot::channel();
        let mut task = InFlight::spawn(
            async move {
                let _ = tx.send(op.await);
            },
            &self.in_flight,
        );

        let outcome = tokio::select! {
            received = tokio::time::timeout(limit, rx) => match received {
                Ok(Ok(result)) => Some(result.map_err(RunError::Failed)),
                // Sender dropped without a value: the task died, the join result says how.
                Ok(Err(_)) => None,
                Err(_) => {
                    debug!(?limit, "bounded operation timed out");
                    Some(Err(RunError::Timeout(limit)))
                }
            },
            _ = self.cancel.cancelled() => Some(Err(RunError::Aborted)),
        };

        let joined = task.finish().await;
        match outcome {
            Some(result) => result,
            None => Err(died(joined)),
        }
    }

    /// Abort every operation in flight and refuse new ones.
    pub fn abort(&self) {
        if !self.cancel.is_cancelled() {
            debug!(in_flight = self.in_flight(), "aborting bounded operations");
        }
        self.cancel.cancel();
    }

    pub fn is_aborted(&self) -> bool { self.cancel.is_cancelled() }

    /// Number of operations currently executing.
    pub fn in_flight(&self) -> usize { self.in_flight.load(Ordering::SeqCst) }
}

/// Spawned operation plus its slot in the in-flight count.
///
/// Dropping it (for instance when the future awaiting `run` is itself
/// dropped) aborts the task.
struct InFlight<'a> {
    handle:  Option<JoinHandle<()>>,
    counter: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn spawn<F>(task: F, counter: &'a AtomicUsize) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { handle: Some(tokio::spawn(task)), counter }
    }

    /// Abort the task and wait until it has been dropped.
    async fn finish(&mut self) -> Result<(), JoinError> {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                handle.await
            }
            None => Ok(()),
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

fn died<E>(joined: Result<(), JoinError>) -> RunError<E> {
    match joined {
        Err(err) if err.is_panic() => {
            let msg = panic_message(err.into_panic());
            warn!(panic = %msg, "bounded operation panicked");
            RunError::Panicked(msg)
        }
        _ => RunError::Aborted,
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(msg) => *msg,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic payload".to_string(),
        },
    }
}
