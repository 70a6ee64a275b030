use std::future::Future;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio::sync::{RwLock, Semaphore};
use tokio_util::sync::CancellationToken;
use todus_fetch::ServiceClient;
use todus_fs::Part;
use todus_proto::UrlBroker;
use todus_task::{RunError, TaskRunner};
use tracing::{debug, info, warn};

use crate::account::AccountStore;
use crate::config::TransferConfig;
use crate::error::{Result, TransferError};
use crate::event::{NoopObserver, Observer, TransferEvent};
use crate::job::DownloadJob;
use crate::manifest::Manifest;

/// Counts of a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub transferred: usize,
    pub skipped:     usize,
}

enum Done {
    Transferred,
    Skipped,
}

/// Drives uploads and downloads for one account.
///
/// Network steps run on one [`TaskRunner`] tied to the orchestrator's
/// cancellation token, so [`abort`](Self::abort) stops every worker at once.
pub struct Orchestrator<B, A> {
    broker:   Arc<B>,
    http:     ServiceClient,
    accounts: A,
    runner:   TaskRunner,
    cancel:   CancellationToken,
    config:   TransferConfig,
    token:    RwLock<String>,
    observer: Arc<dyn Observer>,
}

impl<B, A> Orchestrator<B, A>
where
    B: UrlBroker + 'static,
    A: AccountStore,
{
    pub fn new(broker: B, http: ServiceClient, accounts: A, config: TransferConfig) -> Self {
        let cancel = CancellationToken::new();
        Self {
            broker: Arc::new(broker),
            http,
            accounts,
            runner: TaskRunner::with_cancellation(cancel.clone()),
            cancel,
            config,
            token: RwLock::new(String::new()),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &TransferConfig { &self.config }

    pub fn broker(&self) -> &B { &self.broker }

    /// Token that aborts this orchestrator when cancelled.
    pub fn cancellation(&self) -> CancellationToken { self.cancel.clone() }

    /// Stop everything in flight; the running batch fails with `Aborted`.
    pub fn abort(&self) {
        info!("transfer aborted");
        self.cancel.cancel();
    }

    /// Log the current account in and keep its token for later requests.
    pub async fn login(&self) -> Result<String> {
        let account = self.accounts.current_account();
        if !account.is_registered() {
            return Err(TransferError::NotRegistered { phone: account.phone_identity });
        }

        let http = self.http.clone();
        let (phone, password) = (account.phone_identity.clone(), account.password.clone());
        let login = async move { http.login(&phone, &password).await };

        match self.runner.run(login, self.config.negotiation_timeout).await {
            Ok(token) => {
                debug!(phone = %account.phone_identity, "logged in");
                *self.token.write().await = token.clone();
                Ok(token)
            }
            Err(RunError::Failed(todus_fetch::Error::Unauthorized)) => {
                warn!(phone = %account.phone_identity, "password rejected");
                self.accounts.on_auth_expired(&account);
                Err(TransferError::Authentication { phone: account.phone_identity })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Upload `parts` of a split file, skipping those `manifest` lists.
    ///
    /// Each uploaded part is recorded in the manifest and then deleted.
    pub async fn upload_parts(&self, manifest: &Manifest, parts: &[Part]) -> Result<Summary> {
        self.login().await?;
        info!(parts = parts.len(), recorded = manifest.len().await, "split upload started");

        let slots = Semaphore::new(self.config.upload_workers.max(1));
        let slots = &slots;
        let mut pending: FuturesUnordered<_> = parts
            .iter()
            .map(|part| async move {
                let _slot = slots.acquire().await.map_err(|_| TransferError::Aborted)?;
                self.upload_part(manifest, part).await
            })
            .collect();

        let mut summary = Summary::default();
        while let Some(done) = pending.next().await {
            summary.count(done?);
        }
        Ok(summary)
    }

    async fn upload_part(&self, manifest: &Manifest, part: &Part) -> Result<Done> {
        if manifest.contains(&part.name).await {
            self.observer.on_event(TransferEvent::Skipping { name: &part.name });
            remove_if_present(&part.path).await?;
            return Ok(Done::Skipped);
        }

        self.observer.on_event(TransferEvent::Uploading { name: &part.name });
        let data = Bytes::from(tokio::fs::read(&part.path).await?);
        let url = self
            .with_retries(&part.name, self.config.upload_backoff, || self.put_once(data.clone()))
            .await?;

        manifest.record(&url, &part.name).await?;
        tokio::fs::remove_file(&part.path).await?;
        self.observer.on_event(TransferEvent::Uploaded { name: &part.name });
        Ok(Done::Transferred)
    }

    /// Upload one whole file and return its download URL.
    pub async fn upload_file(&self, path: &Path) -> Result<String> {
        self.login().await?;
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

        self.observer.on_event(TransferEvent::Uploading { name: &name });
        let data = Bytes::from(tokio::fs::read(path).await?);
        let url = self
            .with_retries(&name, self.config.upload_backoff, || self.put_once(data.clone()))
            .await?;
        self.observer.on_event(TransferEvent::Uploaded { name: &name });
        Ok(url)
    }

    /// Reserve a slot for `data`, PUT it, return the download URL.
    async fn put_once(&self, data: Bytes) -> Result<String> {
        let token = self.token.read().await.clone();

        let broker = self.broker.clone();
        let (size, file_type) = (data.len() as u64, self.config.file_type);
        let reserve_token = token.clone();
        let reserve = async move { broker.reserve(&reserve_token, size, file_type).await };
        let reservation = self.runner.run(reserve, self.config.negotiation_timeout).await?;

        let http = self.http.clone();
        let upload_url = reservation.upload_url;
        let put = async move { http.upload(&token, &upload_url, data).await };
        self.runner.run(put, self.config.transfer_timeout).await?;

        Ok(reservation.download_url)
    }

    /// Download every job with up to `download_workers` at a time.
    pub async fn download_all(&self, jobs: &[DownloadJob]) -> Result<Summary> {
        self.login().await?;

        let slots = Semaphore::new(self.config.download_workers.max(1));
        let slots = &slots;
        let mut pending: FuturesUnordered<_> = jobs
            .iter()
            .map(|job| async move {
                let _slot = slots.acquire().await.map_err(|_| TransferError::Aborted)?;
                self.download(job).await
            })
            .collect();

        let mut summary = Summary::default();
        while let Some(done) = pending.next().await {
            summary.count(if done?.is_some() { Done::Transferred } else { Done::Skipped });
        }
        Ok(summary)
    }

    /// Download one job unless its target already exists; returns the size.
    pub async fn download(&self, job: &DownloadJob) -> Result<Option<u64>> {
        let name = job.name();
        if tokio::fs::try_exists(&job.target).await? {
            self.observer.on_event(TransferEvent::Skipping { name: &name });
            return Ok(None);
        }

        self.observer.on_event(TransferEvent::Downloading { name: &name, url: &job.url });
        let size = self
            .with_retries(&name, self.config.download_backoff, || self.fetch_once(job, &name))
            .await?;
        self.observer.on_event(TransferEvent::Downloaded { name: &name, size });
        Ok(Some(size))
    }

    async fn fetch_once(&self, job: &DownloadJob, name: &str) -> Result<u64> {
        let token = self.token.read().await.clone();

        let broker = self.broker.clone();
        let (resolve_token, stored_url) = (token.clone(), job.url.clone());
        let resolve = async move { broker.resolve(&resolve_token, &stored_url).await };
        let url = self.runner.run(resolve, self.config.negotiation_timeout).await?;

        let http = self.http.clone();
        let target = job.target.clone();
        let observer = self.observer.clone();
        let name = name.to_string();
        let get = async move {
            let progress = |pos, total| observer.on_event(TransferEvent::Progress { name: &name, pos, total });
            http.download(&token, &url, &target, progress).await
        };
        Ok(self.runner.run(get, self.config.transfer_timeout).await?)
    }

    /// Run `attempt` until it succeeds, fails fatally or the policy gives up.
    ///
    /// Between attempts: back off, then log in again.
    async fn with_retries<T, F, Fut>(&self, subject: &str, backoff: Duration, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut failures = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(TransferError::Aborted);
            }
            let err = match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => err,
            };

            failures += 1;
            warn!(subject, failures, error = %err, "transfer attempt failed");
            if !self.config.retry.allows_retry(failures) {
                return Err(TransferError::RetriesExhausted {
                    subject:  subject.to_string(),
                    attempts: failures,
                    last:     Box::new(err),
                });
            }

            self.pause(backoff).await?;
            match self.login().await {
                Ok(_) => {}
                Err(login_err) if login_err.is_fatal() => return Err(login_err),
                Err(login_err) => warn!(subject, error = %login_err, "login before retry failed"),
            }
            self.observer.on_event(TransferEvent::Retrying { name: subject, error: &err });
        }
    }

    async fn pause(&self, backoff: Duration) -> Result<()> {
        tokio::select! {
            _ = tokio::time::sleep(backoff) => Ok(()),
            _ = self.cancel.cancelled() => Err(TransferError::Aborted),
        }
    }
}

impl Summary {
    fn count(&mut self, done: Done) {
        match done {
            Done::Transferred => self.transferred += 1,
            Done::Skipped => self.skipped += 1,
        }
    }
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(err) if err.kind() != ErrorKind::NotFound => Err(err.into()),
        _ => Ok(()),
    }
}
