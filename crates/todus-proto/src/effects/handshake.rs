use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::session::Session;
use crate::core::negotiate::{Negotiation, Step};
use crate::core::token;
use crate::data::{FileType, Goal, HandshakeConfig, Outcome, UrlReservation};
use crate::error::{Error, Result};

/// Source of signed transfer URLs.
///
/// # Implementations
///
/// - [`Handshake`]: production implementation over the TLS stream
/// - Scripted fakes in tests
pub trait UrlBroker: Send + Sync {
    /// Reserve an upload slot of exactly `size` bytes.
    fn reserve(
        &self,
        token: &str,
        size: u64,
        file_type: FileType,
    ) -> impl Future<Output = Result<UrlReservation>> + Send;

    /// Turn a stored download URL into one that can be fetched right now.
    fn resolve(&self, token: &str, url: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Run `negotiation` over `session` until it finishes or fails.
pub async fn drive<S>(session: &mut Session<S>, negotiation: &mut Negotiation) -> Result<Outcome>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let chunk = session.receive().await?;
        match negotiation.advance(&chunk)? {
            Step::Continue(replies) => {
                for reply in &replies {
                    session.send(reply).await?;
                }
                debug!(sid = negotiation.sid(), state = ?negotiation.state(), sent = replies.len(), "handshake step");
            }
            Step::Done(outcome) => return Ok(outcome),
        }
    }
}

/// [`UrlBroker`] that opens a fresh handshake connection per call.
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    config: HandshakeConfig,
}

impl Handshake {
    pub fn new(config: HandshakeConfig) -> Self { Self { config } }

    pub fn config(&self) -> &HandshakeConfig { &self.config }

    async fn negotiate(&self, token: &str, goal: Goal) -> Result<Outcome> {
        // Token problems are reported before any connection is made.
        let identity = token::decode(token)?;
        let mut negotiation = Negotiation::new(goal, identity, &self.config.domain);

        let mut session = Session::open(&self.config).await?;
        let outcome = drive(&mut session, &mut negotiation).await?;
        if let Err(err) = session.close().await {
            debug!(sid = negotiation.sid(), %err, "handshake shutdown failed");
        }
        Ok(outcome)
    }
}

impl UrlBroker for Handshake {
    async fn reserve(&self, token: &str, size: u64, file_type: FileType) -> Result<UrlReservation> {
        debug!(size, %file_type, "reserving upload url");
        match self.negotiate(token, Goal::Reserve { size, file_type }).await? {
            Outcome::Reserved(reservation) => Ok(reservation),
            Outcome::Resolved(url) => Err(Error::UnexpectedResponse(url)),
        }
    }

    async fn resolve(&self, token: &str, url: &str) -> Result<String> {
        debug!(url, "resolving download url");
        match self.negotiate(token, Goal::Resolve { url: url.to_string() }).await? {
            Outcome::Resolved(url) => Ok(url),
            Outcome::Reserved(reservation) => Err(Error::UnexpectedResponse(reservation.upload_url)),
        }
    }
}
