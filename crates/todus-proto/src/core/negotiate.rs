//! Handshake negotiation as a pure state machine.
//!
//! [`Negotiation::advance`] consumes one received chunk and returns the stanzas
//! to send back, or the final [`Outcome`]. The caller owns the transport.
//!
//! A chunk may carry several stanzas, so every matcher is tested against every
//! chunk, in table order. Chunks nothing recognises are ignored.

use once_cell::sync::Lazy;
use rand::Rng;
use rand::distr::Alphanumeric;
use regex::Regex;

use super::message;
use super::token::TokenIdentity;
use crate::data::{Goal, Outcome, UrlReservation};
use crate::error::{Error, Result};

static RESERVED_URLS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"put='([^']*)' get='([^']*)'").expect("valid regex"));

static RESOLVED_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"du='([^']*)'").expect("valid regex"));

const SID_LEN: usize = 5;

/// Where the negotiation believes the server is. Informational: matchers are
/// not gated on it, a stanza is handled whenever it shows up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    StreamOpened,
    AwaitFeatures,
    AwaitAuthOk,
    AwaitBindOffer,
    AwaitBindResult,
    AwaitQueryResult,
    Succeeded,
    Failed,
}

/// Tagged matcher for one server stanza.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    StreamEcho,
    AuthFeatures,
    AuthOk,
    BindOffer,
    BindResult,
    PushEnabled,
    Reserved,
    Resolved,
}

const RESERVE_TABLE: &[Trigger] = &[
    Trigger::StreamEcho,
    Trigger::AuthFeatures,
    Trigger::AuthOk,
    Trigger::BindOffer,
    Trigger::BindResult,
    Trigger::PushEnabled,
    Trigger::Reserved,
];

const RESOLVE_TABLE: &[Trigger] = &[
    Trigger::StreamEcho,
    Trigger::AuthFeatures,
    Trigger::AuthOk,
    Trigger::BindOffer,
    Trigger::BindResult,
    Trigger::Resolved,
];

/// Result of feeding one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Send these stanzas, in order, then keep receiving.
    Continue(Vec<String>),
    Done(Outcome),
}

#[derive(Debug)]
pub struct Negotiation {
    goal:     Goal,
    identity: TokenIdentity,
    domain:   String,
    sid:      String,
    state:    State,
}

impl Negotiation {
    /// Start a negotiation with a fresh random session id.
    pub fn new(goal: Goal, identity: TokenIdentity, domain: impl Into<String>) -> Self {
        let sid: String =
            rand::rng().sample_iter(&Alphanumeric).take(SID_LEN).map(char::from).collect();
        Self::with_sid(goal, identity, domain, sid)
    }

    pub fn with_sid(
        goal: Goal,
        identity: TokenIdentity,
        domain: impl Into<String>,
        sid: impl Into<String>,
    ) -> Self {
        Self { goal, identity, domain: domain.into(), sid: sid.into(), state: State::StreamOpened }
    }

    pub fn sid(&self) -> &str { &self.sid }

    pub fn state(&self) -> State { self.state }

    /// Feed one received chunk. An empty chunk means the peer closed the stream.
    pub fn advance(&mut self, chunk: &str) -> Result<Step> {
        if chunk.contains(message::NOT_AUTHORIZED) {
            self.state = State::Failed;
            return Err(Error::NotAuthorized);
        }
        if chunk.is_empty() {
            self.state = State::Failed;
            return Err(Error::EndOfStream);
        }

        let table = match self.goal {
            Goal::Reserve { .. } => RESERVE_TABLE,
            Goal::Resolve { .. } => RESOLVE_TABLE,
        };

        let mut replies = Vec::new();
        for &trigger in table {
            if !self.matches(trigger, chunk) {
                continue;
            }
            if let Some(outcome) = self.fire(trigger, chunk, &mut replies)? {
                self.state = State::Succeeded;
                return Ok(Step::Done(outcome));
            }
        }
        Ok(Step::Continue(replies))
    }

    fn matches(&self, trigger: Trigger, chunk: &str) -> bool {
        match trigger {
            Trigger::StreamEcho => {
                chunk.contains(message::STREAM_ECHO_PREFIX)
                    && chunk.contains(&message::stream_echo_suffix(&self.domain))
            }
            Trigger::AuthFeatures => chunk.contains(message::AUTH_FEATURES),
            Trigger::AuthOk => chunk.contains(message::AUTH_OK),
            Trigger::BindOffer => chunk.contains(message::BIND_FEATURES),
            Trigger::BindResult => chunk.contains(&message::result_marker(&self.sid, 1)),
            Trigger::PushEnabled => chunk.contains(message::PUSH_ENABLED),
            Trigger::Reserved => chunk.contains(&message::own_iq(&self.identity.identity, &self.domain)),
            Trigger::Resolved => {
                chunk.contains(&message::result_marker(&self.sid, 2))
                    && chunk.contains(message::STATUS_OK)
            }
        }
    }

    fn fire(&mut self, trigger: Trigger, chunk: &str, replies: &mut Vec<String>) -> Result<Option<Outcome>> {
        match trigger {
            Trigger::StreamEcho => {
                if self.state == State::StreamOpened {
                    self.state = State::AwaitFeatures;
                }
            }
            Trigger::AuthFeatures => {
                replies.push(message::auth(&self.identity.auth_blob));
                self.state = State::AwaitAuthOk;
            }
            Trigger::AuthOk => {
                replies.push(message::stream_open(&self.domain));
                self.state = State::AwaitBindOffer;
            }
            Trigger::BindOffer => {
                replies.push(message::bind(&self.sid));
                self.state = State::AwaitBindResult;
            }
            Trigger::BindResult => {
                match &self.goal {
                    Goal::Reserve { size, file_type } => {
                        replies.push(message::ENABLE_PUSH.to_string());
                        replies.push(message::reserve_query(&self.sid, file_type.code(), *size));
                    }
                    Goal::Resolve { url } => replies.push(message::resolve_query(&self.sid, url)),
                }
                self.state = State::AwaitQueryResult;
            }
            Trigger::PushEnabled => replies.push(message::ping(&self.sid)),
            Trigger::Reserved => {
                let caps = RESERVED_URLS
                    .captures(chunk)
                    .ok_or_else(|| Error::UnexpectedResponse(chunk.to_string()))?;
                return Ok(Some(Outcome::Reserved(UrlReservation {
                    upload_url:   message::unescape_url(&caps[1]),
                    download_url: message::unescape_url(&caps[2]),
                })));
            }
            Trigger::Resolved => {
                let caps = RESOLVED_URL
                    .captures(chunk)
                    .ok_or_else(|| Error::UnexpectedResponse(chunk.to_string()))?;
                return Ok(Some(Outcome::Resolved(message::unescape_url(&caps[1]))));
            }
        }
        Ok(None)
    }
}
