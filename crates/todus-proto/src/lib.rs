//! Stream handshake that turns a bearer token into signed transfer URLs.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Immutable request/response types
//! - [`core`] - Pure transformations: token decoding, stanza vocabulary and
//!   the negotiation state machine
//! - [`effects`] - I/O: the TLS transport session and the [`UrlBroker`]
//!   implementation that drives a negotiation over it
//!
//! The wire format is a handful of XML-looking tags that are matched as opaque
//! string patterns. The stream is never well-formed XML (tags stay open for the
//! lifetime of the socket), so no XML parser is involved.

pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use core::message;
pub use core::negotiate::{Negotiation, State, Step, Trigger};
pub use core::token::{TokenIdentity, decode};
pub use data::{FileType, Goal, HandshakeConfig, Outcome, UrlReservation};
pub use effects::{Handshake, Session, UrlBroker, drive};
pub use error::{Error, Result};
