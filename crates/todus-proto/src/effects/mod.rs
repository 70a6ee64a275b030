//! I/O edge of the handshake: the TLS transport and the broker that drives a
//! [`Negotiation`](crate::Negotiation) over it.

mod handshake;
mod session;

pub use handshake::{Handshake, UrlBroker, drive};
pub use session::Session;
