//! Pure transformations for the handshake: no sockets, no clocks.

pub mod message;
pub mod negotiate;
pub mod token;
