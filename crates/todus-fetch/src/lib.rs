//! HTTP side of the ToDus service.
//!
//! # Architecture
//!
//! - [`data`] - Client configuration
//! - [`core`] - Pure builders and parsers for the auth wire format
//! - [`effects`] - The [`ServiceClient`] that performs requests
//!
//! Auth bodies are hand-assembled protobuf frames. Only the fields the
//! service reads are produced, so no protobuf runtime is involved.

pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use data::HttpConfig;
pub use effects::{ServiceClient, part_path};
pub use error::{Error, Result};
