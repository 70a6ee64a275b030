//! Requests against the auth service and the storage URLs.

mod client;

pub use client::{ServiceClient, part_path};
