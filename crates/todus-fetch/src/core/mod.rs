//! Pure transformations for the auth wire format.

pub mod auth;
