//! Immutable types exchanged with the handshake layer.

use std::fmt;
use std::time::Duration;

/// Attachment kind the server files an upload under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum FileType {
    File = 0,
    /// The official client files arbitrary uploads as voice notes.
    #[default]
    Voice = 1,
    Audio = 2,
    Video = 3,
    Picture = 4,
    Profile = 5,
    ProfileThumbnail = 6,
}

impl FileType {
    pub fn code(self) -> u8 { self as u8 }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.code()) }
}

/// Signed URL pair for exactly one upload of the reserved size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlReservation {
    pub upload_url:   String,
    pub download_url: String,
}

/// What a negotiation is asked to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Goal {
    Reserve { size: u64, file_type: FileType },
    Resolve { url: String },
}

/// Terminal success of a negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reserved(UrlReservation),
    Resolved(String),
}

/// Endpoint and timing of the handshake server.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    pub host:            String,
    pub port:            u16,
    /// Domain the server stamps on stream headers and account addresses.
    pub domain:          String,
    pub receive_timeout: Duration,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            host:            "im.todus.cu".to_string(),
            port:            1756,
            domain:          "im.todus.cu".to_string(),
            receive_timeout: Duration::from_secs(15),
        }
    }
}
