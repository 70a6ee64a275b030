//! Request bodies and response parsing for the account endpoints.

use rand::Rng;
use rand::distr::Alphanumeric;

/// Length of the random device id stamped on every auth body.
const DEVICE_ID_LEN: usize = 150;

const PASSWORD_LEN: usize = 96;

/// Start and end of the password in a register reply without a marker byte.
const PASSWORD_FALLBACK: (usize, usize) = (5, 166);

pub fn device_id() -> String {
    rand::rng().sample_iter(&Alphanumeric).take(DEVICE_ID_LEN).map(char::from).collect()
}

/// Phone number and device id frame shared by every auth request.
pub fn base_body(phone: &str, device_id: &str) -> Vec<u8> {
    let mut body = Vec::with_capacity(phone.len() + device_id.len() + 8);
    body.extend_from_slice(b"\n\n");
    body.extend_from_slice(phone.as_bytes());
    body.extend_from_slice(b"\x12\x96\x01");
    body.extend_from_slice(device_id.as_bytes());
    body
}

pub fn register_body(phone: &str, device_id: &str, code: &str) -> Vec<u8> {
    let mut body = base_body(phone, device_id);
    body.extend_from_slice(b"\x1a\x06");
    body.extend_from_slice(code.as_bytes());
    body
}

pub fn login_body(phone: &str, device_id: &str, password: &str, version_code: &str) -> Vec<u8> {
    let mut body = base_body(phone, device_id);
    body.extend_from_slice(b"\x12\x60");
    body.extend_from_slice(password.as_bytes());
    body.extend_from_slice(b"\x1a\x05");
    body.extend_from_slice(version_code.as_bytes());
    body
}

/// ASCII graphic characters plus the six whitespace characters.
fn is_printable(byte: u8) -> bool {
    byte.is_ascii_graphic() || matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

fn printable(bytes: &[u8]) -> String {
    bytes.iter().copied().filter(|b| is_printable(*b)).map(char::from).collect()
}

/// Account password inside a register reply.
///
/// The 96 bytes after the first backtick; replies without one carry it at a
/// fixed offset.
pub fn parse_password(reply: &[u8]) -> String {
    let (start, end) = match reply.iter().position(|&b| b == b'`') {
        Some(at) => (at + 1, at + 1 + PASSWORD_LEN),
        None => PASSWORD_FALLBACK,
    };
    let end = end.min(reply.len());
    let start = start.min(end);
    printable(&reply[start..end])
}

/// Bearer token inside a login reply: the body minus framing bytes.
pub fn parse_token(reply: &[u8]) -> String { printable(reply).trim().to_string() }
