use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde::Deserialize;

use crate::error::{Error, Result};

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);

const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Account identity carried inside a bearer token, plus the credential blob
/// the handshake server expects in its PLAIN auth stanza.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenIdentity {
    pub identity:  String,
    pub auth_blob: String,
}

#[derive(Deserialize)]
struct Claims {
    username: String,
}

/// Decode `token` into its identity and auth blob.
///
/// The identity is the `username` claim of the token's second `.` segment.
/// The segment may use either base64 alphabet, with or without padding.
pub fn decode(token: &str) -> Result<TokenIdentity> {
    let segment = token
        .split('.')
        .nth(1)
        .ok_or_else(|| Error::MalformedToken("token has no payload segment".into()))?;

    let raw = STANDARD_LENIENT
        .decode(segment)
        .or_else(|_| URL_SAFE_LENIENT.decode(segment))
        .map_err(|e| Error::MalformedToken(format!("payload is not base64: {e}")))?;

    let claims: Claims = serde_json::from_slice(&raw)
        .map_err(|e| Error::MalformedToken(format!("payload has no username: {e}")))?;

    Ok(TokenIdentity { auth_blob: auth_blob(&claims.username, token), identity: claims.username })
}

fn auth_blob(identity: &str, token: &str) -> String {
    let mut plain = Vec::with_capacity(identity.len() + token.len() + 2);
    plain.push(0);
    plain.extend_from_slice(identity.as_bytes());
    plain.push(0);
    plain.extend_from_slice(token.as_bytes());
    STANDARD.encode(plain)
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
    use proptest::prelude::*;

    use super::*;

    fn token_with(payload: &str) -> String {
        format!("eyJhbGciOiJIUzI1NiJ9.{}.c2lnbmF0dXJl", URL_SAFE_NO_PAD.encode(payload))
    }

    #[test]
    fn test_decode_extracts_username() {
        let token = token_with(r#"{"username":"5355555555","exp":1}"#);
        let decoded = decode(&token).unwrap();
        assert_eq!(decoded.identity, "5355555555");
    }

    #[test]
    fn test_auth_blob_layout() {
        let token = token_with(r#"{"username":"5312345678"}"#);
        let decoded = decode(&token).unwrap();
        let plain = STANDARD.decode(decoded.auth_blob).unwrap();
        assert_eq!(plain, format!("\05312345678\0{token}").into_bytes());
    }

    #[test]
    fn test_decode_accepts_padded_standard_segment() {
        let payload = STANDARD.encode(r#"{"username":"53000"}"#);
        let token = format!("h.{payload}.s");
        assert_eq!(decode(&token).unwrap().identity, "53000");
    }

    #[test]
    fn test_decode_rejects_missing_segment() {
        assert!(matches!(decode("onlyonepart"), Err(Error::MalformedToken(_))));
    }

    #[test]
    fn test_decode_rejects_non_base64() {
        assert!(matches!(decode("a.!!!!.b"), Err(Error::MalformedToken(_))));
    }

    #[test]
    fn test_decode_rejects_missing_username() {
        let token = format!("a.{}.b", STANDARD_NO_PAD.encode(r#"{"user":"x"}"#));
        assert!(matches!(decode(&token), Err(Error::MalformedToken(_))));
    }

    proptest! {
        #[test]
        fn prop_decode_recovers_identity(name in "[0-9A-Za-z_+@.-]{1,40}", padded in any::<bool>()) {
            let payload = format!(r#"{{"username":"{name}"}}"#);
            let segment = if padded { STANDARD.encode(&payload) } else { URL_SAFE_NO_PAD.encode(&payload) };
            let token = format!("header.{segment}.sig");
            let decoded = decode(&token).unwrap();
            prop_assert_eq!(decoded.identity, name);
        }
    }
}
