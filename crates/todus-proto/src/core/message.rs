//! Stanza vocabulary of the handshake stream.
//!
//! Every value here is an opaque string pattern. Outgoing stanzas are built by
//! the functions, incoming ones are recognised with `contains`/`starts_with`.

/// Prefix of the server's echo of our stream header.
pub const STREAM_ECHO_PREFIX: &str = "<?xml version='1.0'?><stream:stream i='";

/// Feature list offering PLAIN/X-OAUTH2 auth and in-band registration.
pub const AUTH_FEATURES: &str = "<stream:features><es xmlns='x2'><e>PLAIN</e><e>X-OAUTH2</e></es>\
<register xmlns='http://jabber.org/features/iq-register'/></stream:features>";

pub const AUTH_OK: &str = "<ok xmlns='x2'/>";

pub const BIND_FEATURES: &str = "<stream:features><b1 xmlns='x4'/>";

pub const ENABLE_PUSH: &str = "<en xmlns='x7' u='true' max='300'/>";

pub const PUSH_ENABLED: &str = "<ed u='true' max='300'";

pub const STATUS_OK: &str = "status='200'";

pub const NOT_AUTHORIZED: &str = "<not-authorized/>";

pub fn stream_open(domain: &str) -> String {
    format!("<stream:stream xmlns='jc' o='{domain}' xmlns:stream='x1' v='1.0'>")
}

/// Suffix of the server's echo of our stream header.
pub fn stream_echo_suffix(domain: &str) -> String {
    format!("xmlns:stream='x1' f='{domain}' xmlns='jc'>")
}

pub fn auth(blob: &str) -> String {
    format!("<ah xmlns='ah:ns' e='PLAIN'>{blob}</ah>")
}

pub fn bind(sid: &str) -> String {
    format!("<iq i='{sid}-1' t='set'><b1 xmlns='x4'></b1></iq>")
}

/// Marker of a successful reply to the IQ numbered `seq` in session `sid`.
pub fn result_marker(sid: &str, seq: u8) -> String {
    format!("t='result' i='{sid}-{seq}'>")
}

pub fn reserve_query(sid: &str, file_type: u8, size: u64) -> String {
    format!(
        "<iq i='{sid}-3' t='get'><query xmlns='todus:purl' type='{file_type}' \
         persistent='false' size='{size}' room=''></query></iq>"
    )
}

pub fn resolve_query(sid: &str, url: &str) -> String {
    format!("<iq i='{sid}-2' t='get'><query xmlns='todus:gurl' url='{url}'></query></iq>")
}

pub fn ping(sid: &str) -> String {
    format!("<p i='{sid}-4'></p>")
}

/// Opening of an IQ the server addresses to our own account.
pub fn own_iq(identity: &str, domain: &str) -> String {
    format!("<iq o='{identity}@{domain}")
}

/// Drop the `amp;` residue the server leaves after `&` in signed URLs.
pub fn unescape_url(url: &str) -> String {
    url.replace("amp;", "")
}
