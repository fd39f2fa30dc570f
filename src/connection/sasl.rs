//! SASL PLAIN during registration.
//!
//! `CAP REQ :sasl` goes out before NICK; the server's ACK starts
//! `AUTHENTICATE PLAIN`, its `AUTHENTICATE +` gets the credentials, and any
//! outcome ends negotiation with `CAP END`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Largest AUTHENTICATE payload chunk.
const CHUNK_LEN: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaslState {
    /// No password configured.
    Disabled,
    /// `CAP REQ :sasl` sent.
    Requested,
    /// `AUTHENTICATE PLAIN` sent.
    Authenticating,
    /// 903 received.
    Done,
    /// Refused or aborted; registration continued without it.
    Failed,
}

/// SASL numerics.
pub const RPL_LOGGEDIN: u16 = 900;
pub const RPL_SASLSUCCESS: u16 = 903;
pub const ERR_NICKLOCKED: u16 = 902;
pub const ERR_SASLFAIL: u16 = 904;
pub const ERR_SASLTOOLONG: u16 = 905;
pub const ERR_SASLABORTED: u16 = 906;
pub const ERR_SASLALREADY: u16 = 908;

/// Base64 of `authzid \0 authcid \0 password`, both ids set to `nick`.
pub fn plain_payload(nick: &str, password: &str) -> String {
    STANDARD.encode(format!("{nick}\0{nick}\0{password}"))
}

/// `AUTHENTICATE` lines carrying `payload`. A payload that is an exact
/// multiple of the chunk size is followed by `AUTHENTICATE +`.
pub fn authenticate_lines(payload: &str) -> Vec<String> {
    let mut lines: Vec<String> = payload
        .as_bytes()
        .chunks(CHUNK_LEN)
        .map(|chunk| format!("AUTHENTICATE {}", String::from_utf8_lossy(chunk)))
        .collect();
    if payload.len() % CHUNK_LEN == 0 {
        lines.push("AUTHENTICATE +".to_string());
    }
    lines
}

/// True when a `CAP` line acknowledges the `sasl` capability.
pub fn is_sasl_ack(message: &str, raw: &str) -> bool {
    cap_subcommand(raw) == Some("ACK") && message.split(' ').any(|cap| cap == "sasl")
}

/// True when a `CAP` line refuses capabilities.
pub fn is_nak(raw: &str) -> bool {
    cap_subcommand(raw) == Some("NAK")
}

/// `:server CAP <nick> <sub> :caps`
fn cap_subcommand(raw: &str) -> Option<&str> {
    let line = raw.strip_prefix(':').unwrap_or(raw);
    let mut tokens = line.split(' ');
    let _source = tokens.next()?;
    if tokens.next()? != "CAP" {
        return None;
    }
    let _target = tokens.next()?;
    tokens.next()
}
