//! # ircb-proto
//!
//! The wire-level half of the `ircb` bot: turning raw IRC lines into
//! [`ParsedMessage`] values, framing CRLF-terminated lines over tokio streams,
//! and owning the plain or TLS socket behind a line reader / framed writer pair.
//!
//! ```rust
//! use ircb_proto::parse;
//!
//! let msg = parse(":nick!user@host PRIVMSG #chan :hello").unwrap();
//! assert_eq!(msg.reply_to, "nick");
//! assert_eq!(msg.to, "#chan");
//! assert_eq!(msg.message, "hello");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod message;

#[cfg(feature = "tokio")]
pub mod line;
#[cfg(feature = "tokio")]
pub mod transport;

pub use self::error::ProtocolError;
pub use self::message::{ParsedMessage, encode_privmsg, parse};

#[cfg(feature = "tokio")]
pub use self::line::LineCodec;
#[cfg(feature = "tokio")]
pub use self::transport::{IrcStream, LineReader, LineWriter, TlsOptions, Transport, TransportError};
