//! Transport error types.

use thiserror::Error;

use crate::error::ProtocolError;

/// Errors raised while dialing, reading from or writing to the server socket.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// An I/O error occurred.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A framing error occurred.
    #[error("transport protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Empty, whitespace-only or shorter than four bytes.
    #[error("write too small")]
    WriteTooSmall,

    /// The peer closed the stream.
    #[error("connection closed by peer")]
    Closed,

    /// The writer has already been shut down.
    #[error("not connected")]
    NotConnected,

    /// Host is not in `host:port` form.
    #[error("invalid server address: {0}")]
    InvalidAddress(String),

    /// TLS setup or handshake failure.
    #[error("tls error: {0}")]
    Tls(String),
}

impl TransportError {
    /// Static label for log fields.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Protocol(_) => "protocol",
            Self::WriteTooSmall => "write_too_small",
            Self::Closed => "closed",
            Self::NotConnected => "not_connected",
            Self::InvalidAddress(_) => "invalid_address",
            Self::Tls(_) => "tls",
        }
    }
}
