//! Error types for the protocol layer.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Framing-level errors raised by the line codec.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A line grew past the codec limit before a terminator was seen.
    #[error("message too long: {actual} bytes (limit: {limit})")]
    MessageTooLong {
        /// Bytes buffered so far.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },
}
