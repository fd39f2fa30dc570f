//! Unified error handling for ircb.
//!
//! Transport and framing errors come from `ircb_proto`; store errors live
//! next to the store. This module ties them into the connection and handler
//! layers.

use ircb_proto::TransportError;
use thiserror::Error;

use crate::connection::ConnState;
use crate::store::StoreError;

// ============================================================================
// Connection Errors (lifecycle)
// ============================================================================

/// Errors surfaced by [`Connection::connect`](crate::Connection::connect) and
/// [`Connection::close`](crate::Connection::close).
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("already connected")]
    AlreadyConnected,

    #[error("connection already terminated")]
    Terminated,

    #[error("invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: ConnState, to: ConnState },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("http client error: {0}")]
    Http(String),
}

impl ConnectionError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyConnected => "already_connected",
            Self::Terminated => "terminated",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Transport(e) => e.error_code(),
            Self::Store(_) => "store_error",
            Self::Http(_) => "http_error",
        }
    }
}

// ============================================================================
// Handler Errors (command processing)
// ============================================================================

/// Errors that can occur while running a command handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("send error: {0}")]
    Transport(#[from] TransportError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl HandlerError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "send_error",
            Self::Store(_) => "store_error",
            Self::Connection(e) => e.error_code(),
        }
    }
}

/// Result type for command handlers.
pub type HandlerResult = Result<(), HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_codes() {
        assert_eq!(
            HandlerError::Transport(TransportError::WriteTooSmall).error_code(),
            "send_error"
        );
        assert_eq!(HandlerError::Store(StoreError::Closed).error_code(), "store_error");
        assert_eq!(
            HandlerError::Connection(ConnectionError::AlreadyConnected).error_code(),
            "already_connected"
        );
    }

    #[test]
    fn test_connection_error_display() {
        assert_eq!(ConnectionError::AlreadyConnected.to_string(), "already connected");
        let err = ConnectionError::InvalidTransition {
            from: ConnState::Disconnected,
            to: ConnState::SteadyState,
        };
        assert_eq!(
            err.to_string(),
            "invalid state transition: Disconnected -> SteadyState"
        );
    }

    #[test]
    fn test_transport_error_code_passthrough() {
        let err = ConnectionError::Transport(TransportError::Closed);
        assert_eq!(err.error_code(), "closed");
        assert_eq!(err.to_string(), "connection closed by peer");
    }
}
