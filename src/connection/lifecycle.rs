//! Connection lifecycle state machine.

use crate::error::ConnectionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Initial state; `connect` is allowed.
    Disconnected,
    /// Opening the socket (and TLS).
    Dialing,
    /// NICK/USER sent, waiting for the first server line.
    Registering,
    /// Routing inbound lines.
    SteadyState,
    /// Tearing down.
    Closing,
    /// Done. Nothing moves out of here.
    Terminal,
}

impl ConnState {
    /// True once teardown has started.
    pub fn is_closing(self) -> bool {
        matches!(self, Self::Closing | Self::Terminal)
    }
}

#[derive(Debug)]
pub struct Lifecycle {
    state: ConnState,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: ConnState::Disconnected,
        }
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    /// Move to `to`, rejecting transitions the lifecycle does not allow.
    pub fn transition(&mut self, to: ConnState) -> Result<ConnState, ConnectionError> {
        use ConnState::*;

        let allowed = match (self.state, to) {
            (Disconnected, Dialing)
            | (Dialing, Registering)
            | (Registering, SteadyState)
            | (Closing, Terminal) => true,
            (from, Closing) => !from.is_closing(),
            _ => false,
        };

        if !allowed {
            return Err(ConnectionError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        let from = std::mem::replace(&mut self.state, to);
        Ok(from)
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
