//! Telemetry utilities for command timing and log correlation.

use std::time::{Duration, Instant};
use tracing::debug;

/// Guard for timing command execution.
///
/// Logs the command latency when dropped.
pub struct CommandTimer {
    command: String,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            start: Instant::now(),
        }
    }

    /// Time since the timer started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        debug!(command = %self.command, duration_secs = duration, "command finished");
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Create a span for a server session.
    pub fn connection(host: &str, nick: &str) -> Span {
        info_span!("connection", host = %host, nick = %nick)
    }

    /// Create a span for a command execution.
    pub fn command(name: &str, source: &str, target: Option<&str>) -> Span {
        if let Some(target) = target {
            info_span!("command", name = %name, source = %source, target = %target)
        } else {
            info_span!("command", name = %name, source = %source)
        }
    }
}
