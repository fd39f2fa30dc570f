//! Connect, register, read, close.

use std::sync::Arc;
use std::time::Instant;

use ircb_proto::transport::{LineReader, dial};
use ircb_proto::{TlsOptions, Transport, TransportError};
use tracing::{Instrument, debug, error, info, warn};

use super::{ConnState, Connection, ExitReason, SaslState};
use crate::error::ConnectionError;
use crate::telemetry::spans;

impl Connection {
    /// Dial, register and run the read loop until the session ends.
    ///
    /// Fails with [`ConnectionError::AlreadyConnected`] if this connection was
    /// already started, without opening a second socket.
    pub async fn connect(self: &Arc<Self>) -> Result<ExitReason, ConnectionError> {
        {
            let mut lifecycle = self.lifecycle.lock();
            match lifecycle.state() {
                ConnState::Disconnected => {
                    lifecycle.transition(ConnState::Dialing)?;
                }
                state if state.is_closing() => return Err(ConnectionError::Terminated),
                _ => return Err(ConnectionError::AlreadyConnected),
            }
        }

        let span = spans::connection(&self.config.server.host, &self.nick);
        self.run().instrument(span).await
    }

    async fn run(self: &Arc<Self>) -> Result<ExitReason, ConnectionError> {
        let server = &self.config.server;
        let tls = server.tls.then_some(TlsOptions {
            verify_cert: server.verify_cert,
        });
        info!(host = %server.host, tls = server.tls, "dialing");

        let stream = match dial(&server.host, tls).await {
            Ok(stream) => stream,
            Err(e) => {
                error!(host = %server.host, error = %e, "dial failed");
                self.close(ExitReason::ConnectionLost).await?;
                return Err(e.into());
            }
        };
        info!(host = %server.host, tls = stream.is_tls(), "connected");

        let (reader, writer) = Transport::new(stream).into_split();
        *self.writer.lock() = Some(writer);
        *self.since.lock() = Some(Instant::now());

        // close() may have run while we were dialing
        let registering = self.lifecycle.lock().transition(ConnState::Registering);
        if registering.is_err() {
            let writer = self.writer.lock().take();
            if let Some(writer) = writer
                && let Err(e) = writer.shutdown().await
            {
                debug!(error = %e, "shutdown after early close failed");
            }
            return Ok(self.exit_reason().unwrap_or(ExitReason::Stop));
        }

        if let Err(e) = self.register().await {
            error!(error = %e, "registration failed");
            self.close(ExitReason::ConnectionLost).await?;
            return Err(e.into());
        }

        #[cfg(unix)]
        if let Some(path) = self.config.control.socket.clone() {
            let conn = Arc::clone(self);
            tokio::spawn(async move {
                if let Err(e) = crate::control::run(conn, path).await {
                    warn!(error = %e, "control socket stopped");
                }
            });
        }

        self.read_loop(reader).await
    }

    /// NICK, USER and MODE, preceded by the SASL request when configured.
    async fn register(&self) -> Result<(), TransportError> {
        if self.config.bot.sasl_password.is_some() {
            *self.sasl.lock() = SaslState::Requested;
            self.write("CAP REQ :sasl").await?;
        }
        let nick = &self.nick;
        self.write(&format!("NICK {nick}")).await?;
        self.write(&format!("USER {nick} 0.0.0.0 0.0.0.0 :{nick}"))
            .await?;
        self.write(&format!("MODE {nick} :+i")).await?;
        info!(nick = %nick, "registration sent");
        Ok(())
    }

    async fn read_loop(self: &Arc<Self>, mut reader: LineReader) -> Result<ExitReason, ConnectionError> {
        let mut first_line = true;
        loop {
            let line = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                line = reader.read_line() => line,
            };

            match line {
                Ok(line) => {
                    if first_line {
                        first_line = false;
                        if let Err(e) = self.lifecycle.lock().transition(ConnState::SteadyState) {
                            debug!(error = %e, "not entering steady state");
                        }
                    }
                    debug!(line = %line, "recv");
                    self.handle_line(&line).await;
                }
                Err(e) => {
                    if self.shutdown.is_cancelled() {
                        break;
                    }
                    error!(error = %e, code = e.error_code(), "read failed");
                    self.close(ExitReason::ConnectionLost).await?;
                    return Err(e.into());
                }
            }
        }

        let reason = self.exit_reason().unwrap_or(ExitReason::Stop);
        info!(reason = ?reason, "session ended");
        Ok(reason)
    }

    /// Tear the session down. Safe to call from any task, any number of times;
    /// only the first call's `reason` is kept.
    ///
    /// Closes the store, sends `QUIT` best-effort, shuts the socket down and
    /// removes the control socket.
    pub async fn close(&self, reason: ExitReason) -> Result<(), ConnectionError> {
        {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state().is_closing() {
                return Ok(());
            }
            lifecycle.transition(ConnState::Closing)?;
            *self.exit_reason.lock() = Some(reason);
        }
        info!(reason = ?reason, "closing");
        self.shutdown.cancel();

        if let Err(e) = self.store.close().await {
            warn!(error = %e, "failed to close store");
        }

        let writer = self.writer.lock().take();
        if let Some(writer) = writer {
            if let Err(e) = writer.write(&format!("QUIT :{}", crate::VERSION)).await {
                warn!(error = %e, "failed to send QUIT");
            }
            if let Err(e) = writer.shutdown().await {
                debug!(error = %e, "socket shutdown failed");
            }
        }

        #[cfg(unix)]
        if let Some(path) = &self.config.control.socket {
            crate::control::remove_socket(path);
        }

        self.lifecycle.lock().transition(ConnState::Terminal)?;
        Ok(())
    }
}
