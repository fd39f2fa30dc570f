//! Local control socket.
//!
//! A Unix socket accepting one command per line: `0`/`stop` closes the
//! connection, `restart` closes it for a supervisor restart, `1`/`status`
//! reports the lifecycle state.

use std::io;
use std::path::Path;
#[cfg(unix)]
use std::path::PathBuf;
#[cfg(unix)]
use std::sync::Arc;

#[cfg(unix)]
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};
use tracing::debug;
#[cfg(unix)]
use tracing::{info, warn};

#[cfg(unix)]
use crate::connection::{Connection, ExitReason};

/// One control line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Stop,
    Restart,
    Status,
    Unknown(String),
}

impl ControlCommand {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "0" | "stop" => Self::Stop,
            "restart" => Self::Restart,
            "1" | "status" => Self::Status,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Remove a socket file, ignoring one that is already gone.
pub fn remove_socket(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "control socket removed"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => debug!(path = %path.display(), error = %e, "failed to remove control socket"),
    }
}

/// Serve the control socket until the connection starts closing.
#[cfg(unix)]
pub async fn run(conn: Arc<Connection>, path: PathBuf) -> io::Result<()> {
    // a stale socket from a previous run blocks bind
    remove_socket(&path);
    let listener = UnixListener::bind(&path)?;
    let shutdown = conn.shutdown_token();
    info!(path = %path.display(), "control socket listening");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accept = listener.accept() => match accept {
                Ok((stream, _addr)) => {
                    let conn = Arc::clone(&conn);
                    tokio::spawn(async move {
                        if let Err(e) = serve(conn, stream).await {
                            debug!(error = %e, "control client error");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "control accept failed"),
            },
        }
    }

    remove_socket(&path);
    Ok(())
}

#[cfg(unix)]
async fn serve(conn: Arc<Connection>, stream: UnixStream) -> io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        let command = ControlCommand::parse(&line);
        debug!(command = ?command, "control command");
        let reply = match command {
            ControlCommand::Stop => {
                close(&conn, ExitReason::Stop).await;
                "stopping".to_string()
            }
            ControlCommand::Restart => {
                close(&conn, ExitReason::Restart).await;
                "restarting".to_string()
            }
            ControlCommand::Status => {
                let up = conn
                    .connected_for()
                    .map(crate::handlers::public::format_duration)
                    .unwrap_or_else(|| "-".to_string());
                format!("{:?} {} up {}", conn.state(), conn.nick(), up)
            }
            ControlCommand::Unknown(other) => format!("unknown command: {other:?}"),
        };
        write_half.write_all(reply.as_bytes()).await?;
        write_half.write_all(b"\n").await?;
        if conn.is_closing() {
            break;
        }
    }
    Ok(())
}

#[cfg(unix)]
async fn close(conn: &Connection, reason: ExitReason) {
    info!(reason = ?reason, "close requested over control socket");
    if let Err(e) = conn.close(reason).await {
        warn!(error = %e, "close failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_control_lines() {
        assert_eq!(ControlCommand::parse("0"), ControlCommand::Stop);
        assert_eq!(ControlCommand::parse("stop\n"), ControlCommand::Stop);
        assert_eq!(ControlCommand::parse("restart"), ControlCommand::Restart);
        assert_eq!(ControlCommand::parse("1"), ControlCommand::Status);
        assert_eq!(ControlCommand::parse(" status "), ControlCommand::Status);
        assert_eq!(
            ControlCommand::parse("reload"),
            ControlCommand::Unknown("reload".to_string())
        );
    }

    #[test]
    fn test_remove_missing_socket_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        remove_socket(&dir.path().join("absent.sock"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_over_socket() {
        use crate::config::{Config, StoreBackend};
        use crate::store::MemoryStore;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ircb.sock");
        let mut config = Config::default();
        config.database.backend = StoreBackend::Memory;
        let conn = Connection::new(config, Arc::new(MemoryStore::new())).unwrap();

        let server = tokio::spawn(run(Arc::clone(&conn), path.clone()));
        // wait for bind
        let mut stream = None;
        for _ in 0..50 {
            if let Ok(s) = UnixStream::connect(&path).await {
                stream = Some(s);
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        let mut stream = stream.expect("control socket never came up");

        stream.write_all(b"status\n").await.unwrap();
        let (read_half, mut write_half) = stream.split();
        let mut lines = BufReader::new(read_half).lines();
        let status = lines.next_line().await.unwrap().unwrap();
        assert!(status.starts_with("Disconnected mustangsally"), "{status}");

        write_half.write_all(b"stop\n").await.unwrap();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("stopping"));

        server.await.unwrap().unwrap();
        assert_eq!(conn.exit_reason(), Some(ExitReason::Stop));
        assert!(!path.exists());
    }
}
