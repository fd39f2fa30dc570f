//! Scripted IRC server.
//!
//! Binds `127.0.0.1:0`, accepts the bot's connection and lets a test read
//! what the bot sent and write what a server would say.

use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// A listening fake server.
pub struct FakeServer {
    listener: TcpListener,
}

impl FakeServer {
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        Ok(Self { listener })
    }

    /// `host:port` for the bot config.
    pub fn address(&self) -> String {
        self.listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_default()
    }

    /// Wait for the bot to connect.
    pub async fn accept(&self) -> anyhow::Result<ServerSession> {
        let (stream, _) = timeout(RECV_TIMEOUT, self.listener.accept()).await??;
        let (read_half, write_half) = stream.into_split();
        Ok(ServerSession {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }

    /// True when nobody connects within `dur`.
    #[allow(dead_code)]
    pub async fn no_connection_within(&self, dur: Duration) -> bool {
        timeout(dur, self.listener.accept()).await.is_err()
    }
}

/// One accepted bot connection.
pub struct ServerSession {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl ServerSession {
    /// Send a line to the bot, CRLF appended.
    pub async fn send(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Next line from the bot, terminator stripped.
    pub async fn recv(&mut self) -> anyhow::Result<String> {
        let mut line = String::new();
        let n = timeout(RECV_TIMEOUT, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            anyhow::bail!("bot closed the connection");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Read lines until one matches, returning everything read.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Vec<String>>
    where
        F: FnMut(&str) -> bool,
    {
        let mut lines = Vec::new();
        loop {
            let line = self.recv().await?;
            let done = predicate(&line);
            lines.push(line);
            if done {
                return Ok(lines);
            }
        }
    }

    /// Consume the three registration lines.
    pub async fn expect_registration(&mut self, nick: &str) -> anyhow::Result<()> {
        anyhow::ensure!(self.recv().await? == format!("NICK {nick}"));
        anyhow::ensure!(self.recv().await? == format!("USER {nick} 0.0.0.0 0.0.0.0 :{nick}"));
        anyhow::ensure!(self.recv().await? == format!("MODE {nick} :+i"));
        Ok(())
    }

    /// Round-trip a PING so every line the bot sent before it has been read.
    /// Returns the lines that arrived ahead of the PONG.
    pub async fn sync(&mut self) -> anyhow::Result<Vec<String>> {
        self.send("PING :sync").await?;
        let mut lines = self.recv_until(|l| l == "PONG :sync").await?;
        lines.pop();
        Ok(lines)
    }

    /// True once the bot has hung up (EOF within the timeout).
    pub async fn closed(&mut self) -> bool {
        loop {
            let mut line = String::new();
            match timeout(RECV_TIMEOUT, self.reader.read_line(&mut line)).await {
                Ok(Ok(0)) | Ok(Err(_)) => return true,
                Ok(Ok(_)) => continue,
                Err(_) => return false,
            }
        }
    }
}
