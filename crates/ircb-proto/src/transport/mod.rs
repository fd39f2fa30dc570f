//! Socket ownership: line-buffered reads and framed, guarded writes.
//!
//! A [`Transport`] is split into a [`LineReader`] owned by the read loop and a
//! cloneable [`LineWriter`] that any task may use to send lines or shut the
//! socket down.

mod error;
mod stream;
mod tls;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, trace};

use crate::line::LineCodec;

pub use self::error::TransportError;
pub use self::stream::IrcStream;
pub use self::tls::{TlsOptions, dial, split_host_port};

/// Initial read buffer size; classic IRC line length.
pub const READ_BUFFER_LEN: usize = 512;

/// Smallest line the writer will put on the wire.
pub const MIN_WRITE_LEN: usize = 4;

/// A connected socket, not yet split.
pub struct Transport<S = IrcStream> {
    reader: LineReader<S>,
    writer: LineWriter<S>,
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Wrap a connected stream.
    pub fn new(stream: S) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            reader: LineReader {
                framed: FramedRead::with_capacity(read_half, LineCodec::new(), READ_BUFFER_LEN),
            },
            writer: LineWriter {
                sink: Arc::new(Mutex::new(Some(FramedWrite::new(
                    write_half,
                    LineCodec::new(),
                )))),
                muted: Arc::new(AtomicBool::new(false)),
            },
        }
    }

    /// Separate the read side from the write side.
    pub fn into_split(self) -> (LineReader<S>, LineWriter<S>) {
        (self.reader, self.writer)
    }
}

/// Read side of a [`Transport`].
pub struct LineReader<S = IrcStream> {
    framed: FramedRead<ReadHalf<S>, LineCodec>,
}

impl<S: AsyncRead> LineReader<S> {
    /// Wait for the next line, terminator stripped.
    ///
    /// End of stream is reported as [`TransportError::Closed`].
    pub async fn read_line(&mut self) -> Result<String, TransportError> {
        match self.framed.next().await {
            Some(Ok(line)) => {
                trace!(line = %line, "recv");
                Ok(line)
            }
            Some(Err(e)) => Err(e.into()),
            None => Err(TransportError::Closed),
        }
    }
}

/// Verb of an outbound line, skipping a `:source` prefix if present.
fn verb(line: &str) -> Option<&str> {
    let mut tokens = line.split_whitespace();
    let first = tokens.next()?;
    if first.starts_with(':') {
        tokens.next()
    } else {
        Some(first)
    }
}

type Sink<S> = FramedWrite<WriteHalf<S>, LineCodec>;

/// Write side of a [`Transport`]. Cheap to clone.
pub struct LineWriter<S = IrcStream> {
    sink: Arc<Mutex<Option<Sink<S>>>>,
    muted: Arc<AtomicBool>,
}

impl<S> Clone for LineWriter<S> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            muted: Arc::clone(&self.muted),
        }
    }
}

impl<S: AsyncWrite> LineWriter<S> {
    /// Write one line, appending `\r\n` when missing.
    ///
    /// Whitespace-only input and input shorter than four bytes are rejected
    /// without touching the socket. While muted, PRIVMSG lines are dropped
    /// and reported as zero bytes written.
    pub async fn write(&self, line: &str) -> Result<usize, TransportError> {
        if line.trim().is_empty() || line.len() < MIN_WRITE_LEN {
            return Err(TransportError::WriteTooSmall);
        }

        let mut framed = line.to_string();
        if !framed.ends_with("\r\n") {
            framed.push_str("\r\n");
        }

        if self.is_muted() && verb(line) == Some("PRIVMSG") {
            debug!(line = %framed.trim_end(), "muted");
            return Ok(0);
        }

        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(TransportError::NotConnected)?;
        let len = framed.len();
        trace!(line = %framed.trim_end(), "send");
        sink.send(framed).await?;
        Ok(len)
    }

    /// Flush and shut down the write half. Later writes fail with
    /// [`TransportError::NotConnected`].
    pub async fn shutdown(&self) -> Result<(), TransportError> {
        let sink = self.sink.lock().await.take();
        match sink {
            Some(mut sink) => {
                sink.close().await?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// True once [`LineWriter::shutdown`] has run.
    pub async fn is_closed(&self) -> bool {
        self.sink.lock().await.is_none()
    }
}

impl<S> LineWriter<S> {
    /// Suppress (or resume) outbound PRIVMSG lines.
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    /// Flip the mute flag, returning the new value.
    pub fn toggle_muted(&self) -> bool {
        !self.muted.fetch_xor(true, Ordering::SeqCst)
    }

    /// Current mute flag.
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }
}
