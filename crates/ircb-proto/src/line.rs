//! Line-based codec for tokio.
//!
//! Reads newline-terminated lines, strips the `\r\n` terminator and decodes
//! lossily so a stray byte from the server never tears down the session.
//! Writes are passed through untouched; terminators are the writer's job.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{self, ProtocolError};

/// Upper bound on a single inbound line, including IRCv3 tags.
pub const MAX_LINE_LEN: usize = 8191;

/// Newline-delimited codec producing one `String` per line.
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    max_len: usize,
}

impl LineCodec {
    /// Create a codec with the default line limit.
    pub fn new() -> Self {
        Self::with_max_len(MAX_LINE_LEN)
    }

    /// Create a codec with a custom line limit.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(ProtocolError::MessageTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            let text = String::from_utf8_lossy(&line);
            Ok(Some(text.trim_end_matches(['\r', '\n']).to_string()))
        } else {
            self.next_index = src.len();

            if src.len() > self.max_len {
                return Err(ProtocolError::MessageTooLong {
                    actual: src.len(),
                    limit: self.max_len,
                });
            }

            Ok(None)
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        // A final unterminated line is still a line.
        match self.decode(src)? {
            Some(line) => Ok(Some(line)),
            None if src.is_empty() => Ok(None),
            None => {
                let rest = src.split_to(src.len());
                self.next_index = 0;
                let text = String::from_utf8_lossy(&rest);
                Ok(Some(text.trim_end_matches('\r').to_string()))
            }
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: String, dst: &mut BytesMut) -> error::Result<()> {
        dst.extend_from_slice(msg.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_strips_crlf() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"PING :server\r\nPRIVMSG #c :hi\r\n"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("PING :server"));
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("PRIVMSG #c :hi"));
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_decode_partial_then_complete() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"PRIVMSG #c :hel"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"lo\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("PRIVMSG #c :hello"));
    }

    #[test]
    fn test_decode_lossy_utf8() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"PRIVMSG #c :\xff\xfe ok\r\n"[..]);
        let line = codec.decode(&mut buf).unwrap().unwrap();
        assert!(line.ends_with(" ok"));
        assert!(line.starts_with("PRIVMSG #c :"));
    }

    #[test]
    fn test_decode_rejects_overlong_partial() {
        let mut codec = LineCodec::with_max_len(16);
        let mut buf = BytesMut::from(&b"PRIVMSG #chan :way too long"[..]);
        let err = codec.decode(&mut buf).unwrap_err();
        assert!(matches!(err, ProtocolError::MessageTooLong { limit: 16, .. }));
    }

    #[test]
    fn test_decode_eof_unterminated() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"ERROR :Closing link"[..]);
        assert_eq!(
            codec.decode_eof(&mut buf).unwrap().as_deref(),
            Some("ERROR :Closing link")
        );
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_encode_passthrough() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();
        codec.encode("NICK bot\r\n".to_string(), &mut buf).unwrap();
        assert_eq!(&buf[..], b"NICK bot\r\n");
    }
}
