//! Buffered encoder and decoder for the token stream.
//!
//! Messages carry no length prefix, so the decoder parses speculatively: it
//! walks a complete message out of the buffer and only then consumes the
//! bytes. A message cut short by the transport leaves the buffer untouched.

use crate::error::ProtocolError;
use crate::kind::IncomingKind;
use crate::message::Incoming;
use crate::response::decode_message;
use crate::token::{TokenCursor, TokenWriter};
use bytes::{Buf, Bytes, BytesMut};

/// Encodes the handshake tokens that precede any framed request.
pub struct Encoder;

impl Encoder {
    /// The client's capability version, sent first on a new connection.
    pub fn handshake(client_version: i32) -> Bytes {
        let mut w = TokenWriter::new();
        w.put_int(client_version);
        w.into_bytes()
    }

    /// Bare client id, sent instead of a start message to pre-linking servers.
    pub fn legacy_client_id(client_id: i32) -> Bytes {
        let mut w = TokenWriter::new();
        w.put_int(client_id);
        w.into_bytes()
    }
}

/// Accumulates bytes from the transport and yields decoded messages.
pub struct Decoder {
    buffer: BytesMut,
}

impl Decoder {
    pub fn new() -> Self {
        Self::with_capacity(8192)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Takes one raw token, as used during the handshake.
    pub fn next_token(&mut self) -> Option<String> {
        let mut cur = TokenCursor::new(&self.buffer);
        let token = cur.read_string().ok()?;
        let used = cur.position();
        self.buffer.advance(used);
        Some(token)
    }

    /// Takes one integer token, as used during the handshake.
    pub fn next_int(&mut self) -> Result<Option<i32>, ProtocolError> {
        let mut cur = TokenCursor::new(&self.buffer);
        match cur.read_int() {
            Ok(value) => {
                let used = cur.position();
                self.buffer.advance(used);
                Ok(Some(value))
            }
            Err(ProtocolError::Incomplete) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Attempts to decode the next message from the buffer.
    ///
    /// Returns `Ok(None)` when more bytes are needed. A "not valid" kind tag
    /// yields an empty batch. An unknown kind consumes its tag and returns
    /// [`ProtocolError::UnknownMessageKind`]; the caller may keep decoding.
    pub fn decode(&mut self, server_version: i32) -> Result<Option<Vec<Incoming>>, ProtocolError> {
        let mut cur = TokenCursor::new(&self.buffer);
        let tag = match cur.read_int() {
            Ok(tag) => tag,
            Err(ProtocolError::Incomplete) => return Ok(None),
            Err(e) => return Err(e),
        };

        if tag == IncomingKind::NOT_VALID {
            let used = cur.position();
            self.buffer.advance(used);
            return Ok(Some(Vec::new()));
        }

        let Some(kind) = IncomingKind::from_i32(tag) else {
            let used = cur.position();
            self.buffer.advance(used);
            return Err(ProtocolError::UnknownMessageKind(tag));
        };

        match decode_message(kind, &mut cur, server_version) {
            Ok(messages) => {
                let used = cur.position();
                self.buffer.advance(used);
                Ok(Some(messages))
            }
            Err(ProtocolError::Incomplete) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{NextValidId, TickSize};

    fn tokens(parts: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        for p in parts {
            out.extend_from_slice(p.as_bytes());
            out.push(0);
        }
        out
    }

    #[test]
    fn test_handshake_bytes() {
        assert_eq!(&Encoder::handshake(63)[..], b"63\0");
        assert_eq!(&Encoder::legacy_client_id(7)[..], b"7\0");
    }

    #[test]
    fn test_decode_waits_for_complete_message() {
        let bytes = tokens(&["9", "1", "42"]);
        let mut decoder = Decoder::new();

        decoder.extend(&bytes[..3]);
        assert!(decoder.decode(63).unwrap().is_none());
        assert_eq!(decoder.buffered(), 3);

        decoder.extend(&bytes[3..]);
        let msgs = decoder.decode(63).unwrap().unwrap();
        assert_eq!(msgs, vec![Incoming::NextValidId(NextValidId { order_id: 42 })]);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_decode_multiple_messages() {
        let mut decoder = Decoder::new();
        decoder.extend(&tokens(&["2", "1", "3", "0", "200", "9", "1", "5"]));

        let first = decoder.decode(63).unwrap().unwrap();
        assert_eq!(
            first,
            vec![Incoming::TickSize(TickSize {
                ticker_id: 3,
                field: 0,
                size: 200
            })]
        );
        let second = decoder.decode(63).unwrap().unwrap();
        assert_eq!(second.len(), 1);
        assert!(decoder.decode(63).unwrap().is_none());
    }

    #[test]
    fn test_not_valid_tag_is_skipped() {
        let mut decoder = Decoder::new();
        decoder.extend(&tokens(&["-1", "9", "1", "5"]));
        assert_eq!(decoder.decode(63).unwrap(), Some(Vec::new()));
        assert_eq!(decoder.decode(63).unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_kind_consumes_tag() {
        let mut decoder = Decoder::new();
        decoder.extend(&tokens(&["99", "9", "1", "5"]));
        let err = decoder.decode(63).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownMessageKind(99)));
        assert!(!err.is_fatal());
        // the stream continues after the tag
        assert_eq!(decoder.decode(63).unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_token_is_fatal() {
        let mut decoder = Decoder::new();
        decoder.extend(&tokens(&["9", "1", "forty-two"]));
        let err = decoder.decode(63).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidInt(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_handshake_tokens() {
        let mut decoder = Decoder::new();
        decoder.extend(b"63\020240101 12:00:00 EST\0");
        assert_eq!(decoder.next_int().unwrap(), Some(63));
        assert_eq!(decoder.next_token().as_deref(), Some("20240101 12:00:00 EST"));
        assert_eq!(decoder.next_token(), None);
        assert_eq!(decoder.next_int().unwrap(), None);
    }

    #[test]
    fn test_byte_at_a_time_delivery() {
        let bytes = tokens(&["17", "3", "1", "a", "b", "1", "d", "1", "2", "0.5", "1.5", "10", "1.2", "false", "4"]);
        let mut decoder = Decoder::new();
        let mut out = Vec::new();
        for b in bytes {
            decoder.extend(&[b]);
            if let Some(msgs) = decoder.decode(63).unwrap() {
                out.extend(msgs);
            }
        }
        assert_eq!(out.len(), 2);
        assert_eq!(decoder.buffered(), 0);
    }
}
