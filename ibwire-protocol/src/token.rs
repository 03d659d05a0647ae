//! Null-terminated text token codec.
//!
//! Every field on the wire is printable text followed by a single zero byte.
//! Numeric optionals use the type's maximum as the "unset" sentinel, which is
//! written as an empty token by the `_max` writers and restored by the `_max`
//! readers.

use crate::contract::TagValue;
use crate::error::ProtocolError;
use bytes::{BufMut, Bytes, BytesMut};

/// Field terminator.
pub const EOL: u8 = 0;

/// Accumulates the tokens of one outgoing message.
#[derive(Debug, Default)]
pub struct TokenWriter {
    buf: BytesMut,
}

impl TokenWriter {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(256),
        }
    }

    /// Writes a string token. Characters outside Latin-1 are replaced with `?`
    /// and embedded terminators are dropped.
    pub fn put_str(&mut self, value: &str) {
        for c in value.chars() {
            match c as u32 {
                0 => {}
                code if code < 256 => self.buf.put_u8(code as u8),
                _ => self.buf.put_u8(b'?'),
            }
        }
        self.buf.put_u8(EOL);
    }

    pub fn put_int(&mut self, value: i32) {
        self.put_display(value);
    }

    pub fn put_long(&mut self, value: i64) {
        self.put_display(value);
    }

    pub fn put_double(&mut self, value: f64) {
        self.put_display(value);
    }

    /// Writes `1` or `0`.
    pub fn put_bool(&mut self, value: bool) {
        self.put_int(if value { 1 } else { 0 });
    }

    /// Writes an int, or an empty token when it equals `i32::MAX`.
    pub fn put_int_max(&mut self, value: i32) {
        if value == i32::MAX {
            self.put_empty();
        } else {
            self.put_int(value);
        }
    }

    /// Writes a double, or an empty token when it equals `f64::MAX`.
    pub fn put_double_max(&mut self, value: f64) {
        if value == f64::MAX {
            self.put_empty();
        } else {
            self.put_double(value);
        }
    }

    /// Writes a tag/value list as a single `tag=value;` token.
    pub fn put_tag_values(&mut self, options: &[TagValue]) {
        let mut joined = String::new();
        for option in options {
            joined.push_str(&option.tag);
            joined.push('=');
            joined.push_str(&option.value);
            joined.push(';');
        }
        self.put_str(&joined);
    }

    pub fn put_empty(&mut self) {
        self.buf.put_u8(EOL);
    }

    fn put_display<T: std::fmt::Display>(&mut self, value: T) {
        self.buf.extend_from_slice(value.to_string().as_bytes());
        self.buf.put_u8(EOL);
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Reads tokens from a borrowed buffer.
///
/// Running out of bytes before a terminator yields
/// [`ProtocolError::Incomplete`], leaving it to the caller to wait for more
/// input and retry from the start of the message.
#[derive(Debug, Clone)]
pub struct TokenCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Returns the raw bytes of the next token, without its terminator.
    pub fn next_token(&mut self) -> Result<&'a [u8], ProtocolError> {
        let rest = &self.buf[self.pos..];
        let end = rest
            .iter()
            .position(|&b| b == EOL)
            .ok_or(ProtocolError::Incomplete)?;
        self.pos += end + 1;
        Ok(&rest[..end])
    }

    /// Reads a string token, decoding bytes as Latin-1.
    pub fn read_string(&mut self) -> Result<String, ProtocolError> {
        let token = self.next_token()?;
        Ok(token.iter().map(|&b| b as char).collect())
    }

    /// Reads an int; an empty token reads as 0.
    pub fn read_int(&mut self) -> Result<i32, ProtocolError> {
        let text = self.read_string()?;
        parse_or(&text, 0, ProtocolError::InvalidInt)
    }

    /// Reads an int; an empty token reads as `i32::MAX`.
    pub fn read_int_max(&mut self) -> Result<i32, ProtocolError> {
        let text = self.read_string()?;
        parse_or(&text, i32::MAX, ProtocolError::InvalidInt)
    }

    pub fn read_long(&mut self) -> Result<i64, ProtocolError> {
        let text = self.read_string()?;
        parse_or(&text, 0, ProtocolError::InvalidLong)
    }

    pub fn read_double(&mut self) -> Result<f64, ProtocolError> {
        let text = self.read_string()?;
        parse_or(&text, 0.0, ProtocolError::InvalidDouble)
    }

    /// Reads a double; an empty token reads as `f64::MAX`.
    pub fn read_double_max(&mut self) -> Result<f64, ProtocolError> {
        let text = self.read_string()?;
        parse_or(&text, f64::MAX, ProtocolError::InvalidDouble)
    }

    /// Reads an integer token and tests it for nonzero. Empty reads as false.
    pub fn read_bool_from_int(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.read_int()? != 0)
    }

    /// Reads a literal `true`/`false` token.
    pub fn read_bool_text(&mut self) -> Result<bool, ProtocolError> {
        let text = self.read_string()?;
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if trimmed.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(ProtocolError::InvalidBool(text))
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    text: &str,
    empty: T,
    err: fn(String) -> ProtocolError,
) -> Result<T, ProtocolError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(empty);
    }
    trimmed.parse().map_err(|_| err(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_writer_scalars() {
        let mut w = TokenWriter::new();
        w.put_int(42);
        w.put_long(-7);
        w.put_double(1.5);
        w.put_bool(true);
        w.put_bool(false);
        w.put_str("AAPL");
        assert_eq!(w.as_slice(), b"42\0-7\01.5\01\00\0AAPL\0");
    }

    #[test]
    fn test_max_sentinels_written_empty() {
        let mut w = TokenWriter::new();
        w.put_int_max(i32::MAX);
        w.put_double_max(f64::MAX);
        w.put_int_max(5);
        w.put_double_max(0.25);
        assert_eq!(w.as_slice(), b"\0\05\00.25\0");
    }

    #[test]
    fn test_tag_values_single_token() {
        let mut w = TokenWriter::new();
        w.put_tag_values(&[TagValue::new("a", "1"), TagValue::new("b", "x")]);
        assert_eq!(w.as_slice(), b"a=1;b=x;\0");

        let mut w = TokenWriter::new();
        w.put_tag_values(&[]);
        assert_eq!(w.as_slice(), b"\0");
    }

    #[test]
    fn test_string_latin1_and_terminator_stripped() {
        let mut w = TokenWriter::new();
        w.put_str("caf\u{e9}\0\u{263a}");
        assert_eq!(w.as_slice(), &[b'c', b'a', b'f', 0xe9, b'?', 0]);

        let mut c = TokenCursor::new(w.as_slice());
        assert_eq!(c.read_string().unwrap(), "caf\u{e9}?");
    }

    #[test]
    fn test_empty_token_defaults() {
        let data = b"\0\0\0\0\0\0\0";
        let mut c = TokenCursor::new(data);
        assert_eq!(c.read_int().unwrap(), 0);
        assert_eq!(c.read_int_max().unwrap(), i32::MAX);
        assert_eq!(c.read_long().unwrap(), 0);
        assert_eq!(c.read_double().unwrap(), 0.0);
        assert_eq!(c.read_double_max().unwrap(), f64::MAX);
        assert!(!c.read_bool_from_int().unwrap());
        assert_eq!(c.read_string().unwrap(), "");
        assert_eq!(c.remaining(), 0);
    }

    #[test]
    fn test_bool_from_int_nonzero() {
        let mut c = TokenCursor::new(b"1\00\02\0");
        assert!(c.read_bool_from_int().unwrap());
        assert!(!c.read_bool_from_int().unwrap());
        assert!(c.read_bool_from_int().unwrap());
    }

    #[test]
    fn test_bool_text() {
        let mut c = TokenCursor::new(b"true\0False\0yes\0");
        assert!(c.read_bool_text().unwrap());
        assert!(!c.read_bool_text().unwrap());
        assert!(matches!(
            c.read_bool_text(),
            Err(ProtocolError::InvalidBool(_))
        ));
    }

    #[test]
    fn test_incomplete_token() {
        let mut c = TokenCursor::new(b"12\034");
        assert_eq!(c.read_int().unwrap(), 12);
        assert!(matches!(c.read_int(), Err(ProtocolError::Incomplete)));
        assert_eq!(c.position(), 3);
    }

    #[test]
    fn test_invalid_numbers() {
        let mut c = TokenCursor::new(b"abc\0x.5\0");
        assert!(matches!(c.read_int(), Err(ProtocolError::InvalidInt(_))));
        assert!(matches!(
            c.read_double(),
            Err(ProtocolError::InvalidDouble(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_int_max_roundtrip(value in any::<i32>()) {
            let mut w = TokenWriter::new();
            w.put_int_max(value);
            let mut c = TokenCursor::new(w.as_slice());
            prop_assert_eq!(c.read_int_max().unwrap(), value);
        }

        #[test]
        fn prop_double_roundtrip(value in -1.0e12f64..1.0e12f64) {
            let mut w = TokenWriter::new();
            w.put_double(value);
            let mut c = TokenCursor::new(w.as_slice());
            prop_assert_eq!(c.read_double().unwrap(), value);
        }

        #[test]
        fn prop_strings_never_contain_terminator(s in "[ -~]{0,40}") {
            let mut w = TokenWriter::new();
            w.put_str(&s);
            prop_assert_eq!(w.as_slice().iter().filter(|&&b| b == EOL).count(), 1);
            let mut c = TokenCursor::new(w.as_slice());
            prop_assert_eq!(c.read_string().unwrap(), s);
        }
    }
}
