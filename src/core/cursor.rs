// Forward-only cursor over a pre-order token slice, with O(1) subtree skips.
use crate::core::error::{Error, ErrorKind};
use crate::core::token::{Token, TokenKind};
use bstr::ByteSlice;

#[derive(Debug)]
pub struct TokenCursor<'a> {
    src: &'a [u8],
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    pub fn new(src: &'a [u8], tokens: &'a [Token]) -> Self {
        Self {
            src,
            tokens,
            pos: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn src(&self) -> &'a [u8] {
        self.src
    }

    pub fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    /// Consumes exactly one token; containers are entered, not skipped.
    pub fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    /// Consumes the next token together with its whole subtree.
    pub fn skip_subtree(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += token.extent;
        Some(token)
    }

    pub fn expect_next(&mut self, what: &str) -> Result<&'a Token, Error> {
        self.advance().ok_or_else(|| {
            Error::new(ErrorKind::Internal)
                .with_message(format!("token stream ended while reading {what}"))
                .with_offset(self.src.len())
        })
    }

    /// Decodes the next token as a base-10 `i64`; only integer primitives qualify.
    pub fn next_int(&mut self, key: &str) -> Result<i64, Error> {
        self.next_int_or(key, ErrorKind::Schema)
    }

    /// Like `next_int`, but an integer literal outside `i64` reports `range_kind`.
    pub fn next_int_or(&mut self, key: &str, range_kind: ErrorKind) -> Result<i64, Error> {
        let token = self.expect_next(key)?;
        let text = token.text(self.src);
        let (kind, message) = match int_value(token, text) {
            Ok(value) => return Ok(value),
            Err(IntFault::NotInteger) => (
                ErrorKind::Schema,
                format!(
                    "expected an integer, found {} `{}`",
                    token.kind.as_str(),
                    text.as_bstr()
                ),
            ),
            Err(IntFault::OutOfRange) => (
                range_kind,
                format!("integer `{}` is out of range", text.as_bstr()),
            ),
        };
        Err(Error::new(kind)
            .with_message(message)
            .with_key(key)
            .with_offset(token.start))
    }

    /// Confirms the cursor ended exactly where a value subtree ends.
    pub fn check_consumed(&self, value_index: usize, key: &str) -> Result<(), Error> {
        let expected = value_index + self.tokens[value_index].extent;
        if self.pos != expected {
            return Err(Error::new(ErrorKind::Internal)
                .with_message(format!(
                    "cursor at token {} after field, expected {expected}",
                    self.pos
                ))
                .with_key(key));
        }
        Ok(())
    }
}

/// Exact byte comparison of a string token against `key`.
pub fn key_eq(src: &[u8], token: &Token, key: &str) -> bool {
    token.kind == TokenKind::String && token.text(src) == key.as_bytes()
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum IntFault {
    NotInteger,
    OutOfRange,
}

fn int_value(token: &Token, text: &[u8]) -> Result<i64, IntFault> {
    let digits = text.strip_prefix(b"-").unwrap_or(text);
    if token.kind != TokenKind::Primitive
        || digits.is_empty()
        || !digits.iter().all(u8::is_ascii_digit)
    {
        return Err(IntFault::NotInteger);
    }
    std::str::from_utf8(text)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or(IntFault::OutOfRange)
}
