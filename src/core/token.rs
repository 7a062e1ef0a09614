//! Purpose: Flat, pre-order JSON token model shared by the tokenizer and cursor.
//! Exports: `Token`, `TokenKind`.
//! Role: Tokens reference the source buffer by byte span; no text is copied.
//! Invariants: A container token is followed by the tokens of all its children, in order.
//! Invariants: `extent` counts the token itself plus every token of its subtree.
use std::ops::Range;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenKind {
    Object,
    Array,
    String,
    Primitive,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Object => "object",
            TokenKind::Array => "array",
            TokenKind::String => "string",
            TokenKind::Primitive => "primitive",
        }
    }

    pub fn is_container(self) -> bool {
        matches!(self, TokenKind::Object | TokenKind::Array)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offsets into the source. String spans exclude the quotes.
    pub start: usize,
    pub end: usize,
    /// Immediate children: key/value pairs for objects, elements for arrays,
    /// 1 for an object key, 0 for values that are not containers.
    pub size: usize,
    pub extent: usize,
}

impl Token {
    pub fn new(kind: TokenKind, start: usize, end: usize) -> Self {
        Self {
            kind,
            start,
            end,
            size: 0,
            extent: 1,
        }
    }

    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn text<'a>(&self, src: &'a [u8]) -> &'a [u8] {
        &src[self.span()]
    }
}
