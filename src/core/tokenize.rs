//! Purpose: Turn a JSON byte buffer into a capacity-bounded, pre-order token list.
//! Exports: `tokenize`, `DEFAULT_MAX_TOKENS`.
//! Role: Strict tokenizer feeding the marker geometry loader; spans only, no values.
//! Invariants: Malformed input is `ErrorKind::Syntax`; capacity overflow is `ErrorKind::TokenLimit`.
//! Invariants: Container `size` and `extent` are final once the closing bracket is seen.
//! Invariants: Nesting is tracked on an explicit stack; input depth never grows the call stack.
use crate::core::error::{Error, ErrorKind};
use crate::core::token::{Token, TokenKind};

pub const DEFAULT_MAX_TOKENS: usize = 65_536;

pub fn tokenize(src: &[u8], max_tokens: usize) -> Result<Vec<Token>, Error> {
    if let Err(err) = std::str::from_utf8(src) {
        return Err(Error::new(ErrorKind::Syntax)
            .with_message("document is not valid UTF-8")
            .with_offset(err.valid_up_to())
            .with_source(err));
    }
    let tokens = Tokenizer::new(src, max_tokens).run()?;
    tracing::debug!(tokens = tokens.len(), max_tokens, "tokenized document");
    Ok(tokens)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    /// Just opened; a value/key or the closing bracket may follow.
    Open,
    /// Object key read; `:` must follow.
    AfterKey,
    /// A value must follow (after `:` or an array `,`).
    NeedValue,
    /// Object `,` read; a key must follow.
    NeedKey,
    /// A member is complete; `,` or the closing bracket must follow.
    AfterValue,
}

struct Frame {
    index: usize,
    kind: TokenKind,
    state: State,
}

struct Tokenizer<'a> {
    src: &'a [u8],
    pos: usize,
    max_tokens: usize,
    tokens: Vec<Token>,
    stack: Vec<Frame>,
}

impl<'a> Tokenizer<'a> {
    fn new(src: &'a [u8], max_tokens: usize) -> Self {
        Self {
            src,
            pos: 0,
            max_tokens,
            tokens: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, Error> {
        self.skip_ws();
        if self.pos == self.src.len() {
            return Err(self.syntax("empty document"));
        }
        self.value()?;

        while let Some(frame) = self.stack.last() {
            let (kind, state) = (frame.kind, frame.state);
            self.skip_ws();
            let Some(byte) = self.src.get(self.pos).copied() else {
                return Err(self.syntax("unexpected end of input"));
            };
            match (kind, state, byte) {
                (TokenKind::Array, State::Open | State::AfterValue, b']')
                | (TokenKind::Object, State::Open | State::AfterValue, b'}') => self.close(),
                (TokenKind::Array, State::Open | State::NeedValue, _)
                | (TokenKind::Object, State::NeedValue, _) => self.value()?,
                (TokenKind::Object, State::Open | State::NeedKey, b'"') => self.key()?,
                (TokenKind::Object, State::Open | State::NeedKey, _) => {
                    return Err(self.syntax("object keys must be strings"));
                }
                (TokenKind::Object, State::AfterKey, b':') => {
                    self.pos += 1;
                    self.set_state(State::NeedValue);
                }
                (TokenKind::Object, State::AfterKey, _) => {
                    return Err(self.syntax("expected ':' after object key"));
                }
                (TokenKind::Array, State::AfterValue, b',') => {
                    self.pos += 1;
                    self.set_state(State::NeedValue);
                }
                (TokenKind::Object, State::AfterValue, b',') => {
                    self.pos += 1;
                    self.set_state(State::NeedKey);
                }
                (_, State::AfterValue, _) => {
                    return Err(self.syntax("expected ',' or closing bracket"));
                }
                _ => return Err(self.syntax("unexpected character")),
            }
        }

        self.skip_ws();
        if self.pos != self.src.len() {
            return Err(self.syntax("trailing characters after document"));
        }
        Ok(self.tokens)
    }

    /// Starts one value at `pos`; containers are left open on the stack.
    fn value(&mut self) -> Result<(), Error> {
        self.count_child();
        self.set_state(State::AfterValue);
        match self.src[self.pos] {
            b'{' => self.open(TokenKind::Object),
            b'[' => self.open(TokenKind::Array),
            b'"' => self.string().map(|_| ()),
            b']' | b'}' | b',' | b':' => Err(self.syntax("expected a value")),
            _ => self.primitive(),
        }
    }

    fn key(&mut self) -> Result<(), Error> {
        self.count_child();
        let index = self.string()?;
        self.tokens[index].size = 1;
        self.set_state(State::AfterKey);
        Ok(())
    }

    fn open(&mut self, kind: TokenKind) -> Result<(), Error> {
        let index = self.push(Token::new(kind, self.pos, self.pos))?;
        self.pos += 1;
        self.stack.push(Frame {
            index,
            kind,
            state: State::Open,
        });
        Ok(())
    }

    fn close(&mut self) {
        self.pos += 1;
        if let Some(frame) = self.stack.pop() {
            let extent = self.tokens.len() - frame.index;
            let token = &mut self.tokens[frame.index];
            token.end = self.pos;
            token.extent = extent;
        }
    }

    fn string(&mut self) -> Result<usize, Error> {
        let quote = self.pos;
        self.pos += 1;
        while let Some(byte) = self.src.get(self.pos).copied() {
            match byte {
                b'"' => {
                    let index = self.push(Token::new(TokenKind::String, quote + 1, self.pos))?;
                    self.pos += 1;
                    return Ok(index);
                }
                b'\\' => self.escape()?,
                0x00..=0x1f => return Err(self.syntax("control character in string")),
                _ => self.pos += 1,
            }
        }
        self.pos = quote;
        Err(self.syntax("unterminated string"))
    }

    fn escape(&mut self) -> Result<(), Error> {
        self.pos += 1;
        match self.src.get(self.pos).copied() {
            Some(b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't') => {
                self.pos += 1;
                Ok(())
            }
            Some(b'u') => {
                let digits = self.src.get(self.pos + 1..self.pos + 5);
                match digits {
                    Some(hex) if hex.iter().all(u8::is_ascii_hexdigit) => {
                        self.pos += 5;
                        Ok(())
                    }
                    _ => Err(self.syntax("invalid unicode escape")),
                }
            }
            _ => Err(self.syntax("invalid escape sequence")),
        }
    }

    fn primitive(&mut self) -> Result<(), Error> {
        let start = self.pos;
        while let Some(byte) = self.src.get(self.pos).copied() {
            if is_delimiter(byte) {
                break;
            }
            self.pos += 1;
        }
        let text = &self.src[start..self.pos];
        if !is_literal(text) && !is_number(text) {
            self.pos = start;
            return Err(self.syntax("invalid literal"));
        }
        self.push(Token::new(TokenKind::Primitive, start, self.pos))?;
        Ok(())
    }

    fn push(&mut self, token: Token) -> Result<usize, Error> {
        if self.tokens.len() == self.max_tokens {
            return Err(Error::new(ErrorKind::TokenLimit)
                .with_message(format!(
                    "document needs more than {} tokens",
                    self.max_tokens
                ))
                .with_offset(token.start)
                .with_hint("Raise the token capacity (--max-tokens)."));
        }
        self.tokens.push(token);
        Ok(self.tokens.len() - 1)
    }

    fn count_child(&mut self) {
        let Some(frame) = self.stack.last() else {
            return;
        };
        // Object values belong to their key, which was already counted.
        if frame.kind == TokenKind::Object && frame.state == State::NeedValue {
            return;
        }
        self.tokens[frame.index].size += 1;
    }

    fn set_state(&mut self, state: State) {
        if let Some(frame) = self.stack.last_mut() {
            frame.state = state;
        }
    }

    fn skip_ws(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.src.get(self.pos).copied() {
            self.pos += 1;
        }
    }

    fn syntax(&self, message: &str) -> Error {
        Error::new(ErrorKind::Syntax)
            .with_message(message)
            .with_offset(self.pos)
    }
}

fn is_delimiter(byte: u8) -> bool {
    matches!(
        byte,
        b' ' | b'\t' | b'\n' | b'\r' | b',' | b':' | b']' | b'}' | b'[' | b'{' | b'"'
    )
}

fn is_literal(text: &[u8]) -> bool {
    matches!(text, b"true" | b"false" | b"null")
}

fn is_number(text: &[u8]) -> bool {
    let mut rest = text.strip_prefix(b"-").unwrap_or(text);
    match rest.first() {
        Some(b'0') => rest = &rest[1..],
        Some(b'1'..=b'9') => rest = skip_digits(rest),
        _ => return false,
    }
    if let Some(frac) = rest.strip_prefix(b".") {
        rest = skip_digits(frac);
        if rest.len() == frac.len() {
            return false;
        }
    }
    if let Some(b'e' | b'E') = rest.first() {
        let exp = &rest[1..];
        let exp = exp.strip_prefix(b"+").or_else(|| exp.strip_prefix(b"-")).unwrap_or(exp);
        rest = skip_digits(exp);
        if rest.len() == exp.len() {
            return false;
        }
    }
    rest.is_empty()
}

fn skip_digits(text: &[u8]) -> &[u8] {
    let count = text.iter().take_while(|byte| byte.is_ascii_digit()).count();
    &text[count..]
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_MAX_TOKENS, is_number, tokenize};
    use crate::core::error::ErrorKind;
    use crate::core::token::TokenKind;
    use proptest::prelude::*;

    fn kinds(src: &str) -> Vec<(TokenKind, usize, usize)> {
        tokenize(src.as_bytes(), DEFAULT_MAX_TOKENS)
            .expect("tokenize")
            .into_iter()
            .map(|token| (token.kind, token.size, token.extent))
            .collect()
    }

    #[test]
    fn object_tokens_are_pre_order_with_sizes_and_extents() {
        let got = kinds(r#"{"a": [1, 2], "b": "x"}"#);
        assert_eq!(
            got,
            vec![
                (TokenKind::Object, 2, 7),
                (TokenKind::String, 1, 1),
                (TokenKind::Array, 2, 3),
                (TokenKind::Primitive, 0, 1),
                (TokenKind::Primitive, 0, 1),
                (TokenKind::String, 1, 1),
                (TokenKind::String, 0, 1),
            ]
        );
    }

    #[test]
    fn spans_point_into_source() {
        let src = br#"{"key": "val", "n": -12.5e3}"#;
        let tokens = tokenize(src, DEFAULT_MAX_TOKENS).expect("tokenize");
        assert_eq!(tokens[0].text(src), src.as_slice());
        assert_eq!(tokens[1].text(src), b"key");
        assert_eq!(tokens[2].text(src), b"val");
        assert_eq!(tokens[4].text(src), b"-12.5e3");
    }

    #[test]
    fn nested_arrays_close_with_full_extent() {
        let got = kinds("[[1,2],[],[[3]]]");
        assert_eq!(got[0], (TokenKind::Array, 3, 8));
        assert_eq!(got[1], (TokenKind::Array, 2, 3));
        assert_eq!(got[4], (TokenKind::Array, 0, 1));
        assert_eq!(got[5], (TokenKind::Array, 1, 3));
    }

    #[test]
    fn escapes_stay_inside_string_span() {
        let src = r#"["a\"bé\n"]"#.as_bytes();
        let tokens = tokenize(src, DEFAULT_MAX_TOKENS).expect("tokenize");
        assert_eq!(tokens[1].text(src), r#"a\"bé\n"#.as_bytes());
    }

    #[test]
    fn malformed_documents_are_syntax_errors() {
        let cases = [
            "",
            "   ",
            "{",
            "[1, 2",
            "{\"a\": 1,}",
            "[1,]",
            "{\"a\" 1}",
            "{1: 2}",
            "[1 2]",
            "{\"a\": tru}",
            "[01]",
            "[1.]",
            "[\"open]",
            "[\"bad \\q escape\"]",
            "{} {}",
            "]",
            "{\"a\":}",
        ];
        for case in cases {
            let err = tokenize(case.as_bytes(), DEFAULT_MAX_TOKENS).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Syntax, "case {case:?}");
            assert!(err.offset().is_some(), "case {case:?}");
        }
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let err = tokenize(&[b'[', 0xff, b']'], DEFAULT_MAX_TOKENS).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(err.offset(), Some(1));
    }

    #[test]
    fn capacity_overflow_is_token_limit() {
        let src = b"[1, 2, 3]";
        assert_eq!(tokenize(src, 4).expect("fits").len(), 4);
        let err = tokenize(src, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenLimit);
    }

    #[test]
    fn number_grammar() {
        for ok in ["0", "-0", "12", "-3.25", "1e9", "2E-3", "0.5e+2"] {
            assert!(is_number(ok.as_bytes()), "{ok}");
        }
        for bad in ["", "-", "01", "1.", ".5", "1e", "+1", "0x10", "1-2"] {
            assert!(!is_number(bad.as_bytes()), "{bad}");
        }
    }

    fn json_value() -> impl Strategy<Value = serde_json::Value> {
        let leaf = prop_oneof![
            Just(serde_json::Value::Null),
            any::<bool>().prop_map(serde_json::Value::from),
            any::<i32>().prop_map(serde_json::Value::from),
            "[a-z]{0,6}".prop_map(serde_json::Value::from),
        ];
        leaf.prop_recursive(4, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(serde_json::Value::from),
                prop::collection::btree_map("[a-z]{1,4}", inner, 0..5)
                    .prop_map(|map| serde_json::Value::Object(map.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn container_extent_matches_children(value in json_value()) {
            let text = serde_json::to_string(&value).expect("encode");
            let tokens = tokenize(text.as_bytes(), DEFAULT_MAX_TOKENS).expect("tokenize");
            prop_assert_eq!(tokens[0].extent, tokens.len());
            for (index, token) in tokens.iter().enumerate() {
                let mut next = index + 1;
                let mut children = 0;
                if token.kind.is_container() {
                    while next < index + token.extent {
                        // Object keys carry their value as the following subtree.
                        let child = &tokens[next];
                        next += child.extent;
                        if token.kind == TokenKind::Object {
                            next += tokens[next].extent;
                        }
                        children += 1;
                    }
                    prop_assert_eq!(next, index + token.extent);
                    prop_assert_eq!(children, token.size);
                } else {
                    prop_assert_eq!(token.extent, 1);
                }
            }
        }
    }
}
