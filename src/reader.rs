//! Pull tokenizer for JSON text.
//!
//! [`JsonReader`] yields one [`Token`] per [`JsonReader::read`] call and keeps
//! track of where it is: line, position, depth and the JSON path of the
//! current token. A read that fails leaves the reader where it was, so the
//! same failure is reported again if the caller retries.
//!
//! ```rust
//! use jsongraph::reader::{JsonReader, Token};
//! use jsongraph::JsonValue;
//!
//! let mut reader = JsonReader::new(r#"{"tags": ["a"]}"#);
//! reader.read().unwrap();
//! assert_eq!(reader.token(), Some(&Token::StartObject));
//! reader.read().unwrap();
//! assert_eq!(reader.token(), Some(&Token::PropertyName("tags".to_string())));
//! reader.read().unwrap();
//! reader.read().unwrap();
//! assert_eq!(reader.token(), Some(&Token::Value(JsonValue::from("a"))));
//! assert_eq!(reader.path(), "tags[0]");
//! ```

use std::fmt;

use num_bigint::BigInt;

use crate::error::{Error, Location, Result};
use crate::path::{self, ContainerKind, Frame};
use crate::value::{JsonValue, Number};
use crate::JsonMap;

/// One lexical unit of a JSON document.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    StartObject,
    EndObject,
    StartArray,
    EndArray,
    PropertyName(String),
    /// A scalar: null, boolean, number or string.
    Value(JsonValue),
}

impl Token {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Token::Value(JsonValue::Null))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::StartObject => f.write_str("StartObject"),
            Token::EndObject => f.write_str("EndObject"),
            Token::StartArray => f.write_str("StartArray"),
            Token::EndArray => f.write_str("EndArray"),
            Token::PropertyName(_) => f.write_str("PropertyName"),
            Token::Value(JsonValue::Null) => f.write_str("Null"),
            Token::Value(JsonValue::Bool(_)) => f.write_str("Boolean"),
            Token::Value(JsonValue::Number(n)) if n.is_integer() => f.write_str("Integer"),
            Token::Value(JsonValue::Number(_)) => f.write_str("Float"),
            Token::Value(_) => f.write_str("String"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Value,
    ValueOrEnd,
    Key,
    KeyOrEnd,
    CommaOrEnd,
    Done,
}

/// Tokenizer over a JSON string.
#[derive(Debug, Clone)]
pub struct JsonReader<'a> {
    input: &'a str,
    position: usize,
    line: usize,
    column: usize,
    expect: Expect,
    stack: Vec<Frame>,
    token: Option<Token>,
    max_depth: Option<usize>,
    skipping: bool,
}

impl<'a> JsonReader<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        JsonReader {
            input,
            position: 0,
            line: 1,
            column: 0,
            expect: Expect::Value,
            stack: Vec::new(),
            token: None,
            max_depth: None,
            skipping: false,
        }
    }

    /// Limits container nesting. Exceeding it fails the read that opened the container.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The token produced by the last successful read.
    #[must_use]
    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    /// Number of open containers.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Characters consumed on the current line.
    #[must_use]
    pub fn position(&self) -> usize {
        self.column
    }

    /// JSON path of the current token.
    #[must_use]
    pub fn path(&self) -> String {
        path::render(&self.stack)
    }

    #[must_use]
    pub fn location(&self) -> Location {
        Location::new(self.path(), self.line, self.column)
    }

    /// Advances to the next token. Returns `false` once the document is complete.
    ///
    /// # Errors
    ///
    /// Returns a syntax error for malformed input, leaving the position unchanged,
    /// or a max depth error after opening a container that is nested too deeply.
    pub fn read(&mut self) -> Result<bool> {
        let snapshot = (self.position, self.line, self.column, self.expect);
        match self.advance() {
            Ok(token) => {
                self.token = token;
                if matches!(self.token, Some(Token::StartObject | Token::StartArray)) {
                    self.check_depth()?;
                }
                Ok(self.token.is_some())
            }
            Err(err) => {
                (self.position, self.line, self.column, self.expect) = snapshot;
                Err(err)
            }
        }
    }

    /// Reads and returns the next token, failing on end of input.
    pub fn read_token(&mut self) -> Result<Token> {
        if self.read()? {
            self.token
                .clone()
                .ok_or_else(|| Error::syntax("Unexpected end when reading JSON.", self.location()))
        } else {
            Err(Error::syntax(
                "Unexpected end when reading JSON.",
                self.location(),
            ))
        }
    }

    /// Looks at the next token without consuming it.
    pub fn peek(&self) -> Result<Option<Token>> {
        let mut probe = self.clone();
        probe.skipping = true;
        probe.read()?;
        Ok(probe.token)
    }

    /// Skips the value starting at the current token.
    ///
    /// On a property name the property's value is skipped as well. Afterwards
    /// the current token is the last token of the skipped value.
    pub fn skip(&mut self) -> Result<()> {
        if matches!(self.token, Some(Token::PropertyName(_))) {
            self.read()?;
        }
        if matches!(self.token, Some(Token::StartObject | Token::StartArray)) {
            let depth = self.depth() - 1;
            self.skip_to_depth(depth)?;
        }
        Ok(())
    }

    /// Reads until the reader is back at `depth`, discarding what it reads.
    ///
    /// A property name whose value has not been read yet is skipped together
    /// with that value. Max depth is not enforced while skipping.
    pub fn skip_to_depth(&mut self, depth: usize) -> Result<()> {
        self.skipping = true;
        let result = self.drain(depth);
        self.skipping = false;
        result
    }

    fn drain(&mut self, depth: usize) -> Result<()> {
        while self.depth() > depth {
            if !self.read()? {
                break;
            }
        }
        if matches!(self.token, Some(Token::PropertyName(_))) {
            self.read()?;
            if matches!(self.token, Some(Token::StartObject | Token::StartArray)) {
                while self.depth() > depth {
                    self.read()?;
                }
            }
        }
        Ok(())
    }

    /// Materializes the value starting at the current token.
    pub fn read_value_tree(&mut self) -> Result<JsonValue> {
        match self.token.clone() {
            Some(Token::Value(value)) => Ok(value),
            Some(Token::StartArray) => {
                let mut items = Vec::new();
                loop {
                    match self.read_token()? {
                        Token::EndArray => return Ok(JsonValue::Array(items)),
                        _ => items.push(self.read_value_tree()?),
                    }
                }
            }
            Some(Token::StartObject) => {
                let mut members = JsonMap::new();
                loop {
                    match self.read_token()? {
                        Token::EndObject => return Ok(JsonValue::Object(members)),
                        Token::PropertyName(name) => {
                            self.read_token()?;
                            let value = self.read_value_tree()?;
                            members.insert(name, value);
                        }
                        other => {
                            return Err(Error::syntax(
                                format!("Unexpected token when reading object: {other}."),
                                self.location(),
                            ))
                        }
                    }
                }
            }
            Some(Token::PropertyName(_)) => {
                self.read_token()?;
                self.read_value_tree()
            }
            Some(other) => Err(Error::syntax(
                format!("Unexpected token when reading value: {other}."),
                self.location(),
            )),
            None => Err(Error::syntax(
                "Unexpected end when reading JSON.",
                self.location(),
            )),
        }
    }

    fn check_depth(&self) -> Result<()> {
        if self.skipping {
            return Ok(());
        }
        match self.max_depth {
            Some(max) if self.stack.len() > max => Err(Error::max_depth(max, self.location())),
            _ => Ok(()),
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn next_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.position += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if matches!(ch, ' ' | '\t' | '\n' | '\r') {
                self.next_char();
            } else {
                break;
            }
        }
    }

    /// Location of the character about to be consumed.
    fn here(&self) -> Location {
        Location::new(self.path(), self.line, self.column + 1)
    }

    fn unexpected_end(&self) -> Error {
        Error::syntax("Unexpected end when reading JSON.", self.here())
    }

    fn advance(&mut self) -> Result<Option<Token>> {
        loop {
            self.skip_whitespace();
            let Some(ch) = self.peek_char() else {
                return if self.expect == Expect::Done {
                    Ok(None)
                } else {
                    Err(self.unexpected_end())
                };
            };

            match self.expect {
                Expect::Value | Expect::ValueOrEnd => {
                    if ch == ']' && self.expect == Expect::ValueOrEnd {
                        self.next_char();
                        self.stack.pop();
                        self.after_value();
                        return Ok(Some(Token::EndArray));
                    }
                    return self.parse_value_start(ch).map(Some);
                }
                Expect::Key | Expect::KeyOrEnd => {
                    if ch == '}' && self.expect == Expect::KeyOrEnd {
                        self.next_char();
                        self.stack.pop();
                        self.after_value();
                        return Ok(Some(Token::EndObject));
                    }
                    if ch != '"' {
                        return Err(Error::syntax(
                            format!("Invalid property identifier character: {ch}."),
                            self.here(),
                        ));
                    }
                    let name = self.parse_string()?;
                    self.skip_whitespace();
                    match self.peek_char() {
                        Some(':') => {
                            self.next_char();
                        }
                        Some(other) => {
                            return Err(Error::syntax(
                                format!(
                                    "Invalid character after parsing property name. Expected ':' but got: {other}."
                                ),
                                self.here(),
                            ))
                        }
                        None => return Err(self.unexpected_end()),
                    }
                    if let Some(frame) = self.stack.last_mut() {
                        frame.name = Some(name.clone());
                    }
                    self.expect = Expect::Value;
                    return Ok(Some(Token::PropertyName(name)));
                }
                Expect::CommaOrEnd => {
                    let kind = self.stack.last().map(|frame| frame.kind);
                    match (ch, kind) {
                        (',', Some(ContainerKind::Object)) => {
                            self.next_char();
                            self.expect = Expect::Key;
                        }
                        (',', Some(ContainerKind::Array)) => {
                            self.next_char();
                            self.expect = Expect::Value;
                        }
                        ('}', Some(ContainerKind::Object)) => {
                            self.next_char();
                            self.stack.pop();
                            self.after_value();
                            return Ok(Some(Token::EndObject));
                        }
                        (']', Some(ContainerKind::Array)) => {
                            self.next_char();
                            self.stack.pop();
                            self.after_value();
                            return Ok(Some(Token::EndArray));
                        }
                        _ => {
                            return Err(Error::syntax(
                                format!(
                                    "After parsing a value an unexpected character was encountered: {ch}."
                                ),
                                self.here(),
                            ))
                        }
                    }
                }
                Expect::Done => {
                    return Err(Error::syntax(
                        format!(
                            "Additional text encountered after finished reading JSON content: {ch}."
                        ),
                        self.here(),
                    ))
                }
            }
        }
    }

    fn parse_value_start(&mut self, ch: char) -> Result<Token> {
        let token = match ch {
            '{' => {
                self.next_char();
                self.enter_value();
                self.stack.push(Frame::new(ContainerKind::Object));
                self.expect = Expect::KeyOrEnd;
                return Ok(Token::StartObject);
            }
            '[' => {
                self.next_char();
                self.enter_value();
                self.stack.push(Frame::new(ContainerKind::Array));
                self.expect = Expect::ValueOrEnd;
                return Ok(Token::StartArray);
            }
            '"' => Token::Value(JsonValue::String(self.parse_string()?)),
            't' => {
                self.parse_literal("true")?;
                Token::Value(JsonValue::Bool(true))
            }
            'f' => {
                self.parse_literal("false")?;
                Token::Value(JsonValue::Bool(false))
            }
            'n' => {
                self.parse_literal("null")?;
                Token::Value(JsonValue::Null)
            }
            '-' | '0'..='9' => Token::Value(JsonValue::Number(self.parse_number()?)),
            other => {
                return Err(Error::syntax(
                    format!("Unexpected character encountered while parsing value: {other}."),
                    self.here(),
                ))
            }
        };
        self.enter_value();
        self.after_value();
        Ok(token)
    }

    fn enter_value(&mut self) {
        if let Some(frame) = self.stack.last_mut() {
            frame.advance();
        }
    }

    fn after_value(&mut self) {
        self.expect = if self.stack.is_empty() {
            Expect::Done
        } else {
            Expect::CommaOrEnd
        };
    }

    fn parse_literal(&mut self, literal: &str) -> Result<()> {
        if self.input[self.position..].starts_with(literal) {
            for _ in 0..literal.len() {
                self.next_char();
            }
            Ok(())
        } else {
            Err(Error::syntax(
                format!("Error parsing value: expected '{literal}'."),
                self.here(),
            ))
        }
    }

    fn parse_number(&mut self) -> Result<Number> {
        let start = self.position;
        let mut is_float = false;

        if self.peek_char() == Some('-') {
            self.next_char();
        }
        let digits = self.consume_digits();
        if digits == 0 {
            return Err(Error::syntax("Invalid number: missing digits.", self.here()));
        }
        if self.peek_char() == Some('.') {
            is_float = true;
            self.next_char();
            if self.consume_digits() == 0 {
                return Err(Error::syntax(
                    "Invalid number: expected digits after decimal point.",
                    self.here(),
                ));
            }
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            is_float = true;
            self.next_char();
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.next_char();
            }
            if self.consume_digits() == 0 {
                return Err(Error::syntax(
                    "Invalid number: expected digits in exponent.",
                    self.here(),
                ));
            }
        }

        let text = &self.input[start..self.position];
        if is_float {
            text.parse::<f64>()
                .map(Number::Float)
                .map_err(|_| Error::syntax(format!("Invalid number: {text}."), self.here()))
        } else if let Ok(i) = text.parse::<i64>() {
            Ok(Number::Integer(i))
        } else {
            text.parse::<BigInt>()
                .map(Number::BigInt)
                .map_err(|_| Error::syntax(format!("Invalid number: {text}."), self.here()))
        }
    }

    fn consume_digits(&mut self) -> usize {
        let mut count = 0;
        while matches!(self.peek_char(), Some('0'..='9')) {
            self.next_char();
            count += 1;
        }
        count
    }

    fn parse_string(&mut self) -> Result<String> {
        self.next_char(); // opening quote
        let mut result = String::new();

        while let Some(ch) = self.next_char() {
            match ch {
                '"' => return Ok(result),
                '\\' => match self.next_char() {
                    Some('\\') => result.push('\\'),
                    Some('"') => result.push('"'),
                    Some('/') => result.push('/'),
                    Some('n') => result.push('\n'),
                    Some('r') => result.push('\r'),
                    Some('t') => result.push('\t'),
                    Some('b') => result.push('\u{0008}'),
                    Some('f') => result.push('\u{000C}'),
                    Some('u') => {
                        let high = self.parse_hex4()?;
                        let code_point = if (0xD800..0xDC00).contains(&high) {
                            if self.next_char() != Some('\\') || self.next_char() != Some('u') {
                                return Err(Error::syntax(
                                    "Invalid Unicode escape: unpaired surrogate.",
                                    self.here(),
                                ));
                            }
                            let low = self.parse_hex4()?;
                            if !(0xDC00..0xE000).contains(&low) {
                                return Err(Error::syntax(
                                    "Invalid Unicode escape: unpaired surrogate.",
                                    self.here(),
                                ));
                            }
                            0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
                        } else {
                            high
                        };
                        let ch = char::from_u32(code_point).ok_or_else(|| {
                            Error::syntax("Invalid Unicode code point.", self.here())
                        })?;
                        result.push(ch);
                    }
                    Some(other) => {
                        return Err(Error::syntax(
                            format!("Bad JSON escape sequence: \\{other}."),
                            self.here(),
                        ))
                    }
                    None => break,
                },
                '\n' | '\r' => {
                    return Err(Error::syntax(
                        "Unterminated string. Expected delimiter: \".",
                        self.here(),
                    ))
                }
                other => result.push(other),
            }
        }
        Err(Error::syntax(
            "Unterminated string. Expected delimiter: \".",
            self.here(),
        ))
    }

    fn parse_hex4(&mut self) -> Result<u32> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .next_char()
                .and_then(|ch| ch.to_digit(16))
                .ok_or_else(|| {
                    Error::syntax(
                        "Invalid Unicode escape sequence: expected 4 hex digits.",
                        self.here(),
                    )
                })?;
            code = code * 16 + digit;
        }
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        let mut reader = JsonReader::new(input);
        let mut out = Vec::new();
        while reader.read().unwrap() {
            out.push(reader.token().cloned().unwrap());
        }
        out
    }

    #[test]
    fn test_token_stream() {
        assert_eq!(
            tokens(r#"{"a": [1, 2.5, "x"], "b": null}"#),
            vec![
                Token::StartObject,
                Token::PropertyName("a".to_string()),
                Token::StartArray,
                Token::Value(JsonValue::from(1)),
                Token::Value(JsonValue::from(2.5)),
                Token::Value(JsonValue::from("x")),
                Token::EndArray,
                Token::PropertyName("b".to_string()),
                Token::Value(JsonValue::Null),
                Token::EndObject,
            ]
        );
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(
            tokens("[{}, []]"),
            vec![
                Token::StartArray,
                Token::StartObject,
                Token::EndObject,
                Token::StartArray,
                Token::EndArray,
                Token::EndArray,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        let parsed = tokens(r#""a\"b\\c\né😀""#);
        assert_eq!(parsed, vec![Token::Value(JsonValue::from("a\"b\\c\né😀"))]);
    }

    #[test]
    fn test_big_integers() {
        let parsed = tokens("123456789012345678901234567890");
        match &parsed[0] {
            Token::Value(JsonValue::Number(Number::BigInt(b))) => {
                assert_eq!(b.to_string(), "123456789012345678901234567890");
            }
            other => panic!("Expected big integer, got {other:?}"),
        }
    }

    #[test]
    fn test_paths() {
        let mut reader = JsonReader::new(r#"{"a": {"b": [10, 20]}}"#);
        let mut paths = Vec::new();
        while reader.read().unwrap() {
            paths.push(reader.path());
        }
        assert_eq!(
            paths,
            vec!["", "a", "a", "a.b", "a.b", "a.b[0]", "a.b[1]", "a.b", "a", ""]
        );
    }

    #[test]
    fn test_error_does_not_advance() {
        let mut reader = JsonReader::new("[1, x]");
        reader.read().unwrap();
        reader.read().unwrap();
        let first = reader.read().unwrap_err();
        let second = reader.read().unwrap_err();
        assert_eq!(first.to_string(), second.to_string());
        assert_eq!(
            first.to_string(),
            "Unexpected character encountered while parsing value: x. Path '[0]', line 1, position 5."
        );
    }

    #[test]
    fn test_line_tracking() {
        let mut reader = JsonReader::new("{\n  \"a\": tru\n}");
        reader.read().unwrap();
        reader.read().unwrap();
        let err = reader.read().unwrap_err();
        let location = err.location().unwrap();
        assert_eq!(location.line, Some(2));
        assert_eq!(location.path, "a");
    }

    #[test]
    fn test_additional_content() {
        let mut reader = JsonReader::new("1 2");
        assert!(reader.read().unwrap());
        let err = reader.read().unwrap_err();
        assert!(err.message().starts_with("Additional text encountered"));
    }

    #[test]
    fn test_max_depth() {
        let mut reader = JsonReader::new("[[[1]]]").with_max_depth(Some(2));
        reader.read().unwrap();
        reader.read().unwrap();
        let err = reader.read().unwrap_err();
        assert!(matches!(err, Error::MaxDepth { .. }));
        assert_eq!(reader.depth(), 3);
        reader.skip_to_depth(2).unwrap();
        assert_eq!(reader.token(), Some(&Token::EndArray));
        assert!(reader.read().unwrap());
        assert!(reader.read().unwrap());
        assert_eq!(reader.depth(), 0);
        assert!(!reader.read().unwrap());
    }

    #[test]
    fn test_skip_value() {
        let mut reader = JsonReader::new(r#"{"a": {"x": [1, {"y": 2}]}, "b": 3}"#);
        reader.read().unwrap();
        reader.read().unwrap();
        reader.skip().unwrap();
        assert_eq!(reader.depth(), 1);
        reader.read().unwrap();
        assert_eq!(reader.token(), Some(&Token::PropertyName("b".to_string())));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut reader = JsonReader::new(r#"{"$id": "1"}"#);
        reader.read().unwrap();
        let peeked = reader.peek().unwrap();
        assert_eq!(peeked, Some(Token::PropertyName("$id".to_string())));
        assert_eq!(reader.token(), Some(&Token::StartObject));
        reader.read().unwrap();
        assert_eq!(reader.token(), Some(&Token::PropertyName("$id".to_string())));
    }

    #[test]
    fn test_read_value_tree() {
        let mut reader = JsonReader::new(r#"[{"a": [true, null]}, 5]"#);
        reader.read().unwrap();
        reader.read().unwrap();
        let tree = reader.read_value_tree().unwrap();
        assert_eq!(tree.to_string(), r#"{"a":[true,null]}"#);
        assert_eq!(reader.depth(), 1);
        reader.read().unwrap();
        assert_eq!(reader.token(), Some(&Token::Value(JsonValue::from(5))));
    }

    #[test]
    fn test_unexpected_end() {
        let mut reader = JsonReader::new("[1,");
        reader.read().unwrap();
        reader.read().unwrap();
        let err = reader.read().unwrap_err();
        assert_eq!(err.message(), "Unexpected end when reading JSON.");
    }
}
