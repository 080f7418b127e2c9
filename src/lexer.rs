use std::fmt;

use crate::token::{Span, Token, TokenKind};

/// Classifies a lexer error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// Quoted string hit a raw newline or end of input.
    UnterminatedString,
    /// `[[ ... ]]` string never closed.
    UnterminatedLongString,
    /// `--[[ ... ]]` comment never closed.
    UnterminatedLongComment,
    /// Back-quoted string or one of its `${` spans never closed.
    UnterminatedTemplate,
    /// Numeral with a missing part or trailing garbage (`0b`, `1e`, `0b102`).
    MalformedNumber(String),
    /// Binary or octal numeral that does not fit a 64-bit integer.
    InvalidNumeral(String),
    /// Byte that cannot start any token.
    UnexpectedCharacter(char),
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedString => write!(f, "unterminated string"),
            Self::UnterminatedLongString => {
                write!(f, "unterminated multiline string")
            }
            Self::UnterminatedLongComment => {
                write!(f, "unterminated multiline comment")
            }
            Self::UnterminatedTemplate => {
                write!(f, "unterminated template string")
            }
            Self::MalformedNumber(text) => write!(f, "malformed number: {text}"),
            Self::InvalidNumeral(text) => write!(f, "invalid numeric literal: {text}"),
            Self::UnexpectedCharacter('~') => {
                write!(f, "unexpected character: ~ (did you mean '~='?)")
            }
            Self::UnexpectedCharacter('!') => {
                write!(f, "unexpected character: ! (did you mean '!='?)")
            }
            Self::UnexpectedCharacter(ch) => {
                write!(f, "unexpected character: {ch}")
            }
        }
    }
}

/// Error produced during lexing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", span.line, span.column)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

/// Tokenize tokimun source into a sequence of tokens ending in `Eof`.
///
/// Whitespace and comments produce no tokens. String-like tokens keep
/// their delimiters and raw, undecoded content.
///
/// # Errors
///
/// Returns `LexError` on unterminated strings, template strings or
/// multiline constructs, malformed numerals, and unknown characters.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).tokenize()
}

/// Rewrite a binary (`0b`) or octal (`0o`) numeral as decimal digits.
///
/// Every other numeral, hexadecimal included, is returned unchanged
/// since Lua reads it natively.
///
/// # Errors
///
/// Returns `LexErrorKind::InvalidNumeral` when the digits are not valid
/// in the numeral's base or the value overflows an `i64`.
pub fn convert_number(text: &str) -> Result<String, LexErrorKind> {
    let radix = match text.as_bytes() {
        [b'0', b'b' | b'B', ..] => 2,
        [b'0', b'o' | b'O', ..] => 8,
        _ => return Ok(text.to_string()),
    };
    let digits = &text[2..];
    if digits.starts_with(['+', '-']) {
        return Err(LexErrorKind::InvalidNumeral(text.to_string()));
    }
    i64::from_str_radix(digits, radix)
        .map(|n| n.to_string())
        .map_err(|_| LexErrorKind::InvalidNumeral(text.to_string()))
}

struct Lexer<'a> {
    input: &'a [u8],
    source: &'a str,
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        let bytes = input.as_bytes();
        let start = if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
            3
        } else {
            0
        };
        Self {
            input: bytes,
            source: input,
            pos: start,
            line: 1,
            col: 1,
        }
    }

    fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek() {
            match ch {
                b' ' | b'\t' | b'\r' | b'\n' => self.advance(),
                b'-' if self.peek_at(1) == Some(b'-') => self.skip_comment()?,
                b'[' => tokens.push(self.read_bracket()?),
                b'"' | b'\'' => tokens.push(self.read_quoted_string(ch)?),
                b'`' => tokens.push(self.read_template_string()?),
                b'0'..=b'9' => tokens.push(self.read_number()?),
                b'.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                    tokens.push(self.read_number()?);
                }
                c if c.is_ascii_alphabetic() || c == b'_' => {
                    tokens.push(self.read_identifier());
                }
                _ => tokens.push(self.read_operator()?),
            }
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            text: String::new(),
            span: self.span(),
        });
        Ok(tokens)
    }

    const fn span(&self) -> Span {
        Span {
            line: self.line,
            column: self.col,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        if self.pos < self.input.len() {
            if self.input[self.pos] == b'\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
            self.pos += 1;
        }
    }

    fn advance_by(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn text_from(&self, start: usize) -> String {
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    /// Level (count of `=`) of a long-bracket opener `[=*[` at the
    /// cursor plus `offset`, or `None` if the bytes there do not form one.
    fn long_bracket_level(&self, offset: usize) -> Option<usize> {
        if self.peek_at(offset) != Some(b'[') {
            return None;
        }
        let mut level = 0;
        while self.peek_at(offset + 1 + level) == Some(b'=') {
            level += 1;
        }
        (self.peek_at(offset + 1 + level) == Some(b'[')).then_some(level)
    }

    fn at_long_bracket_close(&self, level: usize) -> bool {
        self.peek() == Some(b']')
            && (1..=level).all(|i| self.peek_at(i) == Some(b'='))
            && self.peek_at(level + 1) == Some(b']')
    }

    /// Consume a long-bracket construct whose opener is at the cursor.
    /// Returns `false` if input ends before the matching close.
    fn skip_long_bracket(&mut self, level: usize) -> bool {
        self.advance_by(level + 2);
        while self.peek().is_some() {
            if self.at_long_bracket_close(level) {
                self.advance_by(level + 2);
                return true;
            }
            self.advance();
        }
        false
    }

    fn skip_comment(&mut self) -> Result<(), LexError> {
        let span = self.span();
        self.advance_by(2); // skip --

        if let Some(level) = self.long_bracket_level(0) {
            if !self.skip_long_bracket(level) {
                return Err(LexError {
                    kind: LexErrorKind::UnterminatedLongComment,
                    span,
                });
            }
            return Ok(());
        }

        // Single line comment, including a bracket run that is not a
        // valid long-bracket opener.
        while self.peek().is_some_and(|c| c != b'\n') {
            self.advance();
        }
        Ok(())
    }

    fn read_bracket(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        let span = self.span();

        let Some(level) = self.long_bracket_level(0) else {
            self.advance();
            return Ok(Token {
                kind: TokenKind::LBracket,
                text: "[".to_string(),
                span,
            });
        };

        if !self.skip_long_bracket(level) {
            return Err(LexError {
                kind: LexErrorKind::UnterminatedLongString,
                span,
            });
        }

        Ok(Token {
            kind: TokenKind::String,
            text: self.text_from(start),
            span,
        })
    }

    fn read_quoted_string(&mut self, quote: u8) -> Result<Token, LexError> {
        let start = self.pos;
        let span = self.span();
        self.advance(); // skip opening quote

        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    return Err(LexError {
                        kind: LexErrorKind::UnterminatedString,
                        span,
                    });
                }
                Some(b'\\') => {
                    // Escapes stay raw; only make sure the escaped byte
                    // cannot close the string.
                    self.advance();
                    self.advance();
                }
                Some(c) if c == quote => {
                    self.advance();
                    break;
                }
                Some(_) => self.advance(),
            }
        }

        Ok(Token {
            kind: TokenKind::String,
            text: self.text_from(start),
            span,
        })
    }

    fn read_template_string(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        let span = self.span();
        let unterminated = LexError {
            kind: LexErrorKind::UnterminatedTemplate,
            span,
        };
        self.advance(); // skip opening backtick

        loop {
            match self.peek() {
                None => return Err(unterminated),
                Some(b'`') => {
                    self.advance();
                    break;
                }
                Some(b'\\') => {
                    self.advance();
                    self.advance();
                }
                Some(b'$') if self.peek_at(1) == Some(b'{') => {
                    self.advance_by(2);
                    let mut depth = 1usize;
                    while depth > 0 {
                        match self.peek() {
                            None => return Err(unterminated),
                            Some(b'{') => depth += 1,
                            Some(b'}') => depth -= 1,
                            Some(_) => {}
                        }
                        self.advance();
                    }
                }
                Some(_) => self.advance(),
            }
        }

        Ok(Token {
            kind: TokenKind::TemplateString,
            text: self.text_from(start),
            span,
        })
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        let span = self.span();

        if self.peek() == Some(b'0') {
            let radix = match self.peek_at(1) {
                Some(b'x' | b'X') => Some(16),
                Some(b'b' | b'B') => Some(2),
                Some(b'o' | b'O') => Some(8),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance_by(2);
                let digits_start = self.pos;
                while self.peek().is_some_and(|c| char::from(c).is_digit(radix)) {
                    self.advance();
                }
                let complete = self.pos > digits_start;
                return self.finish_number(start, span, complete);
            }
        }

        let leading_dot = self.eat(b'.');
        self.skip_digits();
        if !leading_dot
            && self.peek() == Some(b'.')
            && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())
        {
            self.advance();
            self.skip_digits();
        }

        let mut complete = true;
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.advance();
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.advance();
            }
            let digits_start = self.pos;
            self.skip_digits();
            complete = self.pos > digits_start;
        }

        self.finish_number(start, span, complete)
    }

    fn skip_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn finish_number(
        &mut self,
        start: usize,
        span: Span,
        complete: bool,
    ) -> Result<Token, LexError> {
        let mut valid = complete;
        // A numeral running straight into a name is one malformed literal.
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            valid = false;
            self.advance();
        }

        let text = self.text_from(start);
        if !valid {
            return Err(LexError {
                kind: LexErrorKind::MalformedNumber(text),
                span,
            });
        }

        Ok(Token {
            kind: TokenKind::Number,
            text,
            span,
        })
    }

    fn read_identifier(&mut self) -> Token {
        let start = self.pos;
        let span = self.span();
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.advance();
        }

        let text = self.text_from(start);
        let kind = TokenKind::keyword(&text).unwrap_or(TokenKind::Identifier);
        Token { kind, text, span }
    }

    fn read_operator(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        let span = self.span();
        let ch = self.input[self.pos];
        self.advance();

        let kind = match ch {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b']' => TokenKind::RBracket,
            b';' => TokenKind::Semicolon,
            b',' => TokenKind::Comma,
            b'#' => TokenKind::Hash,
            b'^' => TokenKind::Caret,
            b'+' => self.with_assign(TokenKind::PlusAssign, TokenKind::Plus),
            b'-' => self.with_assign(TokenKind::MinusAssign, TokenKind::Minus),
            b'*' => self.with_assign(TokenKind::StarAssign, TokenKind::Star),
            b'/' => self.with_assign(TokenKind::SlashAssign, TokenKind::Slash),
            b'%' => self.with_assign(TokenKind::PercentAssign, TokenKind::Percent),
            b'=' => self.with_assign(TokenKind::Eq, TokenKind::Assign),
            b'<' => self.with_assign(TokenKind::Le, TokenKind::Lt),
            b'>' => self.with_assign(TokenKind::Ge, TokenKind::Gt),
            b'!' | b'~' if self.eat(b'=') => TokenKind::NotEq,
            b':' if self.eat(b':') => TokenKind::DoubleColon,
            b':' => TokenKind::Colon,
            b'.' if self.eat(b'.') => {
                if self.eat(b'.') {
                    TokenKind::DotDotDot
                } else if self.eat(b'=') {
                    TokenKind::DotDotAssign
                } else {
                    TokenKind::DotDot
                }
            }
            b'.' => TokenKind::Dot,
            b'?' if self.eat(b'.') => TokenKind::QuestionDot,
            b'?' if self.eat(b'?') => TokenKind::DoubleQuestion,
            _ => {
                let found = self
                    .source
                    .get(start..)
                    .and_then(|rest| rest.chars().next())
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                return Err(LexError {
                    kind: LexErrorKind::UnexpectedCharacter(found),
                    span,
                });
            }
        };

        Ok(Token {
            kind,
            text: self.text_from(start),
            span,
        })
    }

    fn with_assign(&mut self, compound: TokenKind, plain: TokenKind) -> TokenKind {
        if self.eat(b'=') { compound } else { plain }
    }
}
