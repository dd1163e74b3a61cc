//! Metra lexer: converts source text to a token stream.
//!
//! - Newlines are tokens (they separate statements)
//! - `//` line comments are stripped
//! - Integer and real literals are distinct tokens, so the unit checker can
//!   tell `m^2` from `m^2.0`
//! - Errors are collected and scanning resumes at the next character

use metra_types::{Diagnostics, ErrorCode, Reporter, SourceFile, Span};

use crate::token::{Token, TokenKind};

pub struct Lexer<'src> {
    text: &'src str,
    source: &'src [u8],
    reporter: Reporter<'src>,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line (1-based).
    line: u32,
    /// Current column (1-based).
    col: u32,
}

/// Tokens plus any errors collected along the way.
pub struct LexResult {
    /// Always ends with [`TokenKind::Eof`].
    pub tokens: Vec<Token>,
    pub errors: Diagnostics,
}

impl<'src> Lexer<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            text: &source_file.source,
            source: source_file.source.as_bytes(),
            reporter: Reporter::new(source_file),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Lex the entire source file.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();
        loop {
            if self.reporter.at_error_limit() {
                break;
            }
            let token = self.scan_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            tokens.push(Token::new(TokenKind::Eof, self.current_span()));
        }

        LexResult {
            tokens,
            errors: self.reporter.finish(),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    /// Consume one whole UTF-8 scalar; counts as a single column.
    fn advance_char(&mut self) -> Option<char> {
        let ch = self.text.get(self.pos..)?.chars().next()?;
        if ch == '\n' {
            self.advance();
        } else {
            self.pos += ch.len_utf8();
            self.col += 1;
        }
        Some(ch)
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    // ─────────────────────────────────────────────────────────────
    // Scanning
    // ─────────────────────────────────────────────────────────────

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r') => {
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while self.peek().is_some_and(|c| c != b'\n') {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn scan_token(&mut self) -> Token {
        loop {
            self.skip_whitespace_and_comments();
            let start_line = self.line;
            let start_col = self.col;
            let start = self.pos;

            let Some(ch) = self.peek() else {
                return Token::new(TokenKind::Eof, self.current_span());
            };

            let simple = match ch {
                b'\n' => Some(TokenKind::Newline),
                b'+' => Some(TokenKind::Plus),
                b'-' => Some(TokenKind::Minus),
                b'*' => Some(TokenKind::Star),
                b'/' => Some(TokenKind::Slash),
                b'^' => Some(TokenKind::Caret),
                b'(' => Some(TokenKind::LParen),
                b')' => Some(TokenKind::RParen),
                b'[' => Some(TokenKind::LBracket),
                b']' => Some(TokenKind::RBracket),
                b'{' => Some(TokenKind::LBrace),
                b'}' => Some(TokenKind::RBrace),
                _ => None,
            };
            if let Some(kind) = simple {
                self.advance();
                return Token::new(kind, self.span_from(start_line, start_col));
            }

            match ch {
                b'=' => {
                    self.advance();
                    let kind = if self.peek() == Some(b'=') {
                        self.advance();
                        TokenKind::EqEq
                    } else {
                        TokenKind::Eq
                    };
                    return Token::new(kind, self.span_from(start_line, start_col));
                }
                b'!' if self.peek_at(1) == Some(b'=') => {
                    self.advance();
                    self.advance();
                    return Token::new(TokenKind::BangEq, self.span_from(start_line, start_col));
                }
                b'0'..=b'9' => return self.scan_number(start, start_line, start_col),
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                    return self.scan_identifier(start, start_line, start_col)
                }
                b'"' => return self.scan_string(start_line, start_col),
                b'\'' => return self.scan_char(start_line, start_col),
                _ => {
                    let bad = self.advance_char().unwrap_or('?');
                    let span = self.span_from(start_line, start_col);
                    self.reporter.error(
                        ErrorCode::UNEXPECTED_CHARACTER,
                        format!("unexpected character '{bad}'"),
                        span,
                    );
                    if self.reporter.at_error_limit() {
                        return Token::new(TokenKind::Eof, self.current_span());
                    }
                }
            }
        }
    }

    fn scan_number(&mut self, start: usize, start_line: u32, start_col: u32) -> Token {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        let mut is_real = false;
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_real = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let span = self.span_from(start_line, start_col);
        let text = &self.text[start..self.pos];
        if is_real {
            let value = text.parse::<f64>().unwrap_or(f64::NAN);
            return Token::new(TokenKind::RealLit(value), span);
        }
        match text.parse::<i64>() {
            Ok(value) => Token::new(TokenKind::IntegerLit(value), span),
            Err(_) => {
                self.reporter.error(
                    ErrorCode::NUMBER_OUT_OF_RANGE,
                    format!("integer literal '{text}' does not fit in 64 bits"),
                    span,
                );
                Token::new(TokenKind::IntegerLit(0), span)
            }
        }
    }

    fn scan_identifier(&mut self, start: usize, start_line: u32, start_col: u32) -> Token {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
        {
            self.advance();
        }
        let span = self.span_from(start_line, start_col);
        let text = &self.text[start..self.pos];
        let kind =
            TokenKind::from_keyword(text).unwrap_or_else(|| TokenKind::Identifier(text.to_string()));
        Token::new(kind, span)
    }

    fn scan_string(&mut self, start_line: u32, start_col: u32) -> Token {
        self.advance(); // opening quote
        let mut buf = String::new();
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    let span = self.span_from(start_line, start_col);
                    self.reporter.error(
                        ErrorCode::UNTERMINATED_LITERAL,
                        "unterminated string literal",
                        span,
                    );
                    return Token::new(TokenKind::StringLit(buf), span);
                }
                Some(b'"') => {
                    self.advance();
                    return Token::new(
                        TokenKind::StringLit(buf),
                        self.span_from(start_line, start_col),
                    );
                }
                Some(b'\\') => {
                    if let Some(escaped) = self.scan_escape(b'"') {
                        buf.push(escaped);
                    }
                }
                Some(_) => {
                    if let Some(ch) = self.advance_char() {
                        buf.push(ch);
                    }
                }
            }
        }
    }

    fn scan_char(&mut self, start_line: u32, start_col: u32) -> Token {
        self.advance(); // opening quote
        let value = match self.peek() {
            Some(b'\\') => self.scan_escape(b'\''),
            None | Some(b'\n' | b'\'') => None,
            Some(_) => self.advance_char(),
        };
        if self.peek() == Some(b'\'') {
            self.advance();
        } else {
            let span = self.span_from(start_line, start_col);
            self.reporter.error(
                ErrorCode::UNTERMINATED_LITERAL,
                "character literal must hold exactly one character",
                span,
            );
            while self.peek().is_some_and(|c| c != b'\'' && c != b'\n') {
                self.advance();
            }
            if self.peek() == Some(b'\'') {
                self.advance();
            }
        }
        Token::new(
            TokenKind::CharLit(value.unwrap_or('\0')),
            self.span_from(start_line, start_col),
        )
    }

    /// Scan `\x` and return the unescaped character. `quote` is the
    /// delimiter of the enclosing literal.
    fn scan_escape(&mut self, quote: u8) -> Option<char> {
        let start_line = self.line;
        let start_col = self.col;
        self.advance(); // the backslash
        match self.peek() {
            Some(b'n') => {
                self.advance();
                Some('\n')
            }
            Some(b't') => {
                self.advance();
                Some('\t')
            }
            Some(b'r') => {
                self.advance();
                Some('\r')
            }
            Some(b'\\') => {
                self.advance();
                Some('\\')
            }
            Some(c) if c == quote => {
                self.advance();
                Some(c as char)
            }
            None | Some(b'\n') => None,
            Some(_) => {
                let ch = self.advance_char()?;
                let span = self.span_from(start_line, start_col);
                self.reporter.error(
                    ErrorCode::INVALID_ESCAPE,
                    format!("invalid escape sequence '\\{ch}'"),
                    span,
                );
                Some(ch)
            }
        }
    }
}
