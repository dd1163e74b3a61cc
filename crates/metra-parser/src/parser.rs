//! Core parser infrastructure: token cursor, error reporting, recovery.

use metra_lexer::token::{Token, TokenKind};
use metra_types::ast::{Ident, Program};
use metra_types::{Diagnostics, ErrorCode, Reporter, SourceFile, Span};

/// Maximum nesting of parenthesised expressions and blocks.
pub(crate) const MAX_NESTING: u32 = 64;

/// Recursive-descent parser over a lexed token stream.
///
/// Errors are collected; after an error the parser resynchronises at the
/// next newline so one pass can report several problems.
pub struct Parser<'src> {
    tokens: Vec<Token>,
    pos: usize,
    reporter: Reporter<'src>,
    /// Current expression / block nesting depth.
    pub(crate) depth: u32,
}

pub struct ParseResult {
    pub program: Option<Program>,
    pub errors: Diagnostics,
}

impl<'src> Parser<'src> {
    pub fn new(mut tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let span = tokens.last().map_or(Span::point(1, 1), |t| t.span);
            tokens.push(Token::new(TokenKind::Eof, span));
        }
        Self {
            tokens,
            pos: 0,
            reporter: Reporter::new(source_file),
            depth: 0,
        }
    }

    // ── Token cursor ──────────────────────────────────────────────────────────

    pub(crate) fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn previous_span(&self) -> Span {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(token) => token.span,
            None => Span::point(1, 1),
        }
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    // ── Expect helpers ────────────────────────────────────────────────────────

    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Token> {
        if self.check(expected) {
            Some(self.advance())
        } else {
            self.error_at_current(format!(
                "expected '{}', got '{}'",
                expected,
                self.peek_kind()
            ));
            None
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> Option<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Some(Ident::new(name, span))
            }
            other => {
                self.error_at_current(format!("expected identifier, got '{other}'"));
                None
            }
        }
    }

    /// A statement must end at a newline, a closing brace or end of file.
    pub(crate) fn expect_statement_end(&mut self) -> bool {
        match self.peek_kind() {
            TokenKind::Newline => {
                self.skip_newlines();
                true
            }
            TokenKind::Eof | TokenKind::RBrace => true,
            other => {
                let message = format!("expected end of statement, got '{other}'");
                self.error_at_current(message);
                false
            }
        }
    }

    // ── Error reporting ───────────────────────────────────────────────────────

    pub(crate) fn error_at_current(&mut self, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(ErrorCode::UNEXPECTED_TOKEN, message, span);
    }

    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        self.reporter.error(code, message, span);
    }

    pub(crate) fn too_many_errors(&self) -> bool {
        self.reporter.at_error_limit()
    }

    /// Skip to the start of the next statement.
    pub(crate) fn synchronize(&mut self) {
        while !self.at_end() {
            match self.peek_kind() {
                TokenKind::Newline => {
                    self.skip_newlines();
                    return;
                }
                TokenKind::RBrace => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the token stream into a [`Program`].
    ///
    /// `program` is `None` only when nothing could be salvaged; callers
    /// should check `errors` either way.
    pub fn parse(mut self) -> ParseResult {
        self.skip_newlines();
        let start = self.current_span();
        let statements = self.parse_statements_until(&TokenKind::Eof);
        let span = start.merge(self.previous_span());
        let program = if statements.is_empty() && self.reporter.has_errors() {
            None
        } else {
            Some(Program { statements, span })
        };
        ParseResult {
            program,
            errors: self.reporter.finish(),
        }
    }
}
