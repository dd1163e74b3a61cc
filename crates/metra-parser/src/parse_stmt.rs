//! Statement parsing: assignments, expression statements, blocks.

use metra_lexer::token::TokenKind;
use metra_types::ast::*;
use metra_types::ErrorCode;

use crate::parser::{Parser, MAX_NESTING};

impl<'src> Parser<'src> {
    /// Parse statements until `terminator` (not consumed) or end of file.
    pub(crate) fn parse_statements_until(&mut self, terminator: &TokenKind) -> Vec<Stmt> {
        let mut statements = Vec::new();
        loop {
            self.skip_newlines();
            if self.at_end() || self.check(terminator) || self.too_many_errors() {
                break;
            }
            if self.check(&TokenKind::RBrace) {
                self.error_at_current("unmatched '}'");
                self.advance();
                continue;
            }
            match self.parse_statement() {
                Some(stmt) => {
                    statements.push(stmt);
                    if !self.expect_statement_end() {
                        self.synchronize();
                    }
                }
                None => self.synchronize(),
            }
        }
        statements
    }

    /// `Statement = Block | Identifier "=" Expr | Expr`
    fn parse_statement(&mut self) -> Option<Stmt> {
        match self.peek_kind() {
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Identifier(_) if *self.look_ahead(1) == TokenKind::Eq => {
                let target = self.expect_identifier()?;
                self.advance(); // `=`
                let value = self.parse_expression()?;
                let span = target.span.merge(value.span);
                Some(Stmt::new(StmtKind::Assign { target, value }, span))
            }
            _ => {
                let expr = self.parse_expression()?;
                if self.check(&TokenKind::Eq) {
                    self.error_at_current("only a plain name can be assigned to");
                    return None;
                }
                let span = expr.span;
                Some(Stmt::new(StmtKind::Expr(expr), span))
            }
        }
    }

    /// `Block = "{" { Statement } "}"`
    fn parse_block(&mut self) -> Option<Stmt> {
        let open = self.advance().span;
        self.depth += 1;
        if self.depth > MAX_NESTING {
            self.error_at(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("blocks nest deeper than {MAX_NESTING} levels"),
                open,
            );
            self.depth -= 1;
            return None;
        }
        let body = self.parse_statements_until(&TokenKind::RBrace);
        self.depth -= 1;
        if !self.eat(&TokenKind::RBrace) {
            self.error_at(ErrorCode::UNCLOSED_BLOCK, "block is never closed", open);
            return None;
        }
        let span = open.merge(self.previous_span());
        Some(Stmt::new(StmtKind::Block(body), span))
    }
}
