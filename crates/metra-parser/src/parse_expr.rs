//! Expression parsing with operator precedence.
//!
//! Precedence (lowest → highest):
//! 5. `==`, `!=`
//! 4. `+`, `-`
//! 3. `*`, `/`
//! 2. unary `-`
//! 1. `^` (right-associative, binds tighter than unary minus on its left)
//! 0. postfix cast `expr[unit]`, literals with a juxtaposed unit `5 cm`

use metra_lexer::token::TokenKind;
use metra_types::ast::*;
use metra_types::ErrorCode;

use crate::parser::{Parser, MAX_NESTING};

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry point
    // ══════════════════════════════════════════════════════════════════════════

    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            let span = self.current_span();
            self.error_at(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("expression nests deeper than {MAX_NESTING} levels"),
                span,
            );
            self.depth -= 1;
            return None;
        }
        let result = self.parse_equality();
        self.depth -= 1;
        result
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence chain
    // ══════════════════════════════════════════════════════════════════════════

    fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
        let span = left.span.merge(right.span);
        Expr::new(
            ExprKind::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            span,
        )
    }

    /// `Equality = Additive { ("==" | "!=") Additive }`
    fn parse_equality(&mut self) -> Option<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::BangEq => BinOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Self::binary(left, op, right);
        }
        Some(left)
    }

    /// `Additive = Multiplicative { ("+" | "-") Multiplicative }`
    fn parse_additive(&mut self) -> Option<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Self::binary(left, op, right);
        }
        Some(left)
    }

    /// `Multiplicative = Unary { ("*" | "/") Unary }`
    fn parse_multiplicative(&mut self) -> Option<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Self::binary(left, op, right);
        }
        Some(left)
    }

    /// `Unary = "-" Unary | Power`
    fn parse_unary(&mut self) -> Option<Expr> {
        if self.check(&TokenKind::Minus) {
            let start = self.advance().span;
            let operand = self.parse_unary()?;
            let span = start.merge(operand.span);
            return Some(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.parse_power()
    }

    /// `Power = Postfix [ "^" Unary ]`
    fn parse_power(&mut self) -> Option<Expr> {
        let base = self.parse_postfix()?;
        if self.eat(&TokenKind::Caret) {
            let exponent = self.parse_unary()?;
            return Some(Self::binary(base, BinOp::Pow, exponent));
        }
        Some(base)
    }

    /// `Postfix = Primary { "[" UnitExpr "]" }`
    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;
        while self.eat(&TokenKind::LBracket) {
            let unit = self.parse_unit_expr()?;
            self.expect(&TokenKind::RBracket)?;
            let span = expr.span.merge(self.previous_span());
            expr = Expr::new(
                ExprKind::UnitCast {
                    value: Box::new(expr),
                    unit,
                },
                span,
            );
        }
        Some(expr)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary expressions
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_primary(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let kind = match self.peek_kind().clone() {
            TokenKind::IntegerLit(n) => {
                self.advance();
                return self.parse_unit_suffix(Expr::new(ExprKind::IntegerLit(n), start));
            }
            TokenKind::RealLit(r) => {
                self.advance();
                return self.parse_unit_suffix(Expr::new(ExprKind::RealLit(r), start));
            }
            TokenKind::StringLit(s) => ExprKind::StringLit(s),
            TokenKind::CharLit(c) => ExprKind::CharLit(c),
            TokenKind::True => ExprKind::BoolLit(true),
            TokenKind::False => ExprKind::BoolLit(false),
            TokenKind::None => ExprKind::NoneLit,
            TokenKind::Identifier(name) => ExprKind::Identifier(name),
            TokenKind::LParen => {
                self.advance();
                self.skip_newlines();
                let inner = self.parse_expression()?;
                self.skip_newlines();
                self.expect(&TokenKind::RParen)?;
                let span = start.merge(self.previous_span());
                return Some(Expr::new(ExprKind::Paren(Box::new(inner)), span));
            }
            other => {
                self.error_at_current(format!("expected expression, got '{other}'"));
                return None;
            }
        };
        self.advance();
        Some(Expr::new(kind, start))
    }

    /// A number directly followed by a unit factor: `5 cm`, `3 m^2`,
    /// `2 (m*m)`.
    fn parse_unit_suffix(&mut self, literal: Expr) -> Option<Expr> {
        if !matches!(
            self.peek_kind(),
            TokenKind::Identifier(_) | TokenKind::LParen
        ) {
            return Some(literal);
        }
        let unit = self.parse_unit_factor()?;
        let span = literal.span.merge(unit.span);
        Some(Expr::new(
            ExprKind::UnitCast {
                value: Box::new(literal),
                unit,
            },
            span,
        ))
    }
}
