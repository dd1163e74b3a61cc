//! Unit-expression parsing.
//!
//! ```text
//! UnitExpr     = UnitFactor { ("*" | "/") UnitFactor }
//! UnitFactor   = UnitAtom [ "^" UnitExponent ]
//! UnitAtom     = Identifier | Number | "(" UnitExpr ")"
//! UnitExponent = "-" Number | UnitAtom
//! ```
//!
//! Exponents and bare numbers are accepted here and rejected by the unit
//! checker, which knows the rules for each.

use metra_lexer::token::TokenKind;
use metra_types::ast::*;

use crate::parser::Parser;

impl<'src> Parser<'src> {
    pub(crate) fn parse_unit_expr(&mut self) -> Option<UnitExpr> {
        let mut left = self.parse_unit_factor()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => UnitOp::Mul,
                TokenKind::Slash => UnitOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_unit_factor()?;
            left = Self::unit_binary(left, op, right);
        }
        Some(left)
    }

    pub(crate) fn parse_unit_factor(&mut self) -> Option<UnitExpr> {
        let base = self.parse_unit_atom()?;
        if !self.eat(&TokenKind::Caret) {
            return Some(base);
        }
        let exponent = if self.check(&TokenKind::Minus) {
            let minus = self.advance().span;
            let number = match self.peek_kind().clone() {
                TokenKind::IntegerLit(n) => UnitNumber::Integer(-n),
                TokenKind::RealLit(r) => UnitNumber::Real(-r),
                other => {
                    self.error_at_current(format!("expected a number after '-', got '{other}'"));
                    return None;
                }
            };
            let span = minus.merge(self.advance().span);
            UnitExpr::new(UnitExprKind::Number(number), span)
        } else {
            self.parse_unit_atom()?
        };
        Some(Self::unit_binary(base, UnitOp::Pow, exponent))
    }

    fn parse_unit_atom(&mut self) -> Option<UnitExpr> {
        let start = self.current_span();
        let kind = match self.peek_kind().clone() {
            TokenKind::Identifier(name) => UnitExprKind::Symbol(name),
            TokenKind::IntegerLit(n) => UnitExprKind::Number(UnitNumber::Integer(n)),
            TokenKind::RealLit(r) => UnitExprKind::Number(UnitNumber::Real(r)),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_unit_expr()?;
                self.expect(&TokenKind::RParen)?;
                let span = start.merge(self.previous_span());
                return Some(UnitExpr::new(UnitExprKind::Group(Box::new(inner)), span));
            }
            other => {
                self.error_at_current(format!("expected a unit, got '{other}'"));
                return None;
            }
        };
        self.advance();
        Some(UnitExpr::new(kind, start))
    }

    fn unit_binary(left: UnitExpr, op: UnitOp, right: UnitExpr) -> UnitExpr {
        let span = left.span.merge(right.span);
        UnitExpr::new(
            UnitExprKind::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            span,
        )
    }
}
