//! AST node types for Metra scripts.
//!
//! Every node carries a [`Span`] for diagnostics. Value expressions and
//! unit expressions are separate trees: a unit expression only ever appears
//! as the unit side of an [`ExprKind::UnitCast`].

use crate::Span;
use std::fmt;

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

/// A whole script: newline-separated statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `name = value`: declares `name` in the current scope on first use.
    Assign { target: Ident, value: Expr },
    /// A bare expression; its rendered value is displayed.
    Expr(Expr),
    /// `{ ... }`: statements run in a fresh child scope.
    Block(Vec<Stmt>),
}

// ══════════════════════════════════════════════════════════════════════════════
// Value expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Strip any grouping parentheses.
    pub fn peel_parens(&self) -> &Expr {
        let mut expr = self;
        while let ExprKind::Paren(inner) = &expr.kind {
            expr = inner;
        }
        expr
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    IntegerLit(i64),
    RealLit(f64),
    StringLit(String),
    CharLit(char),
    BoolLit(bool),
    /// `none`
    NoneLit,

    Identifier(String),

    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    /// `value[unit]`, or a number with a juxtaposed unit: `5 cm`.
    UnitCast {
        value: Box<Expr>,
        unit: UnitExpr,
    },

    /// `( expr )`
    Paren(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Eq,
    NotEq,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Pow => "^",
            Self::Eq => "==",
            Self::NotEq => "!=",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

// ══════════════════════════════════════════════════════════════════════════════
// Unit expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct UnitExpr {
    pub kind: UnitExprKind,
    pub span: Span,
}

impl UnitExpr {
    pub fn new(kind: UnitExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnitExprKind {
    /// A unit symbol: `cm`, `ft`.
    Symbol(String),
    /// A numeric literal. Only `1` names a unit (dimensionless); other
    /// numbers are only meaningful as the right side of `^`.
    Number(UnitNumber),
    Binary {
        left: Box<UnitExpr>,
        op: UnitOp,
        right: Box<UnitExpr>,
    },
    /// `( unit )`
    Group(Box<UnitExpr>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnitNumber {
    Integer(i64),
    Real(f64),
}

impl fmt::Display for UnitNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Real(r) => write!(f, "{r}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOp {
    Mul,
    Div,
    Pow,
}

impl fmt::Display for UnitOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mul => f.write_str("*"),
            Self::Div => f.write_str("/"),
            Self::Pow => f.write_str("^"),
        }
    }
}

/// Renders the unit back to source form; used as the display label.
impl fmt::Display for UnitExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            UnitExprKind::Symbol(s) => f.write_str(s),
            UnitExprKind::Number(n) => write!(f, "{n}"),
            UnitExprKind::Binary { left, op, right } => write!(f, "{left}{op}{right}"),
            UnitExprKind::Group(inner) => write!(f, "({inner})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(kind: UnitExprKind) -> UnitExpr {
        UnitExpr::new(kind, Span::point(1, 1))
    }

    fn sym(s: &str) -> UnitExpr {
        unit(UnitExprKind::Symbol(s.to_string()))
    }

    #[test]
    fn unit_expr_renders_source_form() {
        let squared = unit(UnitExprKind::Binary {
            left: Box::new(sym("m")),
            op: UnitOp::Pow,
            right: Box::new(unit(UnitExprKind::Number(UnitNumber::Integer(2)))),
        });
        assert_eq!(squared.to_string(), "m^2");

        let per = unit(UnitExprKind::Binary {
            left: Box::new(unit(UnitExprKind::Number(UnitNumber::Integer(1)))),
            op: UnitOp::Div,
            right: Box::new(unit(UnitExprKind::Group(Box::new(squared)))),
        });
        assert_eq!(per.to_string(), "1/(m^2)");
    }

    #[test]
    fn peel_parens_strips_nesting() {
        let inner = Expr::new(ExprKind::Identifier("x".into()), Span::point(1, 3));
        let wrapped = Expr::new(
            ExprKind::Paren(Box::new(Expr::new(
                ExprKind::Paren(Box::new(inner.clone())),
                Span::point(1, 2),
            ))),
            Span::point(1, 1),
        );
        assert_eq!(wrapped.peel_parens(), &inner);
    }
}
