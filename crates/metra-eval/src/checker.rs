//! Static unit checking. Walks a parsed AST and evaluates every unit
//! expression before anything runs.
//!
//! Entry point: [`UnitChecker::check`].
//!
//! Error codes emitted:
//! - E200: unknown unit
//! - E201: bare number in a unit expression
//! - E202: non-integer exponent
//! - E203: non-literal exponent

use metra_types::ast::*;
use metra_types::{Diagnostics, Reporter, SourceFile};

use crate::unit_eval::evaluate_unit;
use crate::units::UnitRegistry;

pub struct UnitChecker<'a> {
    registry: &'a UnitRegistry,
    reporter: Reporter<'a>,
    /// Unit expressions visited so far.
    checked: usize,
}

impl<'a> UnitChecker<'a> {
    pub fn new(registry: &'a UnitRegistry, source: &'a SourceFile) -> Self {
        Self {
            registry,
            reporter: Reporter::new(source),
            checked: 0,
        }
    }

    /// Check a complete program and return what was found.
    pub fn check(mut self, program: &Program) -> Diagnostics {
        for stmt in &program.statements {
            self.check_stmt(stmt);
        }
        tracing::debug!(
            units = self.checked,
            errors = self.reporter.diagnostics().total_errors,
            "unit check finished"
        );
        self.reporter.finish()
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Assign { value, .. } => self.check_expr(value),
            StmtKind::Expr(expr) => self.check_expr(expr),
            StmtKind::Block(body) => {
                for inner in body {
                    self.check_stmt(inner);
                }
            }
        }
    }

    fn check_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Binary { left, right, .. } => {
                self.check_expr(left);
                self.check_expr(right);
            }
            ExprKind::Unary { operand, .. } => self.check_expr(operand),
            ExprKind::Paren(inner) => self.check_expr(inner),
            ExprKind::UnitCast { value, unit } => {
                self.check_expr(value);
                self.checked += 1;
                evaluate_unit(unit, self.registry, &mut self.reporter);
            }
            ExprKind::IntegerLit(_)
            | ExprKind::RealLit(_)
            | ExprKind::StringLit(_)
            | ExprKind::CharLit(_)
            | ExprKind::BoolLit(_)
            | ExprKind::NoneLit
            | ExprKind::Identifier(_) => {}
        }
    }
}
