//! Core statement and expression interpreter.
//!
//! Every expression is evaluated in a single pass that produces both its
//! plain [`Value`] and, where possible, its reduction to SI as a
//! [`Quantity`]. Assignment uses the pair to decide whether the target's
//! unit binding is replaced from a unit-carrying result or rescaled from a
//! plain number.

use metra_types::ast::*;
use metra_types::{Diagnostics, ErrorCode, Reporter, SourceFile, Span};

use crate::config::RunConfig;
use crate::error::{EvalError, EvalResult};
use crate::heap::ObjHeap;
use crate::scope::{ScopeStack, Variable};
use crate::unit_eval::{evaluate_unit, UnitBinding, UnitEval};
use crate::units::{Dimension, UnitRegistry};
use crate::value::{Value, ValueError};

/// An expression reduced to SI base units.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub si: f64,
    pub dim: Dimension,
    /// `true` once a unit or a variable bound to a unit contributed. Plain
    /// numbers reduce to dimensionless quantities that are not unit-carrying.
    pub unit_carrying: bool,
    /// The cast the expression ends in, if any.
    pub cast: Option<UnitEval>,
}

impl Quantity {
    pub fn plain(n: f64) -> Self {
        Self {
            si: n,
            dim: Dimension::DIMENSIONLESS,
            unit_carrying: false,
            cast: None,
        }
    }

    fn derived(si: f64, dim: Dimension, unit_carrying: bool) -> Self {
        Self {
            si,
            dim,
            unit_carrying,
            cast: None,
        }
    }
}

#[derive(Debug, Clone)]
struct Evaluated {
    value: Value,
    quantity: Option<Quantity>,
}

impl Evaluated {
    fn from_value(value: Value) -> Self {
        Self {
            value,
            quantity: value.number().map(Quantity::plain),
        }
    }
}

/// One run of a Metra program. Owns every piece of per-run state.
pub struct Interpreter<'src> {
    heap: ObjHeap,
    scopes: ScopeStack,
    registry: UnitRegistry,
    reporter: Reporter<'src>,
    config: RunConfig,
    /// Statements executed so far.
    steps: u64,
    output: Vec<String>,
    dropped_lines: usize,
}

impl<'src> Interpreter<'src> {
    pub fn new(source: &'src SourceFile) -> Self {
        Self::with_config(source, RunConfig::default())
    }

    /// A fresh interpreter with the global scope already open.
    pub fn with_config(source: &'src SourceFile, config: RunConfig) -> Self {
        let mut scopes = ScopeStack::new();
        scopes.open_scope();
        Self {
            heap: ObjHeap::new(),
            scopes,
            registry: UnitRegistry::new(),
            reporter: Reporter::new(source),
            config,
            steps: 0,
            output: Vec::new(),
            dropped_lines: 0,
        }
    }

    pub fn with_registry(mut self, registry: UnitRegistry) -> Self {
        self.registry = registry;
        self
    }

    fn tick(&mut self) -> EvalResult<()> {
        self.steps += 1;
        if self.steps > self.config.step_limit {
            Err(EvalError::StepLimitExceeded(self.config.step_limit))
        } else {
            Ok(())
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════

    pub fn exec_program(&mut self, program: &Program) -> EvalResult<()> {
        for stmt in &program.statements {
            self.exec_stmt(stmt)?;
        }
        Ok(())
    }

    pub fn exec_stmt(&mut self, stmt: &Stmt) -> EvalResult<()> {
        self.tick()?;
        match &stmt.kind {
            StmtKind::Assign { target, value } => {
                self.assign(&target.name, value)?;
            }
            StmtKind::Expr(expr) => {
                let line = self.render(expr)?;
                self.emit(line);
            }
            StmtKind::Block(body) => {
                self.open_scope();
                let result = body.iter().try_for_each(|inner| self.exec_stmt(inner));
                let closed = self.close_scope();
                result?;
                closed?;
            }
        }
        Ok(())
    }

    pub fn open_scope(&mut self) {
        self.scopes.open_scope();
        tracing::debug!(depth = self.scopes.depth(), "scope opened");
    }

    /// Close the innermost scope and release what its variables held.
    pub fn close_scope(&mut self) -> EvalResult<()> {
        let Some(scope) = self.scopes.close_scope() else {
            return Ok(());
        };
        tracing::debug!(
            depth = self.scopes.depth(),
            variables = scope.len(),
            "scope closed"
        );
        for variable in scope.into_variables() {
            self.release(variable.value)?;
        }
        Ok(())
    }

    fn emit(&mut self, line: String) {
        if self.output.len() < self.config.max_output_lines {
            self.output.push(line);
        } else {
            self.dropped_lines += 1;
        }
    }

    // ── References ────────────────────────────────────────────────────────

    fn retain(&mut self, value: Value) -> EvalResult<()> {
        if let Value::Pointer(p) = value {
            self.heap.add_ref(p, 1)?;
        }
        Ok(())
    }

    fn release(&mut self, value: Value) -> EvalResult<()> {
        if let Value::Pointer(p) = value {
            self.heap.release(p, 1)?;
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Assignment
    // ══════════════════════════════════════════════════════════════════════

    /// Execute `name = expr` in the current scope and return the value now
    /// held by `name`.
    pub fn assign(&mut self, name: &str, expr: &Expr) -> EvalResult<Value> {
        let evaluated = self.eval(expr)?;
        // `None` when `name` is new to this scope.
        let previous = self
            .scopes
            .current_scope()?
            .get(name)
            .map(|variable| variable.unit.clone());

        let (value, unit) = match evaluated.quantity {
            Some(quantity) if quantity.unit_carrying => {
                let binding = self.canonicalize(name, quantity, previous.flatten(), expr.span);
                (Value::Real(binding.display_value()), Some(binding))
            }
            quantity => {
                let value = evaluated.value;
                let unit = match (previous.flatten(), value.number()) {
                    (Some(mut binding), Some(n)) => {
                        binding.si_value = n * binding.preferred.scale;
                        Some(binding)
                    }
                    (Some(_), None) => None,
                    // Unbound: a plain number starts a dimensionless binding.
                    (None, _) => quantity.map(|q| {
                        UnitBinding::new(q.si, Dimension::DIMENSIONLESS, UnitEval::dimensionless())
                    }),
                };
                (value, unit)
            }
        };

        tracing::debug!(
            variable = name,
            value = %value,
            si = unit.as_ref().map(|b| b.si_value),
            unit = unit.as_ref().and_then(|b| b.label()),
            "assigned"
        );
        self.store(name, value, unit)?;
        Ok(value)
    }

    /// Build the binding for a unit-carrying result.
    fn canonicalize(
        &mut self,
        name: &str,
        quantity: Quantity,
        previous: Option<UnitBinding>,
        span: Span,
    ) -> UnitBinding {
        let mut dim = quantity.dim;
        let mut preferred = match (quantity.cast, &previous) {
            (Some(cast), _) => cast,
            (None, Some(prev)) => prev.preferred.clone(),
            (None, None) => UnitEval::si_base(quantity.dim),
        };
        if let Some(prev) = previous.filter(|prev| prev.dim != quantity.dim) {
            tracing::debug!(
                variable = name,
                from = %prev.dim,
                to = %quantity.dim,
                "dimension downgrade"
            );
            self.reporter.warning(
                ErrorCode::DIMENSION_DOWNGRADE,
                format!(
                    "'{name}' changes from {} to {}; it is now dimensionless",
                    prev.dim, quantity.dim
                ),
                span,
            );
            dim = Dimension::DIMENSIONLESS;
            preferred = UnitEval::dimensionless();
        }
        UnitBinding::new(quantity.si, dim, preferred)
    }

    fn store(&mut self, name: &str, value: Value, unit: Option<UnitBinding>) -> EvalResult<()> {
        // Take the new reference first: `s = s` must not free the string.
        self.retain(value)?;
        let mut variable = Variable::new(name, value);
        variable.unit = unit;
        let replaced = self.scopes.current_scope_mut()?.declare(variable);
        if let Some(old) = replaced {
            self.release(old.value)?;
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    pub fn evaluate(&mut self, expr: &Expr) -> EvalResult<Value> {
        Ok(self.eval(expr)?.value)
    }

    /// Reduce `expr` to SI. `None` when it is not unit-reducible.
    pub fn evaluate_to_si(&mut self, expr: &Expr) -> EvalResult<Option<Quantity>> {
        Ok(self.eval(expr)?.quantity)
    }

    /// Evaluate a unit expression against this run's registry.
    pub fn evaluate_unit(&mut self, unit: &UnitExpr) -> UnitEval {
        evaluate_unit(unit, &self.registry, &mut self.reporter)
    }

    fn eval(&mut self, expr: &Expr) -> EvalResult<Evaluated> {
        match &expr.kind {
            ExprKind::IntegerLit(n) => Ok(Evaluated::from_value(Value::Integer(*n))),
            ExprKind::RealLit(r) => Ok(Evaluated::from_value(Value::Real(*r))),
            ExprKind::StringLit(s) => {
                let pointer = self.heap.allocate_str(s);
                Ok(Evaluated::from_value(Value::Pointer(pointer)))
            }
            ExprKind::CharLit(c) => Ok(Evaluated::from_value(Value::Character(*c))),
            ExprKind::BoolLit(b) => Ok(Evaluated::from_value(Value::Boolean(*b))),
            ExprKind::NoneLit => Ok(Evaluated::from_value(Value::Nothing)),
            ExprKind::Identifier(name) => self.eval_identifier(name),
            ExprKind::Paren(inner) => self.eval(inner),
            ExprKind::Unary {
                op: UnaryOp::Neg,
                operand,
            } => self.eval_negate(operand),
            ExprKind::Binary { left, op, right } => self.eval_binary(left, *op, right, expr.span),
            ExprKind::UnitCast { value, unit } => self.eval_cast(value, unit, expr.span),
        }
    }

    fn eval_identifier(&self, name: &str) -> EvalResult<Evaluated> {
        let variable = self
            .scopes
            .lookup(name)
            .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))?;
        let quantity = match &variable.unit {
            Some(binding) => Some(Quantity::derived(
                binding.si_value,
                binding.dim,
                binding.carries_unit(),
            )),
            None => variable.value.number().map(Quantity::plain),
        };
        Ok(Evaluated {
            value: variable.value,
            quantity,
        })
    }

    fn eval_negate(&mut self, operand: &Expr) -> EvalResult<Evaluated> {
        let inner = self.eval(operand)?;
        let value = match inner.value {
            Value::Integer(n) => n
                .checked_neg()
                .map_or(Value::Real(-(n as f64)), Value::Integer),
            other => Value::Real(-other.as_double()?),
        };
        let quantity = inner.quantity.map(|q| Quantity { si: -q.si, ..q });
        Ok(Evaluated { value, quantity })
    }

    fn eval_binary(
        &mut self,
        left: &Expr,
        op: BinOp,
        right: &Expr,
        span: Span,
    ) -> EvalResult<Evaluated> {
        let lhs = self.eval(left)?;
        let rhs = self.eval(right)?;

        if let (Value::Pointer(a), Value::Pointer(b)) = (lhs.value, rhs.value) {
            if op == BinOp::Add {
                let joined = format!("{}{}", self.heap.get_str(a)?, self.heap.get_str(b)?);
                let pointer = self.heap.allocate_str(&joined);
                return Ok(Evaluated::from_value(Value::Pointer(pointer)));
            }
        }

        let (a, b) = match (lhs.quantity, rhs.quantity) {
            (Some(a), Some(b)) => (a, b),
            _ => return Ok(Evaluated::from_value(arithmetic(lhs.value, op, rhs.value)?)),
        };

        if matches!(op, BinOp::Eq | BinOp::NotEq) {
            let equal = if a.unit_carrying && b.unit_carrying {
                a.dim == b.dim && approx_eq(a.si, b.si)
            } else {
                lhs.value == rhs.value
            };
            return Ok(Evaluated::from_value(Value::Boolean(equal == (op == BinOp::Eq))));
        }

        if matches!(op, BinOp::Add | BinOp::Sub) && a.unit_carrying && b.unit_carrying && a.dim != b.dim {
            let verb = if op == BinOp::Add { "add" } else { "subtract" };
            tracing::warn!(left = %a.dim, right = %b.dim, "dimension mismatch in '{op}'");
            self.reporter.warning(
                ErrorCode::DIMENSION_MISMATCH,
                format!("cannot {verb} {} and {}", a.dim, b.dim),
                span,
            );
            return Ok(Evaluated {
                value: Value::Real(f64::NAN),
                quantity: None,
            });
        }

        let quantity = reduce(&a, op, &b, right);
        let value = match &quantity {
            Some(q) if q.unit_carrying => Value::Real(q.si),
            _ => arithmetic(lhs.value, op, rhs.value)?,
        };
        Ok(Evaluated { value, quantity })
    }

    /// `value[unit]`: a bound identifier is converted from SI, anything
    /// else is taken as already expressed in `unit`.
    fn eval_cast(&mut self, value: &Expr, unit: &UnitExpr, span: Span) -> EvalResult<Evaluated> {
        let target = evaluate_unit(unit, &self.registry, &mut self.reporter);
        let inner = self.eval(value)?;
        let bound = match &value.peel_parens().kind {
            ExprKind::Identifier(name) => self
                .scopes
                .lookup(name)
                .and_then(|variable| variable.unit.clone()),
            _ => None,
        };

        let read = match (inner.value.number(), bound) {
            _ if !target.is_valid() => Value::Real(f64::NAN),
            (None, _) => Value::Real(f64::NAN),
            (Some(_), Some(binding)) => {
                if binding.dim != target.dim {
                    tracing::warn!(from = %binding.dim, to = %target.dim, "cross-dimension cast to '{unit}'");
                    self.reporter.warning(
                        ErrorCode::CAST_DIMENSION_MISMATCH,
                        format!(
                            "cannot express a {} value in '{unit}' ({})",
                            binding.dim, target.dim
                        ),
                        span,
                    );
                }
                Value::Real(target.from_si(binding.si_value, binding.dim))
            }
            (Some(_), None) => inner.value,
        };

        let quantity = if target.is_valid() {
            let si = read.number().unwrap_or(f64::NAN) * target.scale;
            Some(Quantity {
                si,
                dim: target.dim,
                unit_carrying: true,
                cast: Some(target),
            })
        } else {
            None
        };
        Ok(Evaluated {
            value: read,
            quantity,
        })
    }

    // ══════════════════════════════════════════════════════════════════════
    // Display
    // ══════════════════════════════════════════════════════════════════════

    /// Evaluate `expr` and format it for output: strings by content, bound
    /// variables and casts with their unit label.
    pub fn render(&mut self, expr: &Expr) -> EvalResult<String> {
        let evaluated = self.eval(expr)?;
        if let Value::Pointer(p) = evaluated.value {
            return Ok(self.heap.get_str(p)?.to_string());
        }
        let label = match &expr.peel_parens().kind {
            ExprKind::Identifier(name) => self
                .scopes
                .lookup(name)
                .and_then(|variable| variable.unit.as_ref())
                .and_then(|binding| binding.label())
                .map(str::to_owned),
            ExprKind::UnitCast { .. } => evaluated
                .quantity
                .and_then(|q| q.cast)
                .and_then(|cast| cast.label),
            _ => None,
        };
        Ok(match label {
            Some(label) => format!("{} {label}", evaluated.value),
            None => evaluated.value.to_string(),
        })
    }

    // ══════════════════════════════════════════════════════════════════════
    // Accessors
    // ══════════════════════════════════════════════════════════════════════

    pub fn lookup(&self, name: &str) -> Option<&Variable> {
        self.scopes.lookup(name)
    }

    pub fn scopes(&self) -> &ScopeStack {
        &self.scopes
    }

    pub fn heap(&self) -> &ObjHeap {
        &self.heap
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        self.reporter.diagnostics()
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Lines discarded after `max_output_lines` was reached.
    pub fn dropped_lines(&self) -> usize {
        self.dropped_lines
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Hand back the displayed lines and runtime diagnostics.
    pub fn finish(self) -> (Vec<String>, Diagnostics) {
        (self.output, self.reporter.finish())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// Combine two quantities. `None` when the result has no SI meaning.
fn reduce(a: &Quantity, op: BinOp, b: &Quantity, exponent: &Expr) -> Option<Quantity> {
    let carrying = a.unit_carrying || b.unit_carrying;
    match op {
        BinOp::Add | BinOp::Sub if a.dim == b.dim => {
            let si = if op == BinOp::Add { a.si + b.si } else { a.si - b.si };
            Some(Quantity::derived(si, a.dim, carrying))
        }
        BinOp::Mul => Some(Quantity::derived(a.si * b.si, a.dim + b.dim, carrying)),
        BinOp::Div => Some(Quantity::derived(a.si / b.si, a.dim - b.dim, carrying)),
        BinOp::Pow if b.dim.is_dimensionless() => match integer_literal(exponent) {
            Some(p) => {
                let p = i32::try_from(p).ok()?;
                Some(Quantity::derived(a.si.powi(p), a.dim.pow(p), carrying))
            }
            None if a.dim.is_dimensionless() => {
                Some(Quantity::derived(a.si.powf(b.si), Dimension::DIMENSIONLESS, carrying))
            }
            None => None,
        },
        _ => None,
    }
}

/// `n` or `-n` for an integer literal `n`, looking through parentheses.
fn integer_literal(expr: &Expr) -> Option<i64> {
    match &expr.peel_parens().kind {
        ExprKind::IntegerLit(n) => Some(*n),
        ExprKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } => integer_literal(operand).and_then(i64::checked_neg),
        _ => None,
    }
}

/// Plain-value arithmetic. Integers stay integral while the result fits.
fn arithmetic(left: Value, op: BinOp, right: Value) -> Result<Value, ValueError> {
    if matches!(op, BinOp::Eq | BinOp::NotEq) {
        return Ok(Value::Boolean((left == right) == (op == BinOp::Eq)));
    }
    if let (Value::Integer(a), Value::Integer(b)) = (left, right) {
        let exact = match op {
            BinOp::Add => a.checked_add(b),
            BinOp::Sub => a.checked_sub(b),
            BinOp::Mul => a.checked_mul(b),
            BinOp::Pow => u32::try_from(b).ok().and_then(|e| a.checked_pow(e)),
            _ => None,
        };
        if let Some(n) = exact {
            return Ok(Value::Integer(n));
        }
    }
    let (a, b) = (left.as_double()?, right.as_double()?);
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        BinOp::Pow => a.powf(b),
        BinOp::Eq | BinOp::NotEq => return Ok(Value::Boolean((a == b) == (op == BinOp::Eq))),
    };
    Ok(Value::Real(result))
}

fn approx_eq(a: f64, b: f64) -> bool {
    a == b || (a - b).abs() <= 1e-12 * a.abs().max(b.abs())
}
