//! Unit-expression evaluation and per-variable unit bindings.
//!
//! [`evaluate_unit`] reduces a parsed unit expression such as `m^2/km` to a
//! single scale-to-SI factor and a [`Dimension`]. Problems are reported to the
//! [`Reporter`] and yield the invalid sentinel (NaN scale), which propagates
//! through every enclosing operator without further diagnostics.

use metra_types::ast::{UnitExpr, UnitExprKind, UnitNumber, UnitOp};
use metra_types::{ErrorCode, Reporter};

use crate::units::{Dimension, Unit, UnitRegistry};

/// Result of evaluating a unit expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitEval {
    /// SI base units per one of this unit.
    pub scale: f64,
    pub dim: Dimension,
    /// Source rendering used when displaying values in this unit. `None` for
    /// raw SI and the dimensionless unit.
    pub label: Option<String>,
}

impl UnitEval {
    pub fn dimensionless() -> Self {
        Self::si_base(Dimension::DIMENSIONLESS)
    }

    /// Scale 1 in `dim`, unlabeled.
    pub fn si_base(dim: Dimension) -> Self {
        Self {
            scale: 1.0,
            dim,
            label: None,
        }
    }

    pub fn invalid() -> Self {
        Self {
            scale: f64::NAN,
            dim: Dimension::DIMENSIONLESS,
            label: None,
        }
    }

    pub fn from_unit(unit: &Unit) -> Self {
        Self {
            scale: unit.scale,
            dim: unit.dim,
            label: Some(unit.symbol.clone()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.scale.is_finite()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Express an SI quantity in this unit. NaN if the dimensions differ.
    pub fn from_si(&self, si: f64, dim: Dimension) -> f64 {
        if dim == self.dim {
            si / self.scale
        } else {
            f64::NAN
        }
    }
}

/// The unit state of one variable.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitBinding {
    pub dim: Dimension,
    /// Canonical value in the SI base of `dim`.
    pub si_value: f64,
    /// The unit the variable is displayed in.
    pub preferred: UnitEval,
}

impl UnitBinding {
    pub fn new(si_value: f64, dim: Dimension, preferred: UnitEval) -> Self {
        Self {
            dim,
            si_value,
            preferred,
        }
    }

    /// The SI value re-expressed in the preferred unit, or raw SI when the
    /// preferred unit cannot express it.
    pub fn display_value(&self) -> f64 {
        if self.preferred.dim == self.dim && self.preferred.scale != 0.0 {
            self.si_value / self.preferred.scale
        } else {
            self.si_value
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.preferred.label()
    }

    /// `false` for the dimensionless, unlabeled binding a plain number gets.
    pub fn carries_unit(&self) -> bool {
        !self.dim.is_dimensionless() || self.preferred.label.is_some()
    }
}

/// Evaluate `expr` against `registry`, reporting problems to `reporter`.
pub fn evaluate_unit(expr: &UnitExpr, registry: &UnitRegistry, reporter: &mut Reporter) -> UnitEval {
    let mut result = eval_node(expr, registry, reporter);
    if result.is_valid() && !(result.dim.is_dimensionless() && result.scale == 1.0) {
        result.label = Some(expr.to_string());
    }
    result
}

fn eval_node(expr: &UnitExpr, registry: &UnitRegistry, reporter: &mut Reporter) -> UnitEval {
    match &expr.kind {
        UnitExprKind::Symbol(symbol) => match registry.get(symbol) {
            Ok(unit) => UnitEval::from_unit(unit),
            Err(err) => {
                reporter.error(ErrorCode::UNKNOWN_UNIT, err.to_string(), expr.span);
                UnitEval::invalid()
            }
        },
        UnitExprKind::Number(UnitNumber::Integer(1)) => UnitEval::dimensionless(),
        UnitExprKind::Number(n) => {
            reporter.error_with_suggestion(
                ErrorCode::BARE_NUMBER_IN_UNIT,
                format!("bare number '{n}' in unit expression"),
                expr.span,
                "use `^` for exponents, e.g. `m^2`",
            );
            UnitEval::invalid()
        }
        UnitExprKind::Group(inner) => eval_node(inner, registry, reporter),
        UnitExprKind::Binary { left, op, right } => match op {
            UnitOp::Mul | UnitOp::Div => {
                let lhs = eval_node(left, registry, reporter);
                let rhs = eval_node(right, registry, reporter);
                if !lhs.is_valid() || !rhs.is_valid() {
                    return UnitEval::invalid();
                }
                let (scale, dim) = if *op == UnitOp::Mul {
                    (lhs.scale * rhs.scale, lhs.dim + rhs.dim)
                } else {
                    (lhs.scale / rhs.scale, lhs.dim - rhs.dim)
                };
                UnitEval {
                    scale,
                    dim,
                    label: None,
                }
            }
            UnitOp::Pow => {
                let base = eval_node(left, registry, reporter);
                let exponent = literal_exponent(right, reporter);
                match exponent {
                    Some(p) if base.is_valid() => UnitEval {
                        scale: base.scale.powi(p),
                        dim: base.dim.pow(p),
                        label: None,
                    },
                    _ => UnitEval::invalid(),
                }
            }
        },
    }
}

/// The exponent of `^`, which must be an integer literal. The operand is
/// never evaluated as a unit.
fn literal_exponent(expr: &UnitExpr, reporter: &mut Reporter) -> Option<i32> {
    match &expr.kind {
        UnitExprKind::Number(UnitNumber::Integer(n)) => match i32::try_from(*n) {
            Ok(p) => Some(p),
            Err(_) => {
                reporter.error(
                    ErrorCode::NON_INTEGER_EXPONENT,
                    format!("exponent {n} is out of range"),
                    expr.span,
                );
                None
            }
        },
        UnitExprKind::Number(UnitNumber::Real(r)) => {
            reporter.error(
                ErrorCode::NON_INTEGER_EXPONENT,
                format!("unit exponent must be an integer, found {r}"),
                expr.span,
            );
            None
        }
        _ => {
            reporter.error_with_suggestion(
                ErrorCode::NON_LITERAL_EXPONENT,
                format!("unit exponent must be an integer literal, found '{expr}'"),
                expr.span,
                "write the exponent as a number, e.g. `m^2`",
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metra_types::{SourceFile, Span};

    fn node(kind: UnitExprKind) -> UnitExpr {
        UnitExpr::new(kind, Span::point(1, 1))
    }

    fn sym(s: &str) -> UnitExpr {
        node(UnitExprKind::Symbol(s.into()))
    }

    fn int(n: i64) -> UnitExpr {
        node(UnitExprKind::Number(UnitNumber::Integer(n)))
    }

    fn bin(left: UnitExpr, op: UnitOp, right: UnitExpr) -> UnitExpr {
        node(UnitExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn eval(expr: &UnitExpr) -> (UnitEval, Vec<ErrorCode>) {
        let sf = SourceFile::new("t.metra", "x");
        let mut reporter = Reporter::new(&sf);
        let result = evaluate_unit(expr, &UnitRegistry::new(), &mut reporter);
        let codes = reporter.finish().iter().map(|d| d.code).collect();
        (result, codes)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12 * b.abs().max(1.0)
    }

    #[test]
    fn symbol_and_label() {
        let (cm, errors) = eval(&sym("cm"));
        assert!(errors.is_empty());
        assert_eq!(cm.scale, 0.01);
        assert_eq!(cm.dim, Dimension::LENGTH);
        assert_eq!(cm.label(), Some("cm"));
    }

    #[test]
    fn one_is_dimensionless_and_unlabeled() {
        let (one, errors) = eval(&int(1));
        assert!(errors.is_empty());
        assert_eq!(one, UnitEval::dimensionless());
    }

    #[test]
    fn product_quotient_power() {
        let (area, _) = eval(&bin(sym("cm"), UnitOp::Mul, sym("m")));
        assert!(close(area.scale, 0.01));
        assert_eq!(area.dim, Dimension::length(2));

        let (ratio, _) = eval(&bin(sym("km"), UnitOp::Div, sym("m")));
        assert!(close(ratio.scale, 1000.0));
        assert!(ratio.dim.is_dimensionless());
        assert_eq!(ratio.label(), Some("km/m"));

        let (inverse, _) = eval(&bin(sym("cm"), UnitOp::Pow, int(-2)));
        assert!(close(inverse.scale, 10_000.0));
        assert_eq!(inverse.dim, Dimension::length(-2));
    }

    #[test]
    fn real_exponent_is_reported() {
        let expr = bin(
            sym("cm"),
            UnitOp::Pow,
            node(UnitExprKind::Number(UnitNumber::Real(1.5))),
        );
        let (result, errors) = eval(&expr);
        assert!(!result.is_valid());
        assert!(result.scale.is_nan());
        assert_eq!(errors, vec![ErrorCode::NON_INTEGER_EXPONENT]);
    }

    #[test]
    fn symbolic_exponent_is_reported_once() {
        let (result, errors) = eval(&bin(sym("m"), UnitOp::Pow, sym("furlong")));
        assert!(!result.is_valid());
        assert_eq!(errors, vec![ErrorCode::NON_LITERAL_EXPONENT]);
    }

    #[test]
    fn bare_number_is_reported() {
        let (result, errors) = eval(&bin(int(2), UnitOp::Mul, sym("m")));
        assert!(!result.is_valid());
        assert_eq!(errors, vec![ErrorCode::BARE_NUMBER_IN_UNIT]);
    }

    #[test]
    fn invalid_operand_propagates_without_new_errors() {
        let expr = bin(bin(sym("s"), UnitOp::Pow, int(2)), UnitOp::Div, sym("m"));
        let (result, errors) = eval(&expr);
        assert!(!result.is_valid());
        assert_eq!(errors, vec![ErrorCode::UNKNOWN_UNIT]);
        assert!(result.label.is_none());
    }

    #[test]
    fn binding_display_value() {
        let registry = UnitRegistry::new();
        let cm = UnitEval::from_unit(registry.get("cm").unwrap());
        let binding = UnitBinding::new(0.05, Dimension::LENGTH, cm);
        assert!(close(binding.display_value(), 5.0));
        assert_eq!(binding.label(), Some("cm"));

        let raw = UnitBinding::new(3.0, Dimension::length(2), UnitEval::dimensionless());
        assert_eq!(raw.display_value(), 3.0);
    }

    #[test]
    fn from_si_rejects_other_dimensions() {
        let m = UnitEval::si_base(Dimension::LENGTH);
        assert_eq!(m.from_si(0.05, Dimension::LENGTH), 0.05);
        assert!(m.from_si(0.05, Dimension::length(2)).is_nan());
    }
}
