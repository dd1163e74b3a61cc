//! Parser tests: statements, precedence, unit casts and suffixes, unit
//! expressions, blocks, error recovery and determinism.

use metra_lexer::Lexer;
use metra_parser::{ParseResult, Parser};
use metra_types::ast::*;
use metra_types::{ErrorCode, SourceFile};
use pretty_assertions::assert_eq;

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn parse(source: &str) -> ParseResult {
    let sf = SourceFile::new("test.metra", source);
    let lex = Lexer::new(&sf).lex();
    Parser::new(lex.tokens, &sf).parse()
}

fn parse_ok(source: &str) -> Program {
    let result = parse(source);
    if result.errors.has_errors() {
        for e in result.errors.iter() {
            eprintln!("  ERROR: {} ({})", e.message, e.code);
        }
        panic!("unexpected parse errors (see above)");
    }
    result.program.expect("no program returned")
}

fn only_stmt(source: &str) -> StmtKind {
    let mut program = parse_ok(source);
    assert_eq!(program.statements.len(), 1, "expected one statement");
    program.statements.remove(0).kind
}

fn only_expr(source: &str) -> ExprKind {
    match only_stmt(source) {
        StmtKind::Expr(expr) => expr.kind,
        other => panic!("expected expression statement, got {other:?}"),
    }
}

fn assigned(source: &str) -> (String, ExprKind) {
    match only_stmt(source) {
        StmtKind::Assign { target, value } => (target.name, value.kind),
        other => panic!("expected assignment, got {other:?}"),
    }
}

/// Compact rendering of an expression tree for precedence checks.
fn sexpr(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::IntegerLit(n) => n.to_string(),
        ExprKind::RealLit(r) => r.to_string(),
        ExprKind::StringLit(s) => format!("{s:?}"),
        ExprKind::CharLit(c) => format!("{c:?}"),
        ExprKind::BoolLit(b) => b.to_string(),
        ExprKind::NoneLit => "none".into(),
        ExprKind::Identifier(name) => name.clone(),
        ExprKind::Binary { left, op, right } => {
            format!("({op} {} {})", sexpr(left), sexpr(right))
        }
        ExprKind::Unary { operand, .. } => format!("(neg {})", sexpr(operand)),
        ExprKind::UnitCast { value, unit } => format!("(cast {} {unit})", sexpr(value)),
        ExprKind::Paren(inner) => sexpr(inner),
    }
}

fn tree(source: &str) -> String {
    match only_stmt(source) {
        StmtKind::Expr(expr) => sexpr(&expr),
        StmtKind::Assign { value, .. } => sexpr(&value),
        other => panic!("unexpected {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Statements
// ─────────────────────────────────────────────────────────────────────

#[test]
fn empty_program() {
    assert!(parse_ok("").statements.is_empty());
    assert!(parse_ok("\n\n// nothing\n").statements.is_empty());
}

#[test]
fn assignment_of_integer() {
    let (name, value) = assigned("x = 10");
    assert_eq!(name, "x");
    assert_eq!(value, ExprKind::IntegerLit(10));
}

#[test]
fn expression_statement() {
    assert_eq!(only_expr("x"), ExprKind::Identifier("x".into()));
}

#[test]
fn several_statements_on_separate_lines() {
    let program = parse_ok("x = 5 cm\ny = x[mm]\n\ny\n");
    assert_eq!(program.statements.len(), 3);
}

#[test]
fn block_statement() {
    let program = parse_ok("a = 1\n{\n  a = 2\n  a\n}\na\n");
    assert_eq!(program.statements.len(), 3);
    match &program.statements[1].kind {
        StmtKind::Block(body) => assert_eq!(body.len(), 2),
        other => panic!("expected block, got {other:?}"),
    }
}

#[test]
fn single_line_and_nested_blocks() {
    let program = parse_ok("{ a = 1 }\n{ { b = 2 } }");
    assert_eq!(program.statements.len(), 2);
    match &program.statements[1].kind {
        StmtKind::Block(outer) => {
            assert!(matches!(&outer[0].kind, StmtKind::Block(inner) if inner.len() == 1))
        }
        other => panic!("expected block, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Expressions
// ─────────────────────────────────────────────────────────────────────

#[test]
fn arithmetic_precedence() {
    assert_eq!(tree("1 + 2 * 3"), "(+ 1 (* 2 3))");
    assert_eq!(tree("(1 + 2) * 3"), "(* (+ 1 2) 3)");
    assert_eq!(tree("8 / 2 / 2"), "(/ (/ 8 2) 2)");
    assert_eq!(tree("a - b == c"), "(== (- a b) c)");
}

#[test]
fn power_is_right_associative_and_beats_negation() {
    assert_eq!(tree("-2 ^ 2"), "(neg (^ 2 2))");
    assert_eq!(tree("2 ^ 3 ^ 2"), "(^ 2 (^ 3 2))");
    assert_eq!(tree("2 ^ -1"), "(^ 2 (neg 1))");
}

#[test]
fn literals() {
    assert_eq!(only_expr("\"hi\""), ExprKind::StringLit("hi".into()));
    assert_eq!(only_expr("'c'"), ExprKind::CharLit('c'));
    assert_eq!(only_expr("true"), ExprKind::BoolLit(true));
    assert_eq!(only_expr("none"), ExprKind::NoneLit);
    assert_eq!(only_expr("2.5"), ExprKind::RealLit(2.5));
}

// ─────────────────────────────────────────────────────────────────────
// Units
// ─────────────────────────────────────────────────────────────────────

#[test]
fn juxtaposed_unit_on_literal() {
    assert_eq!(tree("x = 5 cm"), "(cast 5 cm)");
    assert_eq!(tree("x = 3 m^2"), "(cast 3 m^2)");
    assert_eq!(tree("x = 2.5 (m*m)"), "(cast 2.5 (m*m))");
}

#[test]
fn juxtaposed_unit_binds_tighter_than_arithmetic() {
    assert_eq!(tree("5 cm + 2 mm"), "(+ (cast 5 cm) (cast 2 mm))");
    assert_eq!(tree("5 cm * 2"), "(* (cast 5 cm) 2)");
}

#[test]
fn postfix_cast() {
    assert_eq!(tree("x[m]"), "(cast x m)");
    assert_eq!(tree("(a + b)[ft]"), "(cast (+ a b) ft)");
    assert_eq!(tree("x[mm][cm]"), "(cast (cast x mm) cm)");
}

#[test]
fn compound_unit_expressions() {
    assert_eq!(tree("x[m^2/km]"), "(cast x m^2/km)");
    assert_eq!(tree("x[1/m]"), "(cast x 1/m)");
    assert_eq!(tree("x[m^-1]"), "(cast x m^-1)");
    assert_eq!(tree("x[cm^1.5]"), "(cast x cm^1.5)");
}

#[test]
fn unit_expression_structure() {
    let ExprKind::UnitCast { unit, .. } = only_expr("x[cm*cm/mm]") else {
        panic!("expected cast");
    };
    let UnitExprKind::Binary { left, op, right } = unit.kind else {
        panic!("expected binary unit");
    };
    assert_eq!(op, UnitOp::Div);
    assert_eq!(right.kind, UnitExprKind::Symbol("mm".into()));
    assert!(matches!(left.kind, UnitExprKind::Binary { op: UnitOp::Mul, .. }));
}

// ─────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────

#[test]
fn missing_operand_reports_and_recovers() {
    let result = parse("x = \ny = 2\n");
    assert_eq!(result.errors.total_errors, 1);
    let program = result.program.expect("partial program");
    assert_eq!(program.statements.len(), 1);
}

#[test]
fn multiple_errors_are_collected() {
    let result = parse("x = )\ny = ]\nz = 3\n");
    assert_eq!(result.errors.total_errors, 2);
    assert_eq!(result.program.unwrap().statements.len(), 1);
}

#[test]
fn unclosed_block() {
    let result = parse("{\n x = 1\n");
    assert_eq!(
        result.errors.first_error().map(|e| e.code),
        Some(ErrorCode::UNCLOSED_BLOCK)
    );
}

#[test]
fn unmatched_closing_brace() {
    let result = parse("x = 1\n}\ny = 2");
    assert_eq!(result.errors.total_errors, 1);
    assert_eq!(result.program.unwrap().statements.len(), 2);
}

#[test]
fn assignment_to_non_name() {
    let result = parse("x[m] = 3");
    assert_eq!(result.errors.total_errors, 1);
    assert!(result.errors.errors[0].message.contains("plain name"));
}

#[test]
fn trailing_tokens_after_statement() {
    let result = parse("x = 1 2");
    // `1 2` is not a unit suffix (2 is a number, not a unit atom start)
    assert_eq!(result.errors.total_errors, 1);
}

#[test]
fn unclosed_cast_bracket() {
    let result = parse("x[m");
    assert_eq!(result.errors.total_errors, 1);
    assert!(result.errors.errors[0].message.contains("']'"));
}

#[test]
fn error_spans_point_at_offending_token() {
    let result = parse("a = 1\nb = * 2\n");
    let err = result.errors.first_error().unwrap();
    assert_eq!(err.span.start_line, 2);
    assert_eq!(err.span.start_col, 5);
    assert_eq!(err.source_line, "b = * 2");
}

#[test]
fn parsing_is_deterministic() {
    let src = "x = 5 cm\ny = x[mm] * 2\n{\n  z = (y + 1 m)[ft]\n}\n";
    let first = parse_ok(src);
    for i in 0..100 {
        assert_eq!(first, parse_ok(src), "determinism failure at iteration {i}");
    }
}
