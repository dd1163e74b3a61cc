//! One-shot pipeline: source text in, [`RunOutcome`] out.
//!
//! ```text
//! source → Lexer → Parser → UnitChecker → Interpreter
//! ```
//!
//! Execution only starts when the earlier stages produced no errors.

use metra_lexer::Lexer;
use metra_parser::Parser;
use metra_types::{Diagnostic, Diagnostics, ErrorCode, SourceFile};
use serde::{Deserialize, Serialize};

use crate::checker::UnitChecker;
use crate::config::RunConfig;
use crate::interpreter::Interpreter;
use crate::units::UnitRegistry;
use crate::value::Value;

/// A global variable as it stood when the run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSnapshot {
    pub name: String,
    /// Display value; strings by content.
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub file: String,
    /// Whether the interpreter ran at all.
    pub executed: bool,
    pub output: Vec<String>,
    pub diagnostics: Diagnostics,
    /// Globals sorted by name.
    pub variables: Vec<VariableSnapshot>,
    /// The fatal runtime error that stopped execution, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
    pub steps: u64,
}

impl RunOutcome {
    fn not_executed(file: &str, diagnostics: Diagnostics) -> Self {
        Self {
            file: file.to_string(),
            executed: false,
            output: Vec::new(),
            diagnostics,
            variables: Vec::new(),
            fault: None,
            steps: 0,
        }
    }

    /// No error diagnostics and no fault.
    pub fn succeeded(&self) -> bool {
        !self.diagnostics.has_errors() && self.fault.is_none()
    }
}

/// Lex, parse, check and run `source` with a fresh interpreter.
pub fn run_source(name: &str, source: &str, config: &RunConfig) -> RunOutcome {
    let source_file = SourceFile::new(name, source);
    let mut diagnostics = Diagnostics::empty();

    let lexed = Lexer::new(&source_file).lex();
    diagnostics.extend(lexed.errors);
    let parsed = Parser::new(lexed.tokens, &source_file).parse();
    diagnostics.extend(parsed.errors);
    let Some(program) = parsed.program else {
        return RunOutcome::not_executed(name, diagnostics);
    };

    let registry = UnitRegistry::new();
    diagnostics.extend(UnitChecker::new(&registry, &source_file).check(&program));
    if diagnostics.has_errors() {
        tracing::debug!(
            errors = diagnostics.total_errors,
            "not executing: static errors"
        );
        return RunOutcome::not_executed(name, diagnostics);
    }

    let mut interpreter = Interpreter::with_config(&source_file, *config).with_registry(registry);
    let mut fault = None;
    for stmt in &program.statements {
        if let Err(err) = interpreter.exec_stmt(stmt) {
            tracing::debug!(error = %err, line = stmt.span.start_line, "run aborted");
            let source_line = source_file.line(stmt.span.start_line).unwrap_or("");
            fault = Some(Diagnostic::new(
                name,
                ErrorCode::RUNTIME_FAULT,
                err.to_string(),
                stmt.span,
                source_line,
            ));
            break;
        }
    }

    let variables = snapshot(&interpreter);
    let steps = interpreter.steps();
    let dropped = interpreter.dropped_lines();
    let (output, runtime) = interpreter.finish();
    if dropped > 0 {
        tracing::warn!(dropped, "output truncated");
    }
    diagnostics.extend(runtime);

    let fault = fault.map(|diagnostic| {
        let message = diagnostic.message.clone();
        diagnostics.push(diagnostic);
        message
    });

    RunOutcome {
        file: name.to_string(),
        executed: true,
        output,
        diagnostics,
        variables,
        fault,
        steps,
    }
}

fn snapshot(interpreter: &Interpreter) -> Vec<VariableSnapshot> {
    let Ok(global) = interpreter.scopes().global_scope() else {
        return Vec::new();
    };
    global
        .iter()
        .map(|variable| {
            let value = match variable.value {
                Value::Pointer(p) => interpreter
                    .heap()
                    .get_str(p)
                    .map_or_else(|_| variable.value.to_string(), |s| s.to_string()),
                other => other.to_string(),
            };
            VariableSnapshot {
                name: variable.name().to_string(),
                value,
                unit: variable
                    .unit
                    .as_ref()
                    .and_then(|binding| binding.label())
                    .map(str::to_owned),
            }
        })
        .collect()
}
