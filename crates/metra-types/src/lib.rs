//! Shared types for the Metra pipeline.
//!
//! This crate defines the AST node types, source spans and the diagnostic
//! records shared by the lexer, parser, unit checker and interpreter.

mod diagnostic;
mod span;
pub mod ast;

pub use diagnostic::{
    Diagnostic, Diagnostics, ErrorCategory, ErrorCode, Reporter, Severity, MAX_ERRORS,
};
pub use span::{SourceFile, Span};
