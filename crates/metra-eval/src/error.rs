//! Runtime error types for the Metra interpreter.
//!
//! These are fatal: they abort the run and are never visible to scripts.
//! Recoverable problems go to [`Diagnostics`](metra_types::Diagnostics)
//! instead.

use thiserror::Error;

use crate::heap::HeapError;
use crate::scope::ScopeError;
use crate::units::UnitError;
use crate::value::ValueError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(transparent)]
    Heap(#[from] HeapError),
    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error(transparent)]
    Unit(#[from] UnitError),
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
    /// The run executed more statements than its step limit allows.
    #[error("step limit of {0} exhausted")]
    StepLimitExceeded(u64),
}

/// Result alias for interpreter operations.
pub type EvalResult<T> = Result<T, EvalError>;
