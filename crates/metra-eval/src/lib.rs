//! Metra tree-walking interpreter.
//!
//! Executes Metra scripts directly from the AST. Numeric values may carry a
//! length dimension: every unit-qualified assignment is canonicalized to SI
//! and redisplayed in the variable's preferred unit.
//!
//! ```text
//! source → Lexer → Parser → UnitChecker → Interpreter
//! ```

mod checker;
mod config;
mod error;
mod heap;
mod interpreter;
mod runner;
mod scope;
mod unit_eval;
mod units;
mod value;

pub use checker::UnitChecker;
pub use config::RunConfig;
pub use error::{EvalError, EvalResult};
pub use heap::{HeapError, Obj, ObjHeap};
pub use interpreter::{Interpreter, Quantity};
pub use runner::{run_source, RunOutcome, VariableSnapshot};
pub use scope::{Scope, ScopeError, ScopeId, ScopeStack, Variable};
pub use unit_eval::{evaluate_unit, UnitBinding, UnitEval};
pub use units::{Dimension, Unit, UnitError, UnitRegistry};
pub use value::{Pointer, Value, ValueError, ValueKind};
