//! Lexical scopes for the Metra interpreter.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::unit_eval::UnitBinding;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("no scope has been opened")]
    NoScope,
}

/// A named slot: the current value plus its unit binding, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: String,
    pub value: Value,
    pub unit: Option<UnitBinding>,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            unit: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One level of the scope chain.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    variables: BTreeMap<String, Variable>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `variable`, returning the one it replaced.
    pub fn declare(&mut self, variable: Variable) -> Option<Variable> {
        self.variables.insert(variable.name.clone(), variable)
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    pub fn into_variables(self) -> impl Iterator<Item = Variable> {
        self.variables.into_values()
    }
}

/// Position of a scope on the stack; `ScopeId(0)` is the global scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(pub usize);

/// Stack of scopes searched from the innermost outward.
///
/// Starts empty. After the first `open_scope` the global scope stays put:
/// `close_scope` never pops it.
#[derive(Debug, Clone, Default)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_scope(&mut self) -> ScopeId {
        self.scopes.push(Scope::new());
        ScopeId(self.scopes.len() - 1)
    }

    /// Pop the innermost scope and hand it back so the caller can release
    /// what its variables hold. `None` when only the global scope is left.
    pub fn close_scope(&mut self) -> Option<Scope> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn current_id(&self) -> Result<ScopeId, ScopeError> {
        self.scopes
            .len()
            .checked_sub(1)
            .map(ScopeId)
            .ok_or(ScopeError::NoScope)
    }

    pub fn current_scope(&self) -> Result<&Scope, ScopeError> {
        self.scopes.last().ok_or(ScopeError::NoScope)
    }

    pub fn current_scope_mut(&mut self) -> Result<&mut Scope, ScopeError> {
        self.scopes.last_mut().ok_or(ScopeError::NoScope)
    }

    pub fn global_scope(&self) -> Result<&Scope, ScopeError> {
        self.scopes.first().ok_or(ScopeError::NoScope)
    }

    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0)
    }

    /// The nearest scope that owns `name`.
    pub fn resolve(&self, name: &str) -> Option<ScopeId> {
        self.scopes
            .iter()
            .rposition(|scope| scope.contains(name))
            .map(ScopeId)
    }

    pub fn lookup(&self, name: &str) -> Option<&Variable> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
    }

    /// `true` if some scope outside `id` also defines `name`.
    pub fn shadows(&self, id: ScopeId, name: &str) -> bool {
        self.scopes
            .iter()
            .take(id.0)
            .any(|scope| scope.contains(name))
    }
}
