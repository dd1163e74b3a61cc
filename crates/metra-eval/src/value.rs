//! Runtime values.
//!
//! A [`Value`] is a small `Copy` tagged union. Scalars live inline; heap
//! objects are referenced through a [`Pointer`], which owns nothing and is
//! checked against the [`ObjHeap`](crate::ObjHeap) on every dereference.

use std::fmt;
use thiserror::Error;

/// Opaque heap id. `0` is the null pointer and never names a live object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pointer(u32);

impl Pointer {
    pub const NULL: Pointer = Pointer(0);

    /// Wrap a raw id. The heap decides whether it is live.
    pub fn from_raw(id: u32) -> Self {
        Pointer(id)
    }

    pub fn id(self) -> u32 {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ptr#{}", self.0)
    }
}

/// The tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    None,
    Integer,
    Real,
    Pointer,
    Boolean,
    Character,
}

impl ValueKind {
    /// Integer and Real share numeric accessors and compare across tags.
    pub fn is_numeric(self) -> bool {
        matches!(self, ValueKind::Integer | ValueKind::Real)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::None => "None",
            ValueKind::Integer => "Integer",
            ValueKind::Real => "Real",
            ValueKind::Pointer => "Pointer",
            ValueKind::Boolean => "Boolean",
            ValueKind::Character => "Character",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("type error: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: ValueKind,
    },
}

#[derive(Debug, Clone, Copy, Default)]
pub enum Value {
    /// The absence of a value.
    #[default]
    Nothing,
    Integer(i64),
    Real(f64),
    Pointer(Pointer),
    Boolean(bool),
    Character(char),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Nothing => ValueKind::None,
            Value::Integer(_) => ValueKind::Integer,
            Value::Real(_) => ValueKind::Real,
            Value::Pointer(_) => ValueKind::Pointer,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Character(_) => ValueKind::Character,
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Value::Nothing)
    }

    pub fn is_numeric(&self) -> bool {
        self.kind().is_numeric()
    }

    fn mismatch(&self, expected: &'static str) -> ValueError {
        ValueError::TypeMismatch {
            expected,
            found: self.kind(),
        }
    }

    /// Reals truncate toward zero.
    pub fn as_integer(&self) -> Result<i64, ValueError> {
        match *self {
            Value::Integer(n) => Ok(n),
            Value::Real(r) => Ok(r as i64),
            _ => Err(self.mismatch("a number")),
        }
    }

    pub fn as_double(&self) -> Result<f64, ValueError> {
        match *self {
            Value::Integer(n) => Ok(n as f64),
            Value::Real(r) => Ok(r),
            _ => Err(self.mismatch("a number")),
        }
    }

    /// Truthiness: booleans as-is, non-zero numbers, non-null pointers.
    pub fn as_boolean(&self) -> Result<bool, ValueError> {
        match *self {
            Value::Boolean(b) => Ok(b),
            Value::Integer(n) => Ok(n != 0),
            Value::Real(r) => Ok(r != 0.0),
            Value::Pointer(p) => Ok(!p.is_null()),
            _ => Err(self.mismatch("a boolean")),
        }
    }

    pub fn as_pointer(&self) -> Result<Pointer, ValueError> {
        match *self {
            Value::Pointer(p) => Ok(p),
            _ => Err(self.mismatch("a pointer")),
        }
    }

    /// The numeric payload, or `None` for non-numeric tags.
    pub fn number(&self) -> Option<f64> {
        self.as_double().ok()
    }
}

/// Same tag and payload, or both numeric with equal numeric payloads.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nothing, Value::Nothing) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Pointer(a), Value::Pointer(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Character(a), Value::Character(b)) => a == b,
            (a, b) if a.is_numeric() && b.is_numeric() => a.number() == b.number(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{n}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Pointer(p) => write!(f, "{p}"),
            other => write!(f, "[{}]", other.kind()),
        }
    }
}
