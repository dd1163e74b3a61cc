//! Static unit algebra: length dimensions, named units and the registry.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    #[error("unknown unit '{0}'")]
    UnknownUnit(String),
}

/// Exponent of length. `0` is dimensionless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Dimension {
    pub length: i32,
}

impl Dimension {
    pub const DIMENSIONLESS: Dimension = Dimension { length: 0 };
    pub const LENGTH: Dimension = Dimension { length: 1 };

    pub const fn length(exponent: i32) -> Self {
        Dimension { length: exponent }
    }

    pub fn is_dimensionless(self) -> bool {
        self.length == 0
    }

    /// Scale the exponent, as for `unit^p`.
    pub fn pow(self, p: i32) -> Self {
        Dimension {
            length: self.length.saturating_mul(p),
        }
    }
}

/// Combines dimensions of a product.
impl std::ops::Add for Dimension {
    type Output = Dimension;
    fn add(self, rhs: Self) -> Self::Output {
        Dimension {
            length: self.length.saturating_add(rhs.length),
        }
    }
}

/// Combines dimensions of a quotient.
impl std::ops::Sub for Dimension {
    type Output = Dimension;
    fn sub(self, rhs: Self) -> Self::Output {
        Dimension {
            length: self.length.saturating_sub(rhs.length),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.length {
            0 => f.write_str("dimensionless"),
            1 => f.write_str("Length"),
            n => write!(f, "Length^{n}"),
        }
    }
}

/// A named unit: `scale` meters per unit, raised to `dim`.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub symbol: String,
    pub scale: f64,
    pub dim: Dimension,
}

impl Unit {
    pub fn new(symbol: impl Into<String>, scale: f64, dim: Dimension) -> Self {
        Self {
            symbol: symbol.into(),
            scale,
            dim,
        }
    }
}

/// Length units every registry starts with, as (symbol, meters).
const LENGTH_UNITS: &[(&str, f64)] = &[
    ("mm", 0.001),
    ("cm", 0.01),
    ("m", 1.0),
    ("km", 1000.0),
    ("in", 0.0254),
    ("ft", 0.3048),
    ("yd", 0.9144),
    ("mi", 1609.344),
];

/// Case-sensitive symbol table of known units.
#[derive(Debug, Clone)]
pub struct UnitRegistry {
    units: BTreeMap<String, Unit>,
}

impl UnitRegistry {
    /// A registry holding no units at all.
    pub fn empty() -> Self {
        Self {
            units: BTreeMap::new(),
        }
    }

    /// The standard registry with the built-in length units.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for &(symbol, scale) in LENGTH_UNITS {
            registry.register(Unit::new(symbol, scale, Dimension::LENGTH));
        }
        registry
    }

    /// Add or replace a unit.
    pub fn register(&mut self, unit: Unit) -> Option<Unit> {
        self.units.insert(unit.symbol.clone(), unit)
    }

    pub fn try_get(&self, symbol: &str) -> Option<&Unit> {
        self.units.get(symbol)
    }

    pub fn get(&self, symbol: &str) -> Result<&Unit, UnitError> {
        self.try_get(symbol)
            .ok_or_else(|| UnitError::UnknownUnit(symbol.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}
