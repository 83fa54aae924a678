//! Value model shared by the process image and the variable framework.

use core::fmt;
use serde::{Deserialize, Serialize};

use super::name::Direction;

// ─── ValueType ──────────────────────────────────────────────────────

/// Data type of a point or variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Bool,
    Number,
}

// ─── Value ──────────────────────────────────────────────────────────

/// A single point or variable value.
///
/// Deserializes untagged so that `io.toml` can write `default = 0` or
/// `default = true` directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
}

impl Value {
    /// Zero value of the given type.
    pub const fn zero(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Bool => Self::Bool(false),
            ValueType::Number => Self::Number(0.0),
        }
    }

    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Number(_) => ValueType::Number,
        }
    }

    /// Boolean view: numbers are `true` when non-zero.
    pub fn as_bool(&self) -> bool {
        match *self {
            Self::Bool(b) => b,
            Self::Number(n) => n != 0.0,
        }
    }

    /// Numeric view: booleans map to `0.0` / `1.0`.
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Bool(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Number(n) => n,
        }
    }

    /// Convert to `value_type`, leaving matching values untouched.
    pub fn coerce(self, value_type: ValueType) -> Self {
        match value_type {
            ValueType::Bool => Self::Bool(self.as_bool()),
            ValueType::Number => Self::Number(self.as_f64()),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Number(0.0)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

// ─── VariableKind ───────────────────────────────────────────────────

/// The four variable shapes a binding can take. Resolved once from the
/// point name when the binding is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    BoolInput,
    BoolOutput,
    NumberInput,
    NumberOutput,
}

impl VariableKind {
    pub const fn new(value_type: ValueType, direction: Direction) -> Self {
        match (value_type, direction) {
            (ValueType::Bool, Direction::Input) => Self::BoolInput,
            (ValueType::Bool, Direction::Output) => Self::BoolOutput,
            (ValueType::Number, Direction::Input) => Self::NumberInput,
            (ValueType::Number, Direction::Output) => Self::NumberOutput,
        }
    }

    pub const fn direction(self) -> Direction {
        match self {
            Self::BoolInput | Self::NumberInput => Direction::Input,
            Self::BoolOutput | Self::NumberOutput => Direction::Output,
        }
    }

    pub const fn value_type(self) -> ValueType {
        match self {
            Self::BoolInput | Self::BoolOutput => ValueType::Bool,
            Self::NumberInput | Self::NumberOutput => ValueType::Number,
        }
    }

    #[inline]
    pub const fn is_output(self) -> bool {
        matches!(self, Self::BoolOutput | Self::NumberOutput)
    }
}

impl fmt::Display for VariableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BoolInput => write!(f, "bool-input"),
            Self::BoolOutput => write!(f, "bool-output"),
            Self::NumberInput => write!(f, "number-input"),
            Self::NumberOutput => write!(f, "number-output"),
        }
    }
}
