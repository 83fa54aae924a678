//! Hardware point-name grammar.
//!
//! A point name such as `"InputStatus_3_1"` follows
//! **`<Category><Kind>_<channel>_<moduleIndex>`** and fully determines the
//! variable that gets exposed for it:
//!
//! | Category | Kind     | Variable kind  |
//! |----------|----------|----------------|
//! | `Input`  | `Status` | `BoolInput`    |
//! | `Input`  | `Value`  | `NumberInput`  |
//! | `Output` | `Status` | `BoolOutput`   |
//! | `Output` | `Value`  | `NumberOutput` |
//!
//! Channel and module index are positive decimal integers. Anything else is
//! rejected; the resolver never guesses.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::value::{ValueType, VariableKind};

// ─── Direction ──────────────────────────────────────────────────────

/// Data-flow direction of a point, taken verbatim from the name's category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Hardware → variable.
    Input,
    /// Variable → hardware.
    Output,
}

impl Direction {
    fn token(self) -> &'static str {
        match self {
            Self::Input => "Input",
            Self::Output => "Output",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

// ─── PointKind ──────────────────────────────────────────────────────

/// Module kind token of a point name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    /// Single status bit, exposed as a boolean.
    Status,
    /// Measured or commanded value, exposed as a float.
    Value,
}

impl PointKind {
    fn token(self) -> &'static str {
        match self {
            Self::Status => "Status",
            Self::Value => "Value",
        }
    }

    /// Data type of the exposed variable.
    pub const fn value_type(self) -> ValueType {
        match self {
            Self::Status => ValueType::Bool,
            Self::Value => ValueType::Number,
        }
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// A point name that does not match the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// Wrong number of `_`-separated fields.
    #[error("invalid point name '{0}': expected <Input|Output><Status|Value>_<channel>_<module>")]
    Malformed(String),

    /// Head does not start with `Input` or `Output`.
    #[error("invalid point name '{0}': category must be Input or Output")]
    UnknownCategory(String),

    /// Head does not end with `Status` or `Value`.
    #[error("invalid point name '{0}': kind must be Status or Value")]
    UnknownKind(String),

    /// Channel or module index is not a positive integer.
    #[error("invalid point name '{name}': {field} '{token}' is not a positive integer")]
    BadIndex {
        name: String,
        field: &'static str,
        token: String,
    },
}

// ─── PointName ──────────────────────────────────────────────────────

/// Structured form of a hardware point name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointName {
    pub direction: Direction,
    pub kind: PointKind,
    /// Channel number within the module (1-based).
    pub channel: u16,
    /// Module position in the process image (1-based).
    pub module_index: u16,
}

impl PointName {
    /// Parse `name`. Same as `name.parse()`.
    pub fn resolve(name: &str) -> Result<Self, NameError> {
        name.parse()
    }

    /// Variable kind inferred from category and kind.
    pub const fn variable_kind(&self) -> VariableKind {
        VariableKind::new(self.kind.value_type(), self.direction)
    }

    pub const fn value_type(&self) -> ValueType {
        self.kind.value_type()
    }
}

/// Parse one positive decimal index. Signs, whitespace and zero are rejected.
fn parse_index(name: &str, field: &'static str, token: &str) -> Result<u16, NameError> {
    let bad = || NameError::BadIndex {
        name: name.to_string(),
        field,
        token: token.to_string(),
    };

    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    match token.parse::<u16>() {
        Ok(0) | Err(_) => Err(bad()),
        Ok(n) => Ok(n),
    }
}

impl FromStr for PointName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split('_');
        let (Some(head), Some(channel), Some(module), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(NameError::Malformed(s.to_string()));
        };

        let (direction, rest) = if let Some(rest) = head.strip_prefix("Input") {
            (Direction::Input, rest)
        } else if let Some(rest) = head.strip_prefix("Output") {
            (Direction::Output, rest)
        } else {
            return Err(NameError::UnknownCategory(s.to_string()));
        };

        let kind = match rest {
            "Status" => PointKind::Status,
            "Value" => PointKind::Value,
            _ => return Err(NameError::UnknownKind(s.to_string())),
        };

        Ok(Self {
            direction,
            kind,
            channel: parse_index(s, "channel", channel)?,
            module_index: parse_index(s, "module index", module)?,
        })
    }
}

impl fmt::Display for PointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}_{}_{}",
            self.direction.token(),
            self.kind.token(),
            self.channel,
            self.module_index
        )
    }
}
