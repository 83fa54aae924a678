//! Variable framework interface.
//!
//! The bridge does not implement a network protocol. It creates typed,
//! externally visible variables through a [`VariableFramework`] and keeps
//! them in step with the process image through [`ProcessVariable`] handles.
//!
//! Attributes of a new variable are the defaults for its [`VariableKind`]
//! merged with the user's [`AttributeOverrides`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::io::value::{Value, ValueType, VariableKind};

/// Errors raised by a variable framework.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariableError {
    /// A variable with this name already exists.
    #[error("variable '{0}' already exists")]
    Duplicate(String),

    /// The framework refused the request.
    #[error("variable '{name}' rejected: {reason}")]
    Rejected { name: String, reason: String },
}

/// User-supplied attribute overrides for one binding.
///
/// Every field is optional; unset fields keep the kind default.
///
/// # TOML Example
///
/// ```toml
/// description = "Tank level"
/// units = "mm"
/// low = 0.0
/// high = 1500.0
///
/// [fields]
/// SCAN = "I/O Intr"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeOverrides {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
    /// Lower drive limit. Outputs only.
    #[serde(default)]
    pub low: Option<f64>,
    /// Upper drive limit. Outputs only.
    #[serde(default)]
    pub high: Option<f64>,
    /// Free-form fields passed through to the framework.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl AttributeOverrides {
    #[inline]
    pub fn has_limits(&self) -> bool {
        self.low.is_some() || self.high.is_some()
    }
}

/// Resolved attributes handed to [`VariableFramework::create_variable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableAttributes {
    pub description: String,
    pub units: String,
    pub low: Option<f64>,
    pub high: Option<f64>,
    /// Display precision for numeric variables.
    pub precision: Option<u8>,
    /// State labels for boolean variables.
    pub zero_label: Option<String>,
    pub one_label: Option<String>,
    /// Value the variable starts with.
    pub initial: Value,
    pub fields: BTreeMap<String, String>,
}

impl VariableAttributes {
    /// Defaults for a freshly created variable of `kind`.
    pub fn defaults_for(kind: VariableKind) -> Self {
        let value_type = kind.value_type();
        let (precision, zero_label, one_label) = match value_type {
            ValueType::Bool => (None, Some("Off".to_string()), Some("On".to_string())),
            ValueType::Number => (Some(3), None, None),
        };
        Self {
            description: String::new(),
            units: String::new(),
            low: None,
            high: None,
            precision,
            zero_label,
            one_label,
            initial: Value::zero(value_type),
            fields: BTreeMap::new(),
        }
    }

    /// Apply `overrides` on top of `self`. Extra fields are merged key by key.
    pub fn merge(mut self, overrides: &AttributeOverrides) -> Self {
        if let Some(description) = &overrides.description {
            self.description.clone_from(description);
        }
        if let Some(units) = &overrides.units {
            self.units.clone_from(units);
        }
        if overrides.low.is_some() {
            self.low = overrides.low;
        }
        if overrides.high.is_some() {
            self.high = overrides.high;
        }
        for (key, value) in &overrides.fields {
            self.fields.insert(key.clone(), value.clone());
        }
        self
    }

    pub fn with_initial(mut self, initial: Value) -> Self {
        self.initial = initial;
        self
    }
}

/// One externally visible, typed variable.
///
/// `get`/`set` may be called from any thread, including the framework's own
/// network threads.
pub trait ProcessVariable: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> VariableKind;

    /// Current value as seen by clients.
    fn get(&self) -> Value;

    /// Post a new value to clients.
    fn set(&self, value: Value) -> Result<(), VariableError>;
}

/// Factory for typed variables.
pub trait VariableFramework: Send + Sync {
    fn create_variable(
        &self,
        kind: VariableKind,
        name: &str,
        attributes: VariableAttributes,
    ) -> Result<Arc<dyn ProcessVariable>, VariableError>;

    /// Withdraw a variable so its name can be reused. Returns `false` if the
    /// framework does not know the name or cannot remove variables.
    fn remove_variable(&self, _name: &str) -> bool {
        false
    }
}
