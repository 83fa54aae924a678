//! In-process variable framework.
//!
//! `VariableTable` keeps every exposed variable in memory. It stands in for
//! a networked control-system framework in tests and in the `pvbridge`
//! binary, where the table is logged instead of served.

use parking_lot::{Mutex, RwLock};
use pvbridge_common::io::value::{Value, VariableKind};
use pvbridge_common::variable::{
    ProcessVariable, VariableAttributes, VariableError, VariableFramework,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// One variable held by a [`VariableTable`].
pub struct TableVariable {
    name: String,
    kind: VariableKind,
    attributes: VariableAttributes,
    value: Mutex<Value>,
    posts: AtomicU64,
}

impl TableVariable {
    pub fn attributes(&self) -> &VariableAttributes {
        &self.attributes
    }

    /// Number of successful `set` calls since creation.
    pub fn post_count(&self) -> u64 {
        self.posts.load(Ordering::Relaxed)
    }
}

impl ProcessVariable for TableVariable {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> VariableKind {
        self.kind
    }

    fn get(&self) -> Value {
        *self.value.lock()
    }

    fn set(&self, value: Value) -> Result<(), VariableError> {
        let value = value.coerce(self.kind.value_type());
        *self.value.lock() = value;
        self.posts.fetch_add(1, Ordering::Relaxed);
        trace!("{} <- {}", self.name, value);
        Ok(())
    }
}

#[derive(Default)]
pub struct VariableTable {
    variables: RwLock<HashMap<String, Arc<TableVariable>>>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable(&self, name: &str) -> Option<Arc<TableVariable>> {
        self.variables.read().get(name).cloned()
    }

    pub fn value(&self, name: &str) -> Option<Value> {
        self.variables.read().get(name).map(|v| v.get())
    }

    /// A network client writing a variable. Inputs are owned by the
    /// hardware and refuse client writes.
    pub fn client_write(&self, name: &str, value: Value) -> Result<(), VariableError> {
        let var = self.variable(name).ok_or_else(|| VariableError::Rejected {
            name: name.to_string(),
            reason: "no such variable".to_string(),
        })?;
        if !var.kind.is_output() {
            return Err(VariableError::Rejected {
                name: name.to_string(),
                reason: "input variables are read-only".to_string(),
            });
        }
        var.set(value)
    }

    pub fn len(&self) -> usize {
        self.variables.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.read().is_empty()
    }

    /// Current value of every variable, sorted by name.
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.variables
            .read()
            .iter()
            .map(|(name, var)| (name.clone(), var.get()))
            .collect()
    }
}

impl VariableFramework for VariableTable {
    fn create_variable(
        &self,
        kind: VariableKind,
        name: &str,
        attributes: VariableAttributes,
    ) -> Result<Arc<dyn ProcessVariable>, VariableError> {
        let mut variables = self.variables.write();
        if variables.contains_key(name) {
            return Err(VariableError::Duplicate(name.to_string()));
        }
        let var = Arc::new(TableVariable {
            name: name.to_string(),
            kind,
            value: Mutex::new(attributes.initial.coerce(kind.value_type())),
            attributes,
            posts: AtomicU64::new(0),
        });
        variables.insert(name.to_string(), Arc::clone(&var));
        Ok(var)
    }

    fn remove_variable(&self, name: &str) -> bool {
        self.variables.write().remove(name).is_some()
    }
}
