//! Bindings: one hardware point paired with one exposed variable.
//!
//! A [`Binding`] is a cheap, cloneable handle. The cycle loop and user
//! code share the same underlying state; the cached value sits behind a
//! per-binding mutex so `get`/`set` are safe from any thread. There is no
//! atomicity across bindings.

use parking_lot::Mutex;
use pvbridge_common::io::image::ProcessImage;
use pvbridge_common::io::name::{Direction, PointName};
use pvbridge_common::io::value::{Value, VariableKind};
use pvbridge_common::variable::ProcessVariable;
use std::fmt;
use std::sync::Arc;

use crate::error::EngineError;

/// Drive limits of an output binding. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Limits {
    pub low: Option<f64>,
    pub high: Option<f64>,
}

impl Limits {
    /// Check the pair is usable: both finite-or-open and `low <= high`.
    pub(crate) fn validate(&self, name: &str) -> Result<(), EngineError> {
        let bad = |reason: String| EngineError::InvalidLimit {
            name: name.to_string(),
            reason,
        };
        for bound in [self.low, self.high].into_iter().flatten() {
            if bound.is_nan() {
                return Err(bad("limit is NaN".to_string()));
            }
        }
        if let (Some(low), Some(high)) = (self.low, self.high) {
            if low > high {
                return Err(bad(format!("low {low} is greater than high {high}")));
            }
        }
        Ok(())
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.low.is_none() && self.high.is_none()
    }

    /// Clamp numeric values into `[low, high]`. Booleans pass through.
    pub fn apply(&self, value: Value) -> Value {
        match value {
            Value::Number(mut n) => {
                if let Some(low) = self.low {
                    n = n.max(low);
                }
                if let Some(high) = self.high {
                    n = n.min(high);
                }
                Value::Number(n)
            }
            other => other,
        }
    }
}

struct BindingInner {
    hardware_name: String,
    exposed_name: String,
    point: PointName,
    kind: VariableKind,
    limits: Limits,
    cache: Mutex<Value>,
    variable: Arc<dyn ProcessVariable>,
}

/// Handle to a registered binding.
#[derive(Clone)]
pub struct Binding {
    inner: Arc<BindingInner>,
}

impl Binding {
    pub(crate) fn new(
        hardware_name: String,
        exposed_name: String,
        point: PointName,
        limits: Limits,
        initial: Value,
        variable: Arc<dyn ProcessVariable>,
    ) -> Self {
        let kind = point.variable_kind();
        Self {
            inner: Arc::new(BindingInner {
                hardware_name,
                exposed_name,
                point,
                kind,
                limits,
                cache: Mutex::new(initial.coerce(kind.value_type())),
                variable,
            }),
        }
    }

    pub fn hardware_name(&self) -> &str {
        &self.inner.hardware_name
    }

    pub fn exposed_name(&self) -> &str {
        &self.inner.exposed_name
    }

    pub fn point(&self) -> PointName {
        self.inner.point
    }

    pub fn kind(&self) -> VariableKind {
        self.inner.kind
    }

    pub fn direction(&self) -> Direction {
        self.inner.kind.direction()
    }

    pub fn limits(&self) -> Limits {
        self.inner.limits
    }

    /// The exposed variable.
    pub fn variable(&self) -> &Arc<dyn ProcessVariable> {
        &self.inner.variable
    }

    /// Last value seen or written by the bridge.
    pub fn get(&self) -> Value {
        *self.inner.cache.lock()
    }

    /// Write an output. The value is coerced to the binding's type and
    /// clamped to its limits, then posted to the variable; the next cycle
    /// carries it to hardware. `get()` afterwards returns the clamped value,
    /// not necessarily `value`.
    ///
    /// # Errors
    /// - `EngineError::Direction` on an input binding (cache untouched)
    /// - `EngineError::Variable` if the framework rejects the value
    pub fn set(&self, value: impl Into<Value>) -> Result<(), EngineError> {
        if !self.inner.kind.is_output() {
            return Err(EngineError::Direction(self.inner.hardware_name.clone()));
        }
        let value = self.normalize(value.into());
        let mut cache = self.inner.cache.lock();
        self.inner.variable.set(value)?;
        *cache = value;
        Ok(())
    }

    fn normalize(&self, value: Value) -> Value {
        self.inner
            .limits
            .apply(value.coerce(self.inner.kind.value_type()))
    }

    // ─── Cycle side ─────────────────────────────────────────────────

    /// Hardware → variable. Returns `true` when the value changed and was
    /// posted.
    pub(crate) fn pull_input(&self, io: &dyn ProcessImage) -> Result<bool, EngineError> {
        let value = io
            .read_value(&self.inner.hardware_name)?
            .coerce(self.inner.kind.value_type());
        let mut cache = self.inner.cache.lock();
        if *cache == value {
            return Ok(false);
        }
        self.inner.variable.set(value)?;
        *cache = value;
        Ok(true)
    }

    /// Variable → hardware. The cache only follows a successful write.
    pub(crate) fn push_output(&self, io: &dyn ProcessImage) -> Result<(), EngineError> {
        let mut cache = self.inner.cache.lock();
        let value = self.normalize(self.inner.variable.get());
        io.write_value(&self.inner.hardware_name, value)?;
        *cache = value;
        Ok(())
    }

    /// Drive the hardware point back to its default and post the default to
    /// the variable.
    pub(crate) fn reset_output(&self, io: &dyn ProcessImage) -> Result<(), EngineError> {
        let default = io
            .default_value(&self.inner.hardware_name)?
            .coerce(self.inner.kind.value_type());
        let mut cache = self.inner.cache.lock();
        io.write_value(&self.inner.hardware_name, default)?;
        *cache = default;
        self.inner.variable.set(default)?;
        Ok(())
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("hardware_name", &self.inner.hardware_name)
            .field("exposed_name", &self.inner.exposed_name)
            .field("kind", &self.inner.kind)
            .field("limits", &self.inner.limits)
            .field("value", &self.get())
            .finish()
    }
}
