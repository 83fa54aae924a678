//! Fluent binding construction.
//!
//! ```rust,no_run
//! # use pvbridge_sync::Engine;
//! # fn demo(engine: &mut Engine) -> Result<(), pvbridge_sync::EngineError> {
//! let valve = engine
//!     .builder("OutputValue_1_3")
//!     .name("valve_position")
//!     .description("Inlet valve")
//!     .units("%")
//!     .limits(0.0, 100.0)
//!     .field("SCAN", "I/O Intr")
//!     .build()?;
//! valve.set(40.0)?;
//! # Ok(())
//! # }
//! ```

use pvbridge_common::variable::AttributeOverrides;

use crate::binding::Binding;
use crate::engine::Engine;
use crate::error::EngineError;

#[must_use = "a builder does nothing until `build()` is called"]
pub struct BindingBuilder<'a> {
    engine: &'a mut Engine,
    hardware_name: String,
    exposed_name: Option<String>,
    overrides: AttributeOverrides,
}

impl<'a> BindingBuilder<'a> {
    pub(crate) fn new(engine: &'a mut Engine, hardware_name: &str) -> Self {
        Self {
            engine,
            hardware_name: hardware_name.to_string(),
            exposed_name: None,
            overrides: AttributeOverrides::default(),
        }
    }

    /// Exposed variable name. Default: the hardware name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.exposed_name = Some(name.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.overrides.description = Some(description.into());
        self
    }

    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.overrides.units = Some(units.into());
        self
    }

    /// Drive limits. Outputs only; checked by `build()`.
    pub fn limits(mut self, low: f64, high: f64) -> Self {
        self.overrides.low = Some(low);
        self.overrides.high = Some(high);
        self
    }

    /// Extra framework field, passed through verbatim.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.fields.insert(key.into(), value.into());
        self
    }

    /// Replace all attribute overrides at once.
    pub fn overrides(mut self, overrides: AttributeOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn build(self) -> Result<Binding, EngineError> {
        self.engine.create_binding(
            &self.hardware_name,
            self.exposed_name.as_deref(),
            self.overrides,
        )
    }
}
