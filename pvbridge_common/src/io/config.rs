//! Process-image point list (`io.toml`).
//!
//! Describes the points a process image exposes. Real controllers enumerate
//! their points themselves; the simulation image is built from this file.
//!
//! ```toml
//! [[points]]
//! name = "InputValue_1_1"
//! module = "AIO"
//! initial = 4.2
//!
//! [[points]]
//! name = "OutputStatus_1_2"
//! module = "DIO"
//! default = false
//!
//! [[points]]
//! name = "OutputValue_1_3"
//! module = "AIO"
//! low = 0.0
//! high = 10000.0
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::name::{Direction, PointName};
use super::value::{Value, ValueType};
use crate::config::ConfigError;
use crate::consts::DEFAULT_MODULE_NAME;

/// A single point definition from `io.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PointConfig {
    /// Point name. Names outside the point grammar are allowed here; the
    /// engine rejects them at binding time.
    pub name: String,

    /// Logical module name. Default: `"core"`.
    #[serde(default)]
    pub module: Option<String>,

    /// Value restored on cleanup. Default: zero of the point's type.
    #[serde(default)]
    pub default: Option<Value>,

    /// Value at power-up. Default: `default`.
    #[serde(default)]
    pub initial: Option<Value>,

    /// Lower end of the module's output range. Outputs only.
    #[serde(default)]
    pub low: Option<f64>,

    /// Upper end of the module's output range. Outputs only.
    #[serde(default)]
    pub high: Option<f64>,
}

impl PointConfig {
    /// Type implied by the name; unparseable names are numeric.
    pub fn value_type(&self) -> ValueType {
        self.name
            .parse::<PointName>()
            .map(|p| p.value_type())
            .unwrap_or(ValueType::Number)
    }

    fn is_output(&self) -> bool {
        self.name
            .parse::<PointName>()
            .is_ok_and(|p| p.direction == Direction::Output)
    }

    /// Output range as `(low, high)`, `None` when neither end is set.
    pub fn drive_limits(&self) -> Option<(Option<f64>, Option<f64>)> {
        (self.low.is_some() || self.high.is_some()).then_some((self.low, self.high))
    }

    pub fn module_name(&self) -> &str {
        self.module.as_deref().unwrap_or(DEFAULT_MODULE_NAME)
    }

    pub fn default_value(&self) -> Value {
        let ty = self.value_type();
        self.default.map_or(Value::zero(ty), |v| v.coerce(ty))
    }

    pub fn initial_value(&self) -> Value {
        let ty = self.value_type();
        self.initial
            .map_or_else(|| self.default_value(), |v| v.coerce(ty))
    }
}

/// Top-level `io.toml` structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImageConfig {
    #[serde(default)]
    pub points: Vec<PointConfig>,
}

impl ImageConfig {
    /// Parse and validate `io.toml` content.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Point names must be non-empty and unique. Ranges are only allowed on
    /// output points and must satisfy `low <= high`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for point in &self.points {
            if point.name.is_empty() {
                return Err(ConfigError::ValidationError(
                    "point name cannot be empty".to_string(),
                ));
            }
            if let Some((low, high)) = point.drive_limits() {
                if !point.is_output() {
                    return Err(ConfigError::ValidationError(format!(
                        "point '{}': low/high apply to output points only",
                        point.name
                    )));
                }
                if [low, high].into_iter().flatten().any(f64::is_nan) {
                    return Err(ConfigError::ValidationError(format!(
                        "point '{}': range bound is NaN",
                        point.name
                    )));
                }
                if let (Some(low), Some(high)) = (low, high) {
                    if low > high {
                        return Err(ConfigError::ValidationError(format!(
                            "point '{}': low {low} is greater than high {high}",
                            point.name
                        )));
                    }
                }
            }
            if !seen.insert(point.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate point name '{}'",
                    point.name
                )));
            }
        }
        Ok(())
    }
}
