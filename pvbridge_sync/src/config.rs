//! `config.toml` for the `pvbridge` binary.
//!
//! ```toml
//! [shared]
//! log_level = "info"
//! service_name = "pvbridge"
//!
//! [cycle]
//! cycletime_ms = 100
//! auto_prefix = true
//! cleanup = true
//!
//! [[bindings]]
//! point = "InputValue_1_1"
//! name = "tank_level"
//! description = "Tank level"
//! units = "mm"
//!
//! [[bindings]]
//! point = "OutputValue_1_2"
//! low = 0.0
//! high = 10.0
//! ```

use pvbridge_common::config::{BridgeConfig, ConfigError, ConfigLoader, SharedConfig};
use pvbridge_common::consts::{CONFIG_FILE_NAME, IO_FILE_NAME};
use pvbridge_common::io::config::ImageConfig;
use pvbridge_common::variable::AttributeOverrides;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::binding::Binding;
use crate::engine::Engine;
use crate::error::EngineError;

/// One `[[bindings]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingConfig {
    /// Hardware point name.
    pub point: String,
    /// Exposed name. Default: the point name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl BindingConfig {
    pub fn overrides(&self) -> AttributeOverrides {
        AttributeOverrides {
            description: self.description.clone(),
            units: self.units.clone(),
            low: self.low,
            high: self.high,
            fields: self.fields.clone(),
        }
    }

    pub fn create(&self, engine: &mut Engine) -> Result<Binding, EngineError> {
        engine.create_binding(&self.point, self.name.as_deref(), self.overrides())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub shared: SharedConfig,
    #[serde(default)]
    pub cycle: BridgeConfig,
    #[serde(default)]
    pub bindings: Vec<BindingConfig>,
}

impl AppConfig {
    /// Validate shared settings, cycle settings and binding uniqueness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.cycle.validate()?;
        let mut seen = HashSet::new();
        for binding in &self.bindings {
            if !seen.insert(binding.point.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "point '{}' is bound twice",
                    binding.point
                )));
            }
        }
        Ok(())
    }
}

/// Load and validate `config.toml` and `io.toml` from `dir`.
pub fn load_config_dir(dir: &Path) -> Result<(AppConfig, ImageConfig), ConfigError> {
    let app = AppConfig::load(&dir.join(CONFIG_FILE_NAME))?;
    app.validate()?;
    let io = ImageConfig::load(&dir.join(IO_FILE_NAME))?;
    io.validate()?;
    Ok((app, io))
}
