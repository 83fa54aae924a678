//! Prelude module for common re-exports.
//!
//! ```rust
//! use pvbridge_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{BridgeConfig, ConfigError, ConfigLoader, LogLevel, SharedConfig};

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{DEFAULT_CYCLE_TIME_MS, MIN_CYCLE_TIME_MS};

// ─── Hardware side ──────────────────────────────────────────────────
pub use crate::io::config::{ImageConfig, PointConfig};
pub use crate::io::image::{HardwarePoint, ImageError, ImageFactory, ProcessImage};
pub use crate::io::name::{Direction, NameError, PointKind, PointName};
pub use crate::io::value::{Value, ValueType, VariableKind};

// ─── Variable side ──────────────────────────────────────────────────
pub use crate::variable::{
    AttributeOverrides, ProcessVariable, VariableAttributes, VariableError, VariableFramework,
};
