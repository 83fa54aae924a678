//! Process-image trait and error types.
//!
//! This module defines:
//! - `ProcessImage` trait - Interface the sync engine uses to reach hardware
//! - `HardwarePoint` struct - Metadata for one named point
//! - `ImageError` enum - Error types for process-image operations
//! - `ImageFactory` type alias - Factory function type for driver registries

use std::sync::Arc;
use thiserror::Error;

use super::config::ImageConfig;
use super::value::Value;

/// Error types for process-image operations.
#[derive(Debug, Clone, Error)]
pub enum ImageError {
    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Hardware communication error (controller unreachable, bus fault)
    #[error("Hardware communication error: {0}")]
    CommunicationError(String),

    /// No point with this name in the image
    #[error("Unknown point: {0}")]
    UnknownPoint(String),

    /// Write attempted on a point the controller does not accept writes for
    #[error("Point is read-only: {0}")]
    ReadOnly(String),

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),
}

/// Metadata for one named point in the process image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwarePoint {
    /// Point name, unique within the image.
    pub name: String,
    /// Logical name of the I/O module that owns the point.
    pub module: String,
    /// Byte address within the process image.
    pub address: usize,
}

/// Factory function type for creating process-image instances from an
/// `io.toml` point list.
pub type ImageFactory = fn(&ImageConfig) -> Result<Arc<dyn ProcessImage>, ImageError>;

/// Interface to the hardware I/O layer.
///
/// All methods take `&self`: one image is shared between the cycle loop,
/// binding handles and user code holding the escape hatch from
/// `Engine::underlying_io()`. Implementations synchronize internally.
///
/// # Cycle contract
///
/// | Operation | Caller |
/// |-----------|--------|
/// | `refresh()` | cycle loop only |
/// | `read_value()` / `write_value()` | cycle loop, user tasks |
/// | `flush()` | cycle loop only |
/// | `lookup()` / `logical_module_name()` / `default_value()` / `default_limits()` | any |
pub trait ProcessImage: Send + Sync {
    /// Returns the driver's identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Look up a point by name.
    fn lookup(&self, name: &str) -> Option<HardwarePoint>;

    /// Pull a fresh snapshot of the controller's process image into memory.
    fn refresh(&self) -> Result<(), ImageError>;

    /// Read a point's value from the in-memory snapshot.
    fn read_value(&self, name: &str) -> Result<Value, ImageError>;

    /// Stage a new value for a point in the in-memory snapshot.
    fn write_value(&self, name: &str, value: Value) -> Result<(), ImageError>;

    /// Push staged output values to the controller.
    /// Default: no-op (for images that write through).
    fn flush(&self) -> Result<(), ImageError> {
        Ok(())
    }

    /// Logical module name used as prefix in auto-prefix mode.
    fn logical_module_name(&self, name: &str) -> Option<String> {
        self.lookup(name).map(|p| p.module)
    }

    /// Value an output returns to when the bridge shuts down with cleanup.
    fn default_value(&self, name: &str) -> Result<Value, ImageError>;

    /// Drive limits the hardware implies for an output, as `(low, high)`
    /// (typically the module's configured output range). Used when a
    /// binding does not set its own. Default: none.
    fn default_limits(&self, _name: &str) -> Option<(Option<f64>, Option<f64>)> {
        None
    }

    /// True once the controller connection is gone or the driver wants the
    /// loop to end. Default: false.
    fn exit_requested(&self) -> bool {
        false
    }
}
