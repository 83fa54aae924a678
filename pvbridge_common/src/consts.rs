//! Workspace-wide constants.
//!
//! Single source of truth for cycle timing limits and default paths.

/// Default cycle time in milliseconds.
pub const DEFAULT_CYCLE_TIME_MS: u64 = 200;

/// Shortest cycle time accepted by `BridgeConfig::validate`.
pub const MIN_CYCLE_TIME_MS: u64 = 20;

/// Separator between the module prefix and the variable name in auto-prefix mode.
pub const MODULE_SEPARATOR: char = ':';

/// Module name used for process-image points that do not declare one.
pub const DEFAULT_MODULE_NAME: &str = "core";

/// `stop()` waits at most this many cycle periods for the loop to exit.
pub const STOP_TIMEOUT_CYCLES: u32 = 10;

/// Overruns logged individually before switching to sampled logging.
pub const OVERRUN_LOG_BURST: u64 = 10;

/// After the burst, every Nth overrun is logged.
pub const OVERRUN_LOG_EVERY: u64 = 1000;

/// Default configuration directory path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/pvbridge";

/// Bridge configuration file name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Process-image point list file name inside the config directory.
pub const IO_FILE_NAME: &str = "io.toml";
