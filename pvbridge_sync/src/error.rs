//! Engine error type.

use pvbridge_common::config::ConfigError;
use pvbridge_common::io::image::ImageError;
use pvbridge_common::io::name::NameError;
use pvbridge_common::variable::VariableError;
use thiserror::Error;

/// Errors returned synchronously by [`Engine`](crate::Engine) and
/// [`Binding`](crate::Binding) operations.
///
/// Failures inside the running cycle loop are logged and counted in
/// [`CycleStats`](crate::CycleStats), never returned.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    InvalidName(#[from] NameError),

    #[error("no hardware point named '{0}'")]
    UnknownName(String),

    #[error("hardware point '{0}' is already bound")]
    DuplicateBinding(String),

    #[error("variable name '{0}' is already in use")]
    DuplicateVariable(String),

    #[error("invalid limits for '{name}': {reason}")]
    InvalidLimit { name: String, reason: String },

    /// `set` called on an input binding.
    #[error("'{0}' is an input and cannot be written")]
    Direction(String),

    #[error("engine already initialized")]
    AlreadyInitialized,

    #[error("engine not initialized")]
    NotInitialized,

    #[error("cycle loop already started")]
    AlreadyStarted,

    #[error("loop task '{0}' is already registered")]
    DuplicateTask(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    #[error("hardware error: {0}")]
    Hardware(#[from] ImageError),

    #[error("variable error: {0}")]
    Variable(#[from] VariableError),

    /// The cycle context could not host the loop.
    #[error("failed to launch cycle loop: {0}")]
    Launch(String),
}
