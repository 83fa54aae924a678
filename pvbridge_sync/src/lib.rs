//! # PV Bridge Sync Engine
//!
//! Keeps a hardware process image and a set of exposed process variables
//! consistent on a fixed cycle.
//!
//! # Module Structure
//!
//! - [`engine`] - `Engine`: init, bindings, loop tasks, start/stop
//! - [`builder`] - Fluent binding construction
//! - [`binding`] - `Binding` handles and drive limits
//! - [`registry`] - Insertion-ordered binding table
//! - [`cycle`] - Per-cycle algorithm, statistics, thread and Tokio contexts
//! - [`tasks`] - User loop tasks with failure isolation
//! - [`variables`] - In-memory variable framework
//! - [`config`] - `config.toml` for the `pvbridge` binary
//! - [`error`] - `EngineError`
//!
//! # Example
//!
//! ```rust,no_run
//! use pvbridge_common::prelude::*;
//! use pvbridge_hal::SimulatedImage;
//! use pvbridge_sync::{Engine, VariableTable};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let io = ImageConfig::from_toml("[[points]]\nname = \"OutputStatus_1_1\"")?;
//! let mut engine = Engine::new(
//!     Arc::new(SimulatedImage::new(&io)?),
//!     Arc::new(VariableTable::new()),
//! );
//! engine.init(BridgeConfig { cleanup: true, ..Default::default() })?;
//! let lamp = engine.builder("OutputStatus_1_1").name("lamp").build()?;
//! engine.start(None)?;
//! lamp.set(true)?;
//! engine.stop();
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod builder;
pub mod config;
pub mod cycle;
pub mod engine;
pub mod error;
pub mod registry;
pub mod tasks;
pub mod variables;

pub use crate::binding::{Binding, Limits};
pub use crate::builder::BindingBuilder;
pub use crate::cycle::{CycleContext, CycleJob, CycleStats, ThreadContext, TokioContext};
pub use crate::engine::{Engine, EngineState};
pub use crate::error::EngineError;
pub use crate::tasks::{TaskError, TaskResult};
pub use crate::variables::VariableTable;
