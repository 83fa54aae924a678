//! # PV Bridge HAL
//!
//! Process-image drivers with a pluggable registry.
//!
//! Drivers implement the `ProcessImage` trait defined in
//! `pvbridge_common::io::image` and are created by name through an
//! [`ImageRegistry`].
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Image factory registration
//! - [`drivers`] - Process-image implementations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     pvbridge_hal                         │
//! │  ┌───────────────┐        ┌──────────────────────────┐   │
//! │  │ ImageRegistry │──────► │ ImageFactory(&io.toml)   │   │
//! │  └───────────────┘        └────────────┬─────────────┘   │
//! │                                        ▼                 │
//! │                          ┌──────────────────────────┐    │
//! │                          │ Arc<dyn ProcessImage>    │    │
//! │                          └──────────────────────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod driver_registry;
pub mod drivers;

pub use crate::driver_registry::ImageRegistry;
pub use crate::drivers::simulation::SimulatedImage;
