//! Process-image driver implementations.
//!
//! - [`simulation`] - In-memory process image for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement `ProcessImage` from `pvbridge_common::io::image`
//! 3. Register its factory in [`register_all`]

pub mod simulation;

use crate::driver_registry::ImageRegistry;

/// Register all built-in drivers.
pub fn register_all(registry: &mut ImageRegistry) {
    registry.register("simulation", simulation::create_image);
}
