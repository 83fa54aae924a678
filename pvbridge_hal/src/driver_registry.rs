//! Registry of process-image drivers.
//!
//! Constructed at startup, populated via `register()`, and consulted once to
//! build the image the engine runs against. No global state.

use pvbridge_common::io::config::ImageConfig;
use pvbridge_common::io::image::{ImageError, ImageFactory, ProcessImage};
use std::collections::HashMap;
use std::sync::Arc;

pub struct ImageRegistry {
    factories: HashMap<&'static str, ImageFactory>,
}

impl ImageRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry pre-populated with every built-in driver.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::drivers::register_all(&mut registry);
        registry
    }

    /// Register an image factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: ImageFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    pub fn get_factory(&self, name: &str) -> Option<ImageFactory> {
        self.factories.get(name).copied()
    }

    /// Create an image by driver name.
    ///
    /// # Errors
    /// `ImageError::DriverNotFound` if no driver with the given name is
    /// registered, or whatever the factory reports.
    pub fn create_image(
        &self,
        name: &str,
        config: &ImageConfig,
    ) -> Result<Arc<dyn ProcessImage>, ImageError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| ImageError::DriverNotFound(name.to_string()))?;
        factory(config)
    }

    /// Registered driver names, sorted.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for ImageRegistry {
    fn default() -> Self {
        Self::new()
    }
}
