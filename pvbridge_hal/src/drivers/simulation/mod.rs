//! Simulation driver module.
//!
//! An in-memory process image built from `io.toml`, for development and
//! testing without a controller.

mod image;

pub use image::SimulatedImage;

use pvbridge_common::io::config::ImageConfig;
use pvbridge_common::io::image::{ImageError, ProcessImage};
use std::sync::Arc;

/// Factory function to create a simulated image.
pub fn create_image(config: &ImageConfig) -> Result<Arc<dyn ProcessImage>, ImageError> {
    Ok(Arc::new(SimulatedImage::new(config)?))
}
