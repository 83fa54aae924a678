//! Hardware side of the bridge.
//!
//! Point names are resolved by [`name`] into the variable kind they expose.
//! The sync engine talks to hardware only through the [`image::ProcessImage`]
//! trait.

pub mod config;
pub mod image;
pub mod name;
pub mod value;
