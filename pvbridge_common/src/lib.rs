//! PV Bridge Common Library
//!
//! Shared types for every crate of the PV bridge workspace: the hardware
//! point-name grammar, the value model, the process-image (hardware layer)
//! and variable-framework traits, and TOML configuration loading.
//!
//! # Module Structure
//!
//! - [`io`] - Point names, values, the `ProcessImage` trait, `io.toml` structs
//! - [`variable`] - Variable framework traits and attribute merging
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Workspace-wide constants
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use pvbridge_common::prelude::*;
//!
//! let point: PointName = "OutputValue_2_1".parse().unwrap();
//! assert_eq!(point.variable_kind(), VariableKind::NumberOutput);
//! ```

pub mod config;
pub mod consts;
pub mod io;
pub mod prelude;
pub mod variable;
