//! Transformation module.
//!
//! - Reshape: GLEIF columns to the `LEI_DATA` layout
//! - Pipeline: the end-to-end LEI → SDMX run

pub mod pipeline;
pub mod reshape;

pub use pipeline::*;
pub use reshape::{reshape, target_columns, ReshapeOptions};
