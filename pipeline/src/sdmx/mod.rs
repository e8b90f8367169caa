//! SDMX serialization and structure metadata.
//!
//! - [`writer`] - SDMX-CSV 2.0 writer and plain CSV artifacts
//! - [`structure`] - SDMX-JSON structure messages (DSD, transformation schemes)

pub mod structure;
pub mod writer;

pub use structure::{parse_data_structure, parse_transformation_scheme, Transformation, TransformationScheme};
pub use writer::{to_sdmx_csv, write_sdmx_csv, write_table_csv};
