//! # LEI → SDMX - GLEIF extract to a validated SDMX dataset
//!
//! Turns a GLEIF golden-copy CSV extract into an SDMX dataset bound to the
//! `MD:LEI_DATA(1.0)` data structure, then validates it twice: structurally
//! through an FMR registry and for data quality through a VTL rule engine
//! running the `MD:LEI_VALIDATIONS(1.0)` transformation scheme.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌────────────┐   ┌────────────┐
//! │  GLEIF   │──▶│  Loader  │──▶│ Reshaper │──▶│ Structural │──▶│  Quality   │
//! │   CSV    │   │(row lim.)│   │ (ACTIVE) │   │   (FMR)    │   │   (VTL)    │
//! └──────────┘   └──────────┘   └──────────┘   └────────────┘   └────────────┘
//!                                     │               │                │
//!                                     ▼               ▼                ▼
//!                              lei_to_sdmx.csv   structural_      {rule}_logs.csv
//!                                                validation_
//!                                                logs.json
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use lei_sdmx::{run_pipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = PipelineConfig::from_env().unwrap();
//!     let output = run_pipeline(&config).await.unwrap();
//!     println!("{} rows, valid: {}", output.dataset.table.len(), output.structural.is_valid());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`] - Defaults, environment overrides
//! - [`error`] - Hierarchical error types
//! - [`logs`] - Broadcast progress log
//! - [`models`] - Tables, structure references, reports
//! - [`parser`] - CSV loading with auto-detection
//! - [`transform`] - Reshaping and the pipeline
//! - [`sdmx`] - SDMX-CSV writer, SDMX-JSON structure reader
//! - [`registry`] - FMR client
//! - [`validation`] - Structural and quality validation

// Core modules
pub mod config;
pub mod error;
pub mod logs;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// SDMX formats
pub mod sdmx;

// Remote services
pub mod registry;
pub mod validation;

#[cfg(test)]
mod testing;

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{PipelineConfig, FMR_ENDPOINT};

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, CsvError, OutputError, PipelineError, PipelineResult, RegistryError, ReshapeError,
    RuleEngineError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Component, ComponentRole, Dataset, Diagnostic, QualityReport, ScriptQuery, StructuralReport,
    StructuralStatus, StructureRef, Table,
};

// =============================================================================
// Re-exports - CSV Loading
// =============================================================================

pub use parser::{decode_content, detect_delimiter, detect_encoding, load_csv, LoadResult, DEFAULT_ROW_LIMIT};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::{
    convert, get_sdmx_dataset, lei_to_sdmx_pipeline, load_lei_data, reshape, reshape_lei_data, run_pipeline,
    target_columns, CsvInfo, PipelineOutput, ReshapeOptions,
};

// =============================================================================
// Re-exports - Services
// =============================================================================

pub use registry::RegistryClient;
pub use validation::{quality_validation, structural_validation, RuleEngineClient};
