//! Error types for the LEI → SDMX pipeline.
//!
//! Errors are split along the two failure classes of the pipeline:
//!
//! - Local failures: [`CsvError`], [`ReshapeError`], [`OutputError`]
//! - Remote failures: [`RegistryError`], [`RuleEngineError`]
//!
//! [`PipelineError`] wraps all of them. Structural non-conformance and rule
//! violations are *not* errors, they are reported through
//! [`crate::models::StructuralReport`] and [`crate::models::QualityReport`].

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// CSV Loading Errors
// =============================================================================

/// Errors while loading the source CSV.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Read failure while streaming the input.
    #[error("Cannot read CSV data: {0}")]
    Read(#[source] std::io::Error),

    /// Empty file (no header line).
    #[error("CSV file is empty")]
    EmptyFile,

    /// A record could not be parsed.
    #[error("Malformed CSV at line {line}: {message}")]
    Malformed { line: u64, message: String },
}

impl CsvError {
    pub(crate) fn from_csv(err: csv::Error) -> Self {
        let line = err.position().map(|p| p.line()).unwrap_or(0);
        let message = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(source) => CsvError::Read(source),
            _ => CsvError::Malformed { line, message },
        }
    }
}

// =============================================================================
// Reshaping Errors
// =============================================================================

/// Errors while reshaping the raw extract into the target layout.
#[derive(Debug, Error)]
pub enum ReshapeError {
    /// Source columns required by the target schema are absent.
    #[error("Missing source column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

// =============================================================================
// Output Errors
// =============================================================================

/// Errors writing the dataset or log artifacts.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Cannot write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV writer error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors talking to the metadata registry (FMR).
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Endpoint is not a valid URL.
    #[error("Invalid registry endpoint '{0}'")]
    InvalidEndpoint(String),

    /// Transport-level failure (DNS, TLS, connection, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Registry answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not have the expected shape.
    #[error("Invalid registry response: {0}")]
    InvalidResponse(String),

    /// Requested artefact is not published.
    #[error("Structure not found: {0}")]
    NotFound(String),

    /// Data load ended in an error status (IncorrectDSD, MissingDSD, ...).
    #[error("Registry rejected the data load with status '{status}': {body}")]
    Rejected { status: String, body: String },

    /// Load status never left the in-process states.
    #[error("Load status still '{status}' after {retries} retries")]
    Timeout { status: String, retries: u32 },
}

// =============================================================================
// Rule Engine Errors
// =============================================================================

/// Errors talking to the VTL rule engine.
#[derive(Debug, Error)]
pub enum RuleEngineError {
    /// The transformation scheme could not be retrieved.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Transport-level failure.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Engine answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not have the expected shape.
    #[error("Invalid engine response: {0}")]
    InvalidResponse(String),

    /// The scheme holds no transformations.
    #[error("Transformation scheme {0} has no transformations")]
    EmptyScheme(String),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors reading the pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: String, value: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error type returned by [`crate::transform::pipeline::run_pipeline`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    #[error("Reshape error: {0}")]
    Reshape(#[from] ReshapeError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Rule engine error: {0}")]
    RuleEngine(#[from] RuleEngineError),
}

impl PipelineError {
    /// True when the failure came from one of the remote services.
    pub fn is_remote(&self) -> bool {
        matches!(self, PipelineError::Registry(_) | PipelineError::RuleEngine(_))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV loading.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type for rule engine operations.
pub type RuleEngineResult<T> = Result<T, RuleEngineError>;

/// Result type for artifact writers.
pub type OutputResult<T> = Result<T, OutputError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
