//! High-level pipeline API: GLEIF CSV → SDMX dataset → validations.
//!
//! The stages run strictly one after the other:
//! load, reshape, bind to the DSD (and write SDMX-CSV), structural
//! validation, quality validation.
//!
//! # Example
//!
//! ```rust,ignore
//! use lei_sdmx::{run_pipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::from_env()?;
//!     let output = run_pipeline(&config).await?;
//!     println!("structurally valid: {}", output.structural.is_valid());
//!     Ok(())
//! }
//! ```

use serde::Serialize;
use std::path::{Path, PathBuf};

use super::reshape::{reshape, ReshapeOptions};
use crate::config::PipelineConfig;
use crate::error::{PipelineResult, RegistryError};
use crate::logs::{log_info, log_success, log_warning};
use crate::models::{Dataset, QualityReport, ScriptQuery, StructuralReport, StructureRef, Table};
use crate::parser::{load_csv, LoadResult};
use crate::registry::RegistryClient;
use crate::sdmx::write_sdmx_csv;
use crate::validation::{quality_validation, structural_validation, RuleEngineClient};

/// Everything a pipeline run produces.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub dataset: Dataset,
    pub structural: StructuralReport,
    pub quality: QualityReport,
    pub csv_info: CsvInfo,
}

/// Source file information
#[derive(Debug, Clone, Serialize)]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    /// Rows read (after the row limit, before filtering)
    pub rows_read: usize,
    /// Rows kept by the reshaper
    pub rows_kept: usize,
}

/// Run the whole pipeline with explicit arguments and default settings
/// for everything else.
pub async fn lei_to_sdmx_pipeline(
    input_path: &Path,
    row_limit: usize,
    registry_endpoint: &str,
    script_query: ScriptQuery,
    output_path: Option<PathBuf>,
    logs_folder: Option<PathBuf>,
) -> PipelineResult<PipelineOutput> {
    let config = PipelineConfig {
        input_path: input_path.to_path_buf(),
        row_limit,
        registry_endpoint: registry_endpoint.to_string(),
        script_query,
        output_path,
        logs_folder,
        ..PipelineConfig::default()
    };
    run_pipeline(&config).await
}

/// Run the pipeline described by `config`.
///
/// Returns an error only for local failures (file, columns, writes) and
/// service failures. Structural and rule findings are in the output.
pub async fn run_pipeline(config: &PipelineConfig) -> PipelineResult<PipelineOutput> {
    // Step 1: Load
    log_info(format!("📖 Reading {} (limit {} rows)...", config.input_path.display(), config.row_limit));
    let loaded = load_lei_data(&config.input_path, config.row_limit)?;

    // Step 2: Reshape
    log_info("🔄 Reshaping to LEI_DATA layout...");
    let table = reshape_lei_data(&loaded.table, &config.reshape)?;

    let http = config.http_client().map_err(RegistryError::from)?;
    let registry = RegistryClient::new(&config.registry_endpoint)?
        .with_http_client(http.clone())
        .with_polling(config.polling());

    // Step 3: SDMX dataset
    log_info(format!("📦 Building SDMX dataset {}...", config.dsd));
    let dataset = get_sdmx_dataset(
        config.fetch_structure.then_some(&registry),
        &config.dsd,
        table,
        config.output_path.as_deref(),
    )
    .await?;

    // Step 4: Structural validation
    log_info("🏛️  Structural validation...");
    let structural = structural_validation(&registry, &dataset, config.logs_folder.as_deref()).await?;

    // Step 5: Quality validation
    log_info("✔️  VTL validation...");
    let script_registry = if config.script_query.api_endpoint == config.registry_endpoint {
        registry.clone()
    } else {
        RegistryClient::new(&config.script_query.api_endpoint)?
            .with_http_client(http.clone())
            .with_polling(config.polling())
    };
    let engine = RuleEngineClient::new(config.script_query.engine_url()).with_http_client(http);
    let quality = quality_validation(
        &script_registry,
        &engine,
        &config.script_query,
        &dataset,
        config.logs_folder.as_deref(),
    )
    .await?;

    log_success("✨ Pipeline finished");

    Ok(PipelineOutput {
        csv_info: CsvInfo {
            encoding: loaded.encoding,
            delimiter: loaded.delimiter,
            rows_read: loaded.table.len(),
            rows_kept: dataset.table.len(),
        },
        dataset,
        structural,
        quality,
    })
}

/// Offline part of the pipeline: load, reshape, write SDMX-CSV.
///
/// The dataset is not bound to the DSD components (no registry call).
pub fn convert(config: &PipelineConfig) -> PipelineResult<Dataset> {
    let loaded = load_lei_data(&config.input_path, config.row_limit)?;
    let table = reshape_lei_data(&loaded.table, &config.reshape)?;
    let dataset = Dataset::new(config.dsd.clone(), Vec::new(), table);

    if let Some(ref path) = config.output_path {
        write_sdmx_csv(&dataset, path)?;
        log_success(format!("SDMX dataset saved to {}", path.display()));
    }
    Ok(dataset)
}

/// Stage 1: read at most `row_limit` rows.
pub fn load_lei_data(path: &Path, row_limit: usize) -> PipelineResult<LoadResult> {
    let loaded = load_csv(path, row_limit)?;
    log_success(format!("Detected encoding: {}", loaded.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(loaded.delimiter)));
    log_success(format!("Read {} rows, {} columns", loaded.table.len(), loaded.table.headers.len()));
    Ok(loaded)
}

/// Stage 2: rename/select the target columns and filter by status.
pub fn reshape_lei_data(raw: &Table, options: &ReshapeOptions) -> PipelineResult<Table> {
    let table = reshape(raw, options)?;
    if options.active_only && table.len() < raw.len() {
        log_info(format!("Dropped {} non-active entities", raw.len() - table.len()));
    }
    log_success(format!("{} rows × {} columns", table.len(), table.headers.len()));
    Ok(table)
}

/// Stage 3: bind the table to the DSD and optionally write it as SDMX-CSV.
///
/// With a registry the DSD components are fetched and the table is checked
/// against them; mismatches are warnings, the registry has the final word
/// during structural validation.
pub async fn get_sdmx_dataset(
    registry: Option<&RegistryClient>,
    dsd: &StructureRef,
    table: Table,
    output_path: Option<&Path>,
) -> PipelineResult<Dataset> {
    let components = match registry {
        Some(client) => {
            let components = client.get_data_structure(dsd).await?;
            log_success(format!("{} components in {}", components.len(), dsd));
            components
        }
        None => {
            log_info("(structure fetch skipped)");
            Vec::new()
        }
    };

    let dataset = Dataset::new(dsd.clone(), components, table);

    let undeclared = dataset.undeclared_columns();
    if !undeclared.is_empty() {
        log_warning(format!("Columns not declared in {}: {}", dsd, undeclared.join(", ")));
    }
    let missing = dataset.missing_mandatory();
    if !missing.is_empty() {
        log_warning(format!("Mandatory components missing: {}", missing.join(", ")));
    }

    if let Some(path) = output_path {
        write_sdmx_csv(&dataset, path)?;
        log_success(format!("SDMX dataset saved to {}", path.display()));
    }

    Ok(dataset)
}

/// Format delimiter for display
fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}
