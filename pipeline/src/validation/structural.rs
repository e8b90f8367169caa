//! Structural validation against the registry.

use std::path::Path;

use crate::error::{OutputError, PipelineResult};
use crate::logs::{log_info, log_success, log_warning};
use crate::models::{Dataset, StructuralReport};
use crate::registry::{CsvDelimiter, RegistryClient};
use crate::sdmx::to_sdmx_csv;
use crate::sdmx::writer::write_text;

/// Diagnostics log written into the logs folder.
pub const STRUCTURAL_LOG_FILE: &str = "structural_validation_logs.json";

/// Upload the dataset as SDMX-CSV and collect the registry's diagnostics.
///
/// When `logs_folder` is given the raw report is written to
/// [`STRUCTURAL_LOG_FILE`] (`[]` for a valid dataset).
pub async fn structural_validation(
    client: &RegistryClient,
    dataset: &Dataset,
    logs_folder: Option<&Path>,
) -> PipelineResult<StructuralReport> {
    let csv_text = to_sdmx_csv(dataset)?;
    log_info(format!("Uploading {} rows to {}", dataset.table.len(), client.base_url()));

    let report = client.validate_data(&csv_text, CsvDelimiter::Comma).await?;

    if report.is_valid() {
        log_success("Dataset is structurally valid");
    } else {
        log_warning(format!("{} structural diagnostic(s)", report.diagnostics.len()));
        for d in report.diagnostics.iter().take(5) {
            log_warning(format!("[{}] {}: {}", d.code, d.kind, d.message));
        }
    }

    if let Some(folder) = logs_folder {
        let path = folder.join(STRUCTURAL_LOG_FILE);
        let json = serde_json::to_string_pretty(&report.raw).map_err(OutputError::from)?;
        write_text(&path, &json)?;
        log_info(format!("Diagnostics written to {}", path.display()));
    }

    Ok(report)
}
