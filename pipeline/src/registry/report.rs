//! Interpretation of FMR `loadStatus` responses.

use serde_json::Value;

use super::{STATUS_COMPLETE, STATUS_ERRORS, STATUS_IN_PROCESS};
use crate::error::{RegistryError, RegistryResult};
use crate::models::{Diagnostic, StructuralReport, StructuralStatus};

/// Turn a `loadStatus` body into a report.
///
/// Returns `Ok(None)` while the load is still in process.
pub fn parse_load_status(json: &Value) -> RegistryResult<Option<StructuralReport>> {
    let status = json
        .get("Status")
        .and_then(Value::as_str)
        .ok_or_else(|| RegistryError::InvalidResponse("Status not found in response".to_string()))?;

    if STATUS_IN_PROCESS.contains(&status) {
        return Ok(None);
    }
    if STATUS_ERRORS.contains(&status) {
        return Err(RegistryError::Rejected {
            status: status.to_string(),
            body: json.to_string(),
        });
    }
    if status != STATUS_COMPLETE {
        return Err(RegistryError::InvalidResponse(format!("unknown load status '{}'", status)));
    }

    let dataset = json
        .get("Datasets")
        .and_then(|d| d.get(0))
        .ok_or_else(|| RegistryError::InvalidResponse("no Datasets in completed load".to_string()))?;

    let has_errors = dataset.get("Errors").and_then(Value::as_bool).unwrap_or(false);
    if !has_errors {
        return Ok(Some(StructuralReport::valid()));
    }

    let raw = dataset
        .get("ValidationReport")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    Ok(Some(StructuralReport {
        status: StructuralStatus::Invalid,
        diagnostics: diagnostics(&raw),
        raw,
    }))
}

/// Flatten report sections (`{"Type": .., "Errors": [..]}`) into diagnostics.
fn diagnostics(report: &[Value]) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for section in report {
        let kind = text(section, &["Type"]).unwrap_or_default();
        match section.get("Errors").and_then(Value::as_array) {
            Some(errors) => out.extend(errors.iter().map(|e| diagnostic(&kind, e))),
            None => out.push(diagnostic(&kind, section)),
        }
    }
    out
}

fn diagnostic(kind: &str, error: &Value) -> Diagnostic {
    Diagnostic {
        kind: kind.to_string(),
        code: text(error, &["ErrorCode", "Code"]).unwrap_or_default(),
        severity: text(error, &["Severity"]).unwrap_or_else(|| "Error".to_string()),
        message: text(error, &["Message", "ErrorMessage"]).unwrap_or_default(),
        location: error
            .get("Position")
            .or_else(|| error.get("Location"))
            .filter(|v| !v.is_null())
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
    }
}

fn text(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match value.get(*k) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
