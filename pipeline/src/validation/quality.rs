//! VTL data-quality validation.
//!
//! The transformation scheme is read from the registry, turned into a VTL
//! program and sent to the rule engine together with the dataset:
//!
//! ```text
//! POST {engine}
//! {
//!   "script": "invalid_country <- check(...);",
//!   "scriptRef": "MD:LEI_VALIDATIONS(1.0)",
//!   "datasets": [{ "name": "LEI_DATA", "structure": "MD:LEI_DATA(1.0)", "data": "<SDMX-CSV>" }],
//!   "returnOnlyPersistent": true
//! }
//! ```
//!
//! The engine answers `{"results": {"<name>": {"columns": [..], "rows": [[..]]}}}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::error::{PipelineResult, RuleEngineError, RuleEngineResult};
use crate::logs::{log_info, log_success, log_warning};
use crate::models::{Dataset, QualityReport, ScriptQuery, Table};
use crate::registry::RegistryClient;
use crate::sdmx::{to_sdmx_csv, write_table_csv, TransformationScheme};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunRequest<'a> {
    script: String,
    script_ref: String,
    datasets: Vec<DatasetPayload<'a>>,
    return_only_persistent: bool,
}

#[derive(Debug, Serialize)]
struct DatasetPayload<'a> {
    name: &'a str,
    structure: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    results: BTreeMap<String, ResultPayload>,
}

#[derive(Debug, Deserialize)]
struct ResultPayload {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct EngineError {
    error: String,
}

/// Rule engine client
#[derive(Clone)]
pub struct RuleEngineClient {
    url: String,
    http: reqwest::Client,
}

impl RuleEngineClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Run a scheme against a dataset and return the result tables by name.
    ///
    /// `sdmx_csv` is the dataset already serialized with
    /// [`crate::sdmx::to_sdmx_csv`].
    pub async fn run(
        &self,
        scheme: &TransformationScheme,
        dataset: &Dataset,
        sdmx_csv: String,
    ) -> RuleEngineResult<BTreeMap<String, Table>> {
        let request = RunRequest {
            script: scheme.program(),
            script_ref: scheme.reference.short_urn(),
            datasets: vec![DatasetPayload {
                name: &dataset.structure.id,
                structure: dataset.structure.short_urn(),
                data: sdmx_csv,
            }],
            return_only_persistent: true,
        };

        let response = self.http.post(&self.url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if let Ok(err) = serde_json::from_str::<EngineError>(&body) {
                return Err(RuleEngineError::Status {
                    status: status.as_u16(),
                    body: err.error,
                });
            }
            return Err(RuleEngineError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RunResponse =
            serde_json::from_str(&body).map_err(|e| RuleEngineError::InvalidResponse(e.to_string()))?;

        let persistent = scheme.persistent_results();
        let mut results = BTreeMap::new();
        for (name, payload) in parsed.results {
            if !persistent.is_empty() && !persistent.contains(&name.as_str()) {
                continue;
            }
            results.insert(name, into_table(payload)?);
        }
        Ok(results)
    }
}

fn into_table(payload: ResultPayload) -> RuleEngineResult<Table> {
    let width = payload.columns.len();
    let mut rows = Vec::with_capacity(payload.rows.len());
    for row in payload.rows {
        if row.len() != width {
            return Err(RuleEngineError::InvalidResponse(format!(
                "result row has {} cells, expected {}",
                row.len(),
                width
            )));
        }
        rows.push(row.into_iter().map(cell_text).collect());
    }
    Ok(Table::with_rows(payload.columns, rows))
}

fn cell_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// File name of the CSV written for a rule result: `{rule}_logs.csv`.
///
/// Characters that are unsafe in file names are replaced by `_`.
pub fn rule_log_file_name(rule: &str) -> String {
    format!("{}_logs.csv", log_file_stem(rule))
}

fn log_file_stem(rule: &str) -> String {
    let stem: String = rule
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect();
    let stem = stem.trim_start_matches('.');
    if stem.is_empty() { "result".to_string() } else { stem.to_string() }
}

/// Log file names for a set of rules, in iteration order.
///
/// Names that sanitize to the same file get a `_2`, `_3`, ... suffix.
pub fn rule_log_file_names<'a, I>(rules: I) -> Vec<(&'a str, String)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut used = HashSet::new();
    let mut out = Vec::new();
    for rule in rules {
        let stem = log_file_stem(rule);
        let mut file = format!("{}_logs.csv", stem);
        let mut n = 2;
        while used.contains(&file) {
            file = format!("{}_{}_logs.csv", stem, n);
            n += 1;
        }
        used.insert(file.clone());
        out.push((rule, file));
    }
    out
}

/// Fetch the scheme named by `query`, run it and write one CSV per result.
pub async fn quality_validation(
    registry: &RegistryClient,
    engine: &RuleEngineClient,
    query: &ScriptQuery,
    dataset: &Dataset,
    logs_folder: Option<&Path>,
) -> PipelineResult<QualityReport> {
    let scheme_ref = query.scheme_ref();
    log_info(format!("Fetching transformation scheme {}", scheme_ref));
    let scheme = registry
        .get_transformation_scheme(&scheme_ref)
        .await
        .map_err(RuleEngineError::from)?;
    if scheme.transformations.is_empty() {
        return Err(RuleEngineError::EmptyScheme(scheme_ref.short_urn()).into());
    }
    log_success(format!("{} transformation(s)", scheme.transformations.len()));

    let data = to_sdmx_csv(dataset)?;
    log_info(format!("Running VTL script on {}", engine.url()));
    let results = engine.run(&scheme, dataset, data).await?;

    let report = QualityReport {
        scheme: scheme.reference.clone(),
        results,
    };

    let flagged = report.rules_with_rows();
    if flagged.is_empty() {
        log_success(format!("{} result(s), all empty", report.results.len()));
    } else {
        log_warning(format!("{} of {} result(s) have rows: {}", flagged.len(), report.results.len(), flagged.join(", ")));
    }

    if let Some(folder) = logs_folder {
        for (name, file) in rule_log_file_names(report.results.keys().map(String::as_str)) {
            if file != rule_log_file_name(name) {
                log_warning(format!("Result '{}' written to {} (name clash)", name, file));
            }
            if let Some(table) = report.results.get(name) {
                write_table_csv(table, &folder.join(file))?;
            }
        }
        log_info(format!("{} rule log(s) written to {}", report.results.len(), folder.display()));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_log_file_name() {
        assert_eq!(rule_log_file_name("invalid_country"), "invalid_country_logs.csv");
        assert_eq!(rule_log_file_name("a/b c"), "a_b_c_logs.csv");
        assert_eq!(rule_log_file_name("../etc"), "_etc_logs.csv");
        assert_eq!(rule_log_file_name(""), "result_logs.csv");
    }

    #[test]
    fn test_clashing_rule_names_get_distinct_files() {
        let names = rule_log_file_names(["a/b", "a_b", "a b", "other"]);
        assert_eq!(
            names,
            vec![
                ("a/b", "a_b_logs.csv".to_string()),
                ("a_b", "a_b_2_logs.csv".to_string()),
                ("a b", "a_b_3_logs.csv".to_string()),
                ("other", "other_logs.csv".to_string()),
            ]
        );
    }

    #[test]
    fn test_into_table_converts_cells() {
        let payload: ResultPayload = serde_json::from_value(json!({
            "columns": ["LEI", "bool_var", "errorcode"],
            "rows": [["X1", false, null], ["X2", false, 12]]
        }))
        .unwrap();

        let table = into_table(payload).unwrap();
        assert_eq!(table.rows[0], vec!["X1", "false", ""]);
        assert_eq!(table.cell(1, "errorcode"), Some("12"));
    }

    #[test]
    fn test_into_table_rejects_ragged_rows() {
        let payload: ResultPayload = serde_json::from_value(json!({
            "columns": ["LEI", "bool_var"],
            "rows": [["X1"]]
        }))
        .unwrap();
        assert!(matches!(into_table(payload), Err(RuleEngineError::InvalidResponse(_))));
    }
}
