//! Domain models for the LEI → SDMX pipeline.
//!
//! - [`Table`] - Header + string rows, used for every tabular artifact
//! - [`StructureRef`] - `AGENCY:ID(VERSION)` reference to a registry artefact
//! - [`ScriptQuery`] - Where to find a VTL transformation scheme and its engine
//! - [`Dataset`] - Reshaped table bound to its data structure definition
//! - [`StructuralReport`] / [`QualityReport`] - Outcomes of the two validations

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Table
// =============================================================================

/// In-memory table. Cells are kept as the strings found in the source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Column names, in order.
    pub headers: Vec<String>,
    /// Rows, each with exactly `headers.len()` cells.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// All values of a column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }

    /// Single cell lookup.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx).map(String::as_str)
    }
}

// =============================================================================
// Structure references
// =============================================================================

/// Maintainable artefact reference: agency, id and version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructureRef {
    pub agency: String,
    pub id: String,
    pub version: String,
}

impl StructureRef {
    pub fn new(agency: impl Into<String>, id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            agency: agency.into(),
            id: id.into(),
            version: version.into(),
        }
    }

    /// Short URN as used in SDMX-CSV: `MD:LEI_DATA(1.0)`.
    pub fn short_urn(&self) -> String {
        format!("{}:{}({})", self.agency, self.id, self.version)
    }
}

impl Default for StructureRef {
    fn default() -> Self {
        Self::new("MD", "LEI_DATA", "1.0")
    }
}

impl fmt::Display for StructureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_urn())
    }
}

/// Reference to a VTL transformation scheme plus the services to use it with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptQuery {
    pub id: String,
    pub agency: String,
    pub version: String,
    /// Registry SDMX REST endpoint holding the transformation scheme.
    pub api_endpoint: String,
    /// Rule engine URL. Defaults to `{api_endpoint}/vtl/run`.
    #[serde(default)]
    pub engine_endpoint: Option<String>,
}

impl ScriptQuery {
    pub fn scheme_ref(&self) -> StructureRef {
        StructureRef::new(&self.agency, &self.id, &self.version)
    }

    pub fn engine_url(&self) -> String {
        match self.engine_endpoint {
            Some(ref url) => url.clone(),
            None => format!("{}/vtl/run", self.api_endpoint.trim_end_matches('/')),
        }
    }
}

// =============================================================================
// SDMX dataset
// =============================================================================

/// Role of a component inside a data structure definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentRole {
    Dimension,
    Attribute,
    Measure,
}

/// One DSD component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub role: ComponentRole,
    /// Dimensions are always mandatory; attributes and measures may be optional.
    pub mandatory: bool,
}

/// Reshaped table bound to a data structure definition.
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub structure: StructureRef,
    /// Components declared by the DSD. Empty when the DSD was not fetched.
    pub components: Vec<Component>,
    pub table: Table,
}

impl Dataset {
    pub fn new(structure: StructureRef, components: Vec<Component>, table: Table) -> Self {
        Self {
            structure,
            components,
            table,
        }
    }

    /// Table columns the DSD does not declare.
    pub fn undeclared_columns(&self) -> Vec<&str> {
        if self.components.is_empty() {
            return Vec::new();
        }
        self.table
            .headers
            .iter()
            .filter(|h| !self.components.iter().any(|c| &c.id == *h))
            .map(String::as_str)
            .collect()
    }

    /// Mandatory DSD components absent from the table.
    pub fn missing_mandatory(&self) -> Vec<&str> {
        self.components
            .iter()
            .filter(|c| c.mandatory && self.table.column_index(&c.id).is_none())
            .map(|c| c.id.as_str())
            .collect()
    }
}

// =============================================================================
// Validation outcomes
// =============================================================================

/// One structural diagnostic reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Report section (e.g. `MandatoryAttributes`, `Codelist`).
    pub kind: String,
    pub code: String,
    pub severity: String,
    pub message: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuralStatus {
    Valid,
    Invalid,
}

/// Outcome of the structural validation. `Invalid` is a normal result.
#[derive(Debug, Clone, Serialize)]
pub struct StructuralReport {
    pub status: StructuralStatus,
    /// Diagnostics in registry order.
    pub diagnostics: Vec<Diagnostic>,
    /// Raw `ValidationReport` array as returned by the registry.
    pub raw: Vec<Value>,
}

impl StructuralReport {
    pub fn valid() -> Self {
        Self {
            status: StructuralStatus::Valid,
            diagnostics: Vec::new(),
            raw: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == StructuralStatus::Valid
    }
}

/// Outcome of the VTL quality validation: one table per persistent result.
#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub scheme: StructureRef,
    pub results: BTreeMap<String, Table>,
}

impl QualityReport {
    /// Rule names whose result table holds at least one row.
    pub fn rules_with_rows(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, table)| !table.is_empty())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn get(&self, rule: &str) -> Option<&Table> {
        self.results.get(rule)
    }
}
