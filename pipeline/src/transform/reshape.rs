//! Reshape a raw GLEIF extract into the `MD:LEI_DATA` layout.
//!
//! ```text
//! GLEIF golden copy (200+ columns)         LEI_DATA (8 columns)
//! ┌──────────────────────────────┐        ┌────────────────────────┐
//! │ LEI                          │  ──▶   │ LEI                    │
//! │ Entity.LegalName             │  ──▶   │ LEGAL_NAME             │
//! │ Entity.LegalAddress.Country  │  ──▶   │ COUNTRY_INCORPORATION  │
//! │ ...                          │        │ ...                    │
//! │ Entity.EntityStatus          │  ──▶   │ (row filter, dropped)  │
//! └──────────────────────────────┘        └────────────────────────┘
//! ```
//!
//! Pure and deterministic: no I/O, same input gives the same output.

use serde::{Deserialize, Serialize};

use crate::error::ReshapeError;
use crate::models::Table;

/// Source column → target column, in output order.
pub const RENAME_MAP: [(&str, &str); 9] = [
    ("LEI", "LEI"),
    ("Entity.LegalName", "LEGAL_NAME"),
    ("Entity.LegalAddress.Country", "COUNTRY_INCORPORATION"),
    ("Entity.HeadquartersAddress.Country", "COUNTRY_HEADQUARTERS"),
    ("Entity.EntityCategory", "CATEGORY"),
    ("Entity.EntitySubCategory", "SUBCATEGORY"),
    ("Entity.LegalForm.EntityLegalFormCode", "LEGAL_FORM"),
    ("Entity.EntityStatus", STATUS_COLUMN),
    ("Entity.LegalAddress.PostalCode", "POSTAL_CODE"),
];

/// Target column used to filter rows; never part of the output.
pub const STATUS_COLUMN: &str = "STATUS";

/// Status value kept when filtering.
pub const ACTIVE_STATUS: &str = "ACTIVE";

/// Options for [`reshape`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReshapeOptions {
    /// Keep only entities whose status is `ACTIVE`.
    pub active_only: bool,
}

impl Default for ReshapeOptions {
    fn default() -> Self {
        Self { active_only: true }
    }
}

/// Columns of the reshaped table, in order.
pub fn target_columns() -> Vec<&'static str> {
    RENAME_MAP
        .iter()
        .map(|(_, target)| *target)
        .filter(|target| *target != STATUS_COLUMN)
        .collect()
}

/// Rename/select the GLEIF columns and filter by entity status.
///
/// Every source column of [`RENAME_MAP`] must be present, otherwise all the
/// missing ones are reported together.
pub fn reshape(raw: &Table, options: &ReshapeOptions) -> Result<Table, ReshapeError> {
    let mut indices = Vec::with_capacity(RENAME_MAP.len());
    let mut missing = Vec::new();
    for (source, target) in RENAME_MAP {
        match raw.column_index(source) {
            Some(idx) => indices.push((idx, target)),
            None => missing.push(source.to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(ReshapeError::MissingColumns(missing));
    }

    let status_idx = indices
        .iter()
        .find(|(_, target)| *target == STATUS_COLUMN)
        .map(|(idx, _)| *idx);
    let kept: Vec<usize> = indices
        .iter()
        .filter(|(_, target)| *target != STATUS_COLUMN)
        .map(|(idx, _)| *idx)
        .collect();

    let mut out = Table::new(target_columns().into_iter().map(String::from).collect());
    for row in &raw.rows {
        if options.active_only {
            let status = status_idx.and_then(|i| row.get(i)).map(String::as_str);
            if status != Some(ACTIVE_STATUS) {
                continue;
            }
        }
        out.rows
            .push(kept.iter().map(|&i| row.get(i).cloned().unwrap_or_default()).collect());
    }

    Ok(out)
}

/// Human-readable description of the column mapping.
pub fn mapping_description() -> String {
    let width = RENAME_MAP.iter().map(|(s, _)| s.len()).max().unwrap_or(0);
    let mut out = String::from("GLEIF column → LEI_DATA component\n\n");
    for (source, target) in RENAME_MAP {
        let note = if target == STATUS_COLUMN {
            "  (filter only, not exported)"
        } else {
            ""
        };
        out.push_str(&format!("  {:width$}  → {}{}\n", source, target, note, width = width));
    }
    out
}
