//! SDMX-CSV 2.0 writer.
//!
//! Layout: `STRUCTURE,STRUCTURE_ID,ACTION,<components...>`, one row per
//! observation, every row prefixed with `datastructure`, the short URN of
//! the DSD and the action flag.

use std::fs;
use std::path::Path;

use crate::error::{OutputError, OutputResult};
use crate::models::{Dataset, Table};

pub const STRUCTURE_TYPE: &str = "datastructure";

/// `I` = information (append/replace).
pub const ACTION_INFORMATION: &str = "I";

/// Serialize a dataset as SDMX-CSV 2.0 text.
///
/// When the DSD components are known, declared columns come first in DSD
/// order (dimensions, attributes, measures) and undeclared ones follow in
/// table order.
pub fn to_sdmx_csv(dataset: &Dataset) -> OutputResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let order = column_order(dataset);

    let mut header = vec!["STRUCTURE", "STRUCTURE_ID", "ACTION"];
    header.extend(order.iter().map(|&i| dataset.table.headers[i].as_str()));
    writer.write_record(&header)?;

    let urn = dataset.structure.short_urn();
    for row in &dataset.table.rows {
        let mut record = vec![STRUCTURE_TYPE, urn.as_str(), ACTION_INFORMATION];
        record.extend(order.iter().map(|&i| row.get(i).map(String::as_str).unwrap_or("")));
        writer.write_record(&record)?;
    }

    into_string(writer)
}

/// Table column indices in output order.
fn column_order(dataset: &Dataset) -> Vec<usize> {
    let table = &dataset.table;
    let declared = dataset.components.iter().filter_map(|c| table.column_index(&c.id));
    let mut order: Vec<usize> = Vec::with_capacity(table.headers.len());
    for idx in declared.chain(0..table.headers.len()) {
        if !order.contains(&idx) {
            order.push(idx);
        }
    }
    order
}

/// Write a dataset as SDMX-CSV 2.0, creating parent directories.
pub fn write_sdmx_csv(dataset: &Dataset, path: &Path) -> OutputResult<()> {
    let text = to_sdmx_csv(dataset)?;
    write_text(path, &text)
}

/// Write a plain table (headers + rows, no index column).
pub fn write_table_csv(table: &Table, path: &Path) -> OutputResult<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    let text = into_string(writer)?;
    write_text(path, &text)
}

pub(crate) fn write_text(path: &Path, text: &str) -> OutputResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| OutputError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, text).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn into_string(writer: csv::Writer<Vec<u8>>) -> OutputResult<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| OutputError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
