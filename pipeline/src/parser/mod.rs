//! CSV loader with encoding and delimiter auto-detection.
//!
//! Reads a bounded number of rows of a GLEIF extract into a [`Table`].
//! Values are kept as strings, exactly as they appear in the file.
//!
//! Only a prefix of the input is held in memory for detection; the rows are
//! streamed and reading stops at the row limit, so a multi-GB golden copy
//! costs no more than its first rows.

pub mod decode;

use encoding_rs::Encoding;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

pub use decode::DecodingReader;

use crate::error::{CsvError, CsvResult};
use crate::models::Table;

/// Default maximum number of data rows read from the source file.
pub const DEFAULT_ROW_LIMIT: usize = 10_000;

/// Bytes inspected to detect encoding and delimiter.
pub const SNIFF_BYTES: usize = 64 * 1024;

/// Loaded table plus what was detected while reading it.
#[derive(Debug, Clone)]
pub struct LoadResult {
    pub table: Table,
    /// Detected encoding
    pub encoding: String,
    /// Detected delimiter
    pub delimiter: char,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decoder for a detected encoding name.
///
/// Latin-1 labels map to windows-1252, as in the WHATWG encoding standard.
/// Unknown names fall back to UTF-8.
pub fn encoding_for(name: &str) -> &'static Encoding {
    match name.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252,
        other => Encoding::for_label(other.as_bytes()).unwrap_or(encoding_rs::UTF_8),
    }
}

/// Decode bytes to a string, dropping a leading BOM.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let (decoded, _, _) = encoding_for(encoding).decode(bytes);

    decoded.trim_start_matches('\u{feff}').to_string()
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text into a table, keeping at most `row_limit` data rows.
///
/// Quoted fields are honoured and blank lines are skipped. Every row must
/// have as many fields as the header.
///
/// # Example
/// ```ignore
/// let table = parse_table("LEI,Entity.LegalName\nX,\"Acme, Inc.\"", ',', 10)?;
/// assert_eq!(table.cell(0, "Entity.LegalName"), Some("Acme, Inc."));
/// ```
pub fn parse_table(content: &str, delimiter: char, row_limit: usize) -> CsvResult<Table> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }
    read_table(content.as_bytes(), delimiter, row_limit)
}

/// Read UTF-8 CSV from a stream, stopping after `row_limit` data rows.
fn read_table<R: Read>(source: R, delimiter: char, row_limit: usize) -> CsvResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(source);

    let headers: Vec<String> = reader
        .headers()
        .map_err(CsvError::from_csv)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut table = Table::new(headers);
    for record in reader.records().take(row_limit) {
        let record = record.map_err(CsvError::from_csv)?;
        table.rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(table)
}

/// Load CSV from any byte stream with auto-detection of encoding and
/// delimiter. At most [`SNIFF_BYTES`] plus the bytes behind `row_limit`
/// rows are read.
pub fn load_reader<R: Read>(mut source: R, row_limit: usize) -> CsvResult<LoadResult> {
    let mut prefix = Vec::with_capacity(SNIFF_BYTES);
    (&mut source)
        .take(SNIFF_BYTES as u64)
        .read_to_end(&mut prefix)
        .map_err(CsvError::Read)?;

    // Cut at the last line break so no character is split
    let sniff = match prefix.iter().rposition(|&b| b == b'\n') {
        Some(end) if prefix.len() == SNIFF_BYTES => &prefix[..end],
        _ => &prefix[..],
    };
    let encoding = detect_encoding(sniff);
    let content = decode_content(sniff, &encoding);
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile);
    }
    let delimiter = detect_delimiter(&content);

    let stream = DecodingReader::new(Cursor::new(prefix).chain(source), encoding_for(&encoding));
    let table = read_table(stream, delimiter, row_limit)?;

    Ok(LoadResult {
        table,
        encoding,
        delimiter,
    })
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn load_bytes(bytes: &[u8], row_limit: usize) -> CsvResult<LoadResult> {
    load_reader(bytes, row_limit)
}

/// Load a CSV file, stopping after `row_limit` data rows.
pub fn load_csv<P: AsRef<Path>>(path: P, row_limit: usize) -> CsvResult<LoadResult> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| CsvError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    load_reader(BufReader::new(file), row_limit)
}
