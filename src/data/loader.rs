use std::str;

use thiserror::Error;

use super::model::{CellValue, ColumnType, DataTable};
use super::validate::normalize_column_names;

// ---------------------------------------------------------------------------
// Ingestion errors
// ---------------------------------------------------------------------------

/// Hard ingestion failures. Recoverable validation problems are reported
/// through [`super::validate::CheckResult`] instead and never reach here.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The upload is not decodable text. Callers must catch this kind
    /// separately to show an actionable encoding message.
    #[error("file is not valid UTF-8 text: {0}")]
    Encoding(#[from] str::Utf8Error),

    #[error("CSV content is empty")]
    EmptyContent,

    #[error("CSV has a header but no data rows")]
    NoRows,

    #[error("invalid CSV structure: {0}")]
    Malformed(#[from] csv::Error),
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode an uploaded byte stream. The ingestion format is UTF-8
/// delimited text; anything else is an encoding error, distinct from a
/// parse failure.
pub fn decode_upload(bytes: &[u8]) -> Result<&str, IngestError> {
    Ok(str::from_utf8(bytes)?)
}

// ---------------------------------------------------------------------------
// CSV parsing with column type inference
// ---------------------------------------------------------------------------

/// Tokens treated as a missing cell before type inference.
const NA_TOKENS: &[&str] = &["", "na", "n/a", "nan", "null", "none"];

/// Parse delimited text with a header row into a [`DataTable`].
///
/// Column names are normalized (lowercase snake_case) and column types
/// inferred from the cells: integer, then float, then boolean, falling
/// back to text. Empty cells and NA tokens become [`CellValue::Null`],
/// not the literal empty string.
///
/// Errors on empty content, missing header, zero data rows, or ragged
/// records.
pub fn parse_csv(content: &str) -> Result<DataTable, IngestError> {
    if content.trim().is_empty() {
        return Err(IngestError::EmptyContent);
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = normalize_column_names(reader.headers()?.iter());

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        raw_rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }
    if raw_rows.is_empty() {
        return Err(IngestError::NoRows);
    }

    let rows = typed_rows(headers.len(), &raw_rows);
    let table = DataTable::from_rows(headers, rows);
    log::debug!(
        "parsed CSV: {} rows, columns {:?}",
        table.len(),
        table.columns
    );
    Ok(table)
}

/// Decide each column's type from its raw cells, then convert. A column
/// is numeric only if every non-missing cell parses; one stray word
/// demotes the whole column to text, mirroring how the source datasets
/// behave under type inference.
fn typed_rows(n_columns: usize, raw_rows: &[Vec<String>]) -> Vec<Vec<CellValue>> {
    let types: Vec<ColumnType> = (0..n_columns)
        .map(|i| {
            let cells = raw_rows.iter().map(|row| row[i].as_str());
            infer_column_type(cells)
        })
        .collect();

    raw_rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(&types)
                .map(|(cell, ty)| convert_cell(cell, *ty))
                .collect()
        })
        .collect()
}

fn is_missing(cell: &str) -> bool {
    NA_TOKENS.contains(&cell.to_ascii_lowercase().as_str())
}

/// Infer one column's type from its raw cells, skipping missing markers.
fn infer_column_type<'a>(cells: impl Iterator<Item = &'a str> + Clone) -> ColumnType {
    let present = || cells.clone().filter(|c| !is_missing(c));
    if present().count() == 0 {
        return ColumnType::Text;
    }
    if present().all(|c| c.parse::<i64>().is_ok()) {
        return ColumnType::Integer;
    }
    if present().all(|c| c.parse::<f64>().is_ok()) {
        return ColumnType::Float;
    }
    if present().all(|c| matches!(c.to_ascii_lowercase().as_str(), "true" | "false")) {
        return ColumnType::Boolean;
    }
    ColumnType::Text
}

fn convert_cell(cell: &str, ty: ColumnType) -> CellValue {
    if is_missing(cell) {
        return CellValue::Null;
    }
    match ty {
        ColumnType::Integer => cell
            .parse::<i64>()
            .map(CellValue::Integer)
            .unwrap_or(CellValue::Null),
        ColumnType::Float => cell
            .parse::<f64>()
            .map(CellValue::Float)
            .unwrap_or(CellValue::Null),
        ColumnType::Boolean => CellValue::Bool(cell.eq_ignore_ascii_case("true")),
        ColumnType::Text => CellValue::Text(cell.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Upload summary
// ---------------------------------------------------------------------------

/// Lightweight summary of an ingested file, for display next to the
/// upload control.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FileInfo {
    pub name: String,
    pub size_bytes: usize,
    pub rows: usize,
    pub columns: usize,
}

pub fn file_info(name: &str, bytes: &[u8], table: &DataTable) -> FileInfo {
    FileInfo {
        name: name.to_string(),
        size_bytes: bytes.len(),
        rows: table.len(),
        columns: table.columns.len(),
    }
}
