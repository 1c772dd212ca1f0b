use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use csv::ReaderBuilder;

use crate::error::RetrieverError;

pub const DEFAULT_ACCESSION_COLUMN: &str = "NCBI_SRA_number";
pub const PREFERRED_SHEET: &str = "Metadata";

/// Reads the non-empty cells of `column` from a workbook or a delimited table.
///
/// Workbooks use `sheet` when given, else the `Metadata` sheet when present,
/// else the first sheet. Delimited files ignore `sheet`.
pub fn read_accession_column(
    path: &Path,
    sheet: Option<&str>,
    column: &str,
) -> Result<Vec<String>, RetrieverError> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => read_delimited(path, b',', column),
        "tsv" | "tab" | "txt" => read_delimited(path, b'\t', column),
        _ => read_workbook(path, sheet, column),
    }
}

fn read_delimited(path: &Path, delimiter: u8, column: &str) -> Result<Vec<String>, RetrieverError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(|err| RetrieverError::Spreadsheet(format!("{}: {err}", path.display())))?;

    let headers = reader
        .headers()
        .map_err(|err| RetrieverError::Spreadsheet(err.to_string()))?
        .clone();
    let index = headers
        .iter()
        .position(|header| header.trim() == column)
        .ok_or_else(|| RetrieverError::MissingColumn {
            column: column.to_string(),
            source_name: path.display().to_string(),
        })?;

    let mut values = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| RetrieverError::Spreadsheet(err.to_string()))?;
        if let Some(value) = record.get(index).map(str::trim).filter(|v| !v.is_empty()) {
            values.push(value.to_string());
        }
    }
    Ok(values)
}

fn read_workbook(
    path: &Path,
    sheet: Option<&str>,
    column: &str,
) -> Result<Vec<String>, RetrieverError> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|err| RetrieverError::Spreadsheet(format!("{}: {err}", path.display())))?;
    let sheet_names = workbook.sheet_names();
    let sheet_name = select_sheet(&sheet_names, sheet)?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|err| RetrieverError::Spreadsheet(err.to_string()))?;

    let mut rows = range.rows();
    let header = rows.next().ok_or_else(|| RetrieverError::MissingColumn {
        column: column.to_string(),
        source_name: format!("{} (sheet {sheet_name})", path.display()),
    })?;
    let index = header
        .iter()
        .position(|cell| cell_text(cell) == column)
        .ok_or_else(|| RetrieverError::MissingColumn {
            column: column.to_string(),
            source_name: format!("{} (sheet {sheet_name})", path.display()),
        })?;

    Ok(rows
        .filter_map(|row| row.get(index))
        .map(cell_text)
        .filter(|value| !value.is_empty())
        .collect())
}

pub(crate) fn select_sheet(names: &[String], requested: Option<&str>) -> Result<String, RetrieverError> {
    if let Some(requested) = requested {
        return names
            .iter()
            .find(|name| name.as_str() == requested)
            .cloned()
            .ok_or_else(|| RetrieverError::MissingSheet(requested.to_string()));
    }
    names
        .iter()
        .find(|name| name.as_str() == PREFERRED_SHEET)
        .or_else(|| names.first())
        .cloned()
        .ok_or_else(|| RetrieverError::MissingSheet(PREFERRED_SHEET.to_string()))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(value) => value.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn prefers_metadata_sheet() {
        let names = vec!["Sheet1".to_string(), "Metadata".to_string()];
        assert_eq!(select_sheet(&names, None).unwrap(), "Metadata");
        assert_eq!(select_sheet(&names, Some("Sheet1")).unwrap(), "Sheet1");
        assert_matches!(
            select_sheet(&names, Some("Runs")),
            Err(RetrieverError::MissingSheet(_))
        );
    }

    #[test]
    fn falls_back_to_first_sheet() {
        let names = vec!["Samples".to_string(), "Notes".to_string()];
        assert_eq!(select_sheet(&names, None).unwrap(), "Samples");
        assert!(select_sheet(&[], None).is_err());
    }
}
