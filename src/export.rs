//! Spreadsheet export of the current filtered and sorted view.

use log::info;
use rust_xlsxwriter::{Workbook, Worksheet};
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ExportError;
use crate::record::{Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xlsx" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unsupported export format '{}'", other)),
        }
    }
}

/// Header row plus one row of cells per record.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Lay records out as a table.
///
/// Columns follow the first record's field order; fields that only appear on
/// later records are appended in order of first appearance. An empty input
/// produces a header-only table from `fallback_columns`.
pub fn tabulate(records: &[&Record], fallback_columns: &[&str]) -> ExportTable {
    let mut headers: Vec<String> = Vec::new();
    for record in records {
        for name in record.field_names() {
            if !headers.iter().any(|h| h == name) {
                headers.push(name.to_string());
            }
        }
    }
    if records.is_empty() {
        headers = fallback_columns.iter().map(|c| c.to_string()).collect();
    }

    let rows = records
        .iter()
        .map(|record| {
            headers
                .iter()
                .map(|h| record.get(h).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    ExportTable { headers, rows }
}

/// Downloadable export bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Encode the table as an XLSX workbook with a single sheet.
pub fn to_xlsx(table: &ExportTable, sheet_name: &str) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    worksheet.set_name(sheet_name)?;

    for (c, header) in table.headers.iter().enumerate() {
        worksheet.write_string(0, c as u16, header.as_str())?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, value) in row.iter().enumerate() {
            let c = c as u16;
            match value {
                Value::Text(s) => {
                    worksheet.write_string(r, c, s.as_str())?;
                }
                Value::Number(n) if n.is_finite() => {
                    worksheet.write_number(r, c, *n)?;
                }
                Value::Number(n) => {
                    worksheet.write_string(r, c, &n.to_string())?;
                }
                Value::Null => {}
            }
        }
    }

    workbook.push_worksheet(worksheet);
    Ok(workbook.save_to_buffer()?)
}

/// Encode the table as CSV, quoting fields that contain commas, quotes or
/// line breaks.
pub fn to_csv(table: &ExportTable) -> String {
    let mut csv_content = String::new();

    push_csv_line(&mut csv_content, table.headers.iter().map(String::as_str));
    for row in &table.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|v| match v {
                Value::Text(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Null => String::new(),
            })
            .collect();
        push_csv_line(&mut csv_content, cells.iter().map(String::as_str));
    }

    csv_content
}

fn push_csv_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    for (i, value) in cells.enumerate() {
        if i > 0 {
            out.push(',');
        }
        if value.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&value.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(value);
        }
    }
    out.push('\n');
}

pub fn render(
    table: &ExportTable,
    format: ExportFormat,
    sheet_name: &str,
    file_stem: &str,
) -> Result<Artifact, ExportError> {
    let bytes = match format {
        ExportFormat::Xlsx => to_xlsx(table, sheet_name)?,
        ExportFormat::Csv => to_csv(table).into_bytes(),
    };
    Ok(Artifact {
        file_name: format!("{}.{}", file_stem, format.extension()),
        content_type: format.content_type(),
        bytes,
    })
}

/// Write an artifact into `dir`.
///
/// Bytes go to a temporary file in the same directory first and are renamed
/// into place, so a failed write leaves no partial file behind.
pub fn write_artifact(artifact: &Artifact, dir: &Path) -> Result<PathBuf, ExportError> {
    let target = dir.join(&artifact.file_name);
    let io_err = |source| ExportError::Io {
        path: target.clone(),
        source,
    };

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(&artifact.bytes).map_err(io_err)?;
    tmp.flush().map_err(io_err)?;
    tmp.persist(&target).map_err(|e| io_err(e.error))?;

    info!("wrote {} ({} bytes)", target.display(), artifact.bytes.len());
    Ok(target)
}
