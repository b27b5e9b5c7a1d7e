//! Tabular input: a header row plus string cells, loaded from delimited text files or
//! from the first worksheet of a spreadsheet.

use calamine::{open_workbook_auto, Data, Reader};
use encoding_rs::WINDOWS_1252;
use std::fs;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{Result, TriageError};
use crate::TARGET_CLASSIFIER;

/// One row viewed through the configured identifier and text columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub id: &'a str,
    pub text: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Load a spreadsheet (`.xlsx`, `.xlsm`, `.xls`, `.ods`) or a delimited text file.
    /// `delimiter` overrides detection from the extension and the header line and is ignored
    /// for spreadsheets.
    pub fn from_path(path: &Path, delimiter: Option<u8>) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .unwrap_or_default();

        let dataset = if matches!(extension.as_str(), "xlsx" | "xlsm" | "xls" | "ods") {
            Self::from_spreadsheet(path)?
        } else {
            let content = read_text(path)?;
            let delimiter = delimiter.unwrap_or_else(|| match extension.as_str() {
                "tsv" => b'\t',
                _ => detect_delimiter(&content),
            });
            Self::from_reader(content.as_bytes(), delimiter)?
        };

        info!(
            target: TARGET_CLASSIFIER,
            "Loaded {} rows with columns [{}] from {}",
            dataset.len(),
            dataset.headers.join(", "),
            path.display()
        );
        Ok(dataset)
    }

    /// First worksheet, first row as headers. Every cell is rendered as text; empty cells
    /// read as `""` and whole numbers lose their `.0`.
    pub fn from_spreadsheet(path: &Path) -> Result<Self> {
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook.worksheet_range_at(0).ok_or_else(|| {
            TriageError::Dataset(format!("{} has no worksheets", path.display()))
        })??;

        let mut rows = range.rows();
        let headers = match rows.next() {
            Some(header_row) => header_row
                .iter()
                .map(|cell| cell_to_string(cell).trim().to_string())
                .collect(),
            None => Vec::new(),
        };
        let rows = rows
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();

        Ok(Self { headers, rows })
    }

    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(reader);

        let headers = reader
            .headers()?
            .iter()
            .map(|header| header.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(String::from).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, field: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|header| header == field)
            .ok_or_else(|| TriageError::MissingField {
                field: field.to_string(),
                available: self.headers.clone(),
            })
    }

    /// Every row as a [`Record`]; missing trailing cells read as empty text.
    pub fn records(&self, text_field: &str, id_field: &str) -> Result<Vec<Record<'_>>> {
        let text_index = self.column_index(text_field)?;
        let id_index = self.column_index(id_field)?;

        Ok(self
            .rows
            .iter()
            .map(|row| Record {
                id: row.get(id_index).map(String::as_str).unwrap_or(""),
                text: row.get(text_index).map(String::as_str).unwrap_or(""),
            })
            .collect())
    }
}

/// UTF-8 text, falling back to Windows-1252 (the usual encoding of spreadsheet CSV
/// exports on Brazilian Windows machines).
fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(content) => Ok(content),
        Err(e) => {
            warn!(
                target: TARGET_CLASSIFIER,
                "{} is not valid UTF-8, decoding as Windows-1252",
                path.display()
            );
            let (content, _) = WINDOWS_1252.decode_without_bom_handling(e.as_bytes());
            Ok(content.into_owned())
        }
    }
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

/// `;` when the header line has more semicolons than commas, `,` otherwise.
fn detect_delimiter(content: &str) -> u8 {
    let header_line = content.lines().next().unwrap_or("");
    let semicolons = header_line.matches(';').count();
    let commas = header_line.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}
