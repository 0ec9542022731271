// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use crate::error::LoadError;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFormat {
    Csv,
    Xlsx,
}

impl DataFormat {
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        extension.parse()
    }
}

impl FromStr for DataFormat {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "csv" => Ok(DataFormat::Csv),
            "xlsx" => Ok(DataFormat::Xlsx),
            other => Err(LoadError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFormat::Csv => f.write_str("csv"),
            DataFormat::Xlsx => f.write_str("xlsx"),
        }
    }
}

/// Header plus rows of raw cells, every row as wide as the header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    /// Moves the cells into per-column vectors.
    pub fn into_columns(self) -> Vec<(String, Vec<Option<String>>)> {
        let mut columns: Vec<(String, Vec<Option<String>>)> = self
            .headers
            .into_iter()
            .map(|name| (name, Vec::with_capacity(self.rows.len())))
            .collect();
        for row in self.rows {
            for (cell, (_, values)) in row.into_iter().zip(columns.iter_mut()) {
                values.push(cell);
            }
        }
        columns
    }
}

#[derive(Debug)]
pub struct CsvReader {
    delimiter: u8,
    quote_char: u8,
}

impl CsvReader {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            quote_char: b'"',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_quote(mut self, quote_char: u8) -> Self {
        self.quote_char = quote_char;
        self
    }

    /// Parses CSV bytes; UTF-8 first, Latin-1 when the bytes are not valid UTF-8.
    pub fn read_bytes(&self, bytes: &[u8]) -> Result<RawTable, LoadError> {
        let text = decode_text(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .quote(self.quote_char)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut records = reader.records();
        let header_record = loop {
            match records.next() {
                Some(record) => {
                    let record = record?;
                    if !is_blank(&record) {
                        break record;
                    }
                }
                None => return Err(LoadError::EmptyDataset),
            }
        };
        let headers = unique_headers(header_record.iter().map(str::to_string).collect());
        let width = headers.len();

        let mut rows = Vec::new();
        for (offset, record) in records.enumerate() {
            let record = record?;
            if is_blank(&record) {
                continue;
            }
            if record.len() > width {
                return Err(LoadError::RaggedRow {
                    row: offset + 2,
                    expected: width,
                    found: record.len(),
                });
            }
            let mut row: Vec<Option<String>> = record
                .iter()
                .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                .collect();
            row.resize(width, None);
            rows.push(row);
        }
        tracing::debug!(columns = width, rows = rows.len(), "parsed csv");
        Ok(RawTable { headers, rows })
    }
}

impl Default for CsvReader {
    fn default() -> Self {
        Self::new()
    }
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.len() == 1 && record.get(0).is_some_and(str::is_empty)
}

/// Reads the first worksheet of an XLSX workbook.
#[derive(Debug, Default)]
pub struct XlsxReader;

impl XlsxReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_bytes(&self, bytes: &[u8]) -> Result<RawTable, LoadError> {
        use calamine::{open_workbook_from_rs, Reader, Xlsx, XlsxError};

        let mut workbook: Xlsx<Cursor<&[u8]>> = open_workbook_from_rs(Cursor::new(bytes))
            .map_err(|e: XlsxError| LoadError::Spreadsheet(e.to_string()))?;
        let first_sheet = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(LoadError::EmptyDataset)?;
        let range = workbook
            .worksheet_range(&first_sheet)
            .map_err(|e: XlsxError| LoadError::Spreadsheet(e.to_string()))?;
        if range.height() == 0 || range.width() == 0 {
            return Err(LoadError::EmptyDataset);
        }

        let width = range.width();
        let mut raw_rows = range.rows();
        let header_cells = raw_rows.next().ok_or(LoadError::EmptyDataset)?;
        let headers = unique_headers(
            header_cells
                .iter()
                .map(|cell| cell_text(cell).unwrap_or_default())
                .collect(),
        );
        let rows: Vec<Vec<Option<String>>> = raw_rows
            .map(|cells| {
                let mut row: Vec<Option<String>> = cells.iter().map(cell_text).collect();
                row.resize(width, None);
                row
            })
            .collect();
        tracing::debug!(sheet = %first_sheet, columns = width, rows = rows.len(), "parsed xlsx");
        Ok(RawTable { headers, rows })
    }
}

fn cell_text(cell: &calamine::Data) -> Option<String> {
    use calamine::Data;

    match cell {
        Data::String(s) if s.is_empty() => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(f.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => dt.as_datetime().map(|moment| {
            if moment.time() == chrono::NaiveTime::MIN {
                moment.format("%Y-%m-%d").to_string()
            } else {
                moment.format("%Y-%m-%d %H:%M:%S").to_string()
            }
        }),
        Data::Error(_) | Data::Empty => None,
    }
}

/// Decodes text as UTF-8 (leading BOM removed) or, failing that, Latin-1.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let (text, had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(bytes);
    if !had_errors {
        return text;
    }
    tracing::debug!("input is not valid UTF-8, decoding as Latin-1");
    let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
    text
}

/// Makes header names unique: blanks become `Unnamed: {i}`, repeats get `.1`, `.2`, ...
pub fn unique_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(raw.len());
    for (index, name) in raw.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {index}")
        } else {
            name
        };
        let mut candidate = base.clone();
        let mut suffix = 1;
        while seen.contains(&candidate) {
            candidate = format!("{base}.{suffix}");
            suffix += 1;
        }
        seen.insert(candidate.clone());
        names.push(candidate);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_headers() {
        let names = unique_headers(vec![
            "A".into(),
            "A".into(),
            String::new(),
            "A".into(),
        ]);
        assert_eq!(names, vec!["A", "A.1", "Unnamed: 2", "A.2"]);
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = CsvReader::new().read_bytes(b"a,b,c\n1,2\n").unwrap();
        assert_eq!(table.rows, vec![vec![Some("1".into()), Some("2".into()), None]]);
    }

    #[test]
    fn test_long_rows_are_rejected() {
        let err = CsvReader::new().read_bytes(b"a,b\n1,2,3\n").unwrap_err();
        assert!(matches!(
            err,
            LoadError::RaggedRow {
                row: 2,
                expected: 2,
                found: 3
            }
        ));
    }

    #[test]
    fn test_bom_and_latin1() {
        let table = CsvReader::new()
            .read_bytes(b"\xEF\xBB\xBFName\nAlpha\n")
            .unwrap();
        assert_eq!(table.headers, vec!["Name"]);

        let table = CsvReader::new().read_bytes(b"City\nM\xFCnchen\n").unwrap();
        assert_eq!(table.rows[0][0].as_deref(), Some("M\u{fc}nchen"));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            DataFormat::from_path(Path::new("sales.XLSX")).unwrap(),
            DataFormat::Xlsx
        );
        assert!(matches!(
            DataFormat::from_path(Path::new("sales.parquet")),
            Err(LoadError::UnsupportedFormat { .. })
        ));
    }
}
