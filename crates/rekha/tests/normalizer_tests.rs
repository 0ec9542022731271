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

mod common;

use rekha::data::{ColumnKind, COUNT_COLUMN};
use rekha::{DataFormat, DatasetNormalizer, LoadError};
use rust_xlsxwriter::Workbook;
use std::io::Write;

#[test]
fn test_csv_columns_are_classified() {
    let ds = DatasetNormalizer::new()
        .load(common::SALES_CSV.as_bytes(), DataFormat::Csv)
        .unwrap();
    assert_eq!(ds.row_count(), 6);
    assert_eq!(ds.column_names(), &["Category", "Date", "Sales"]);
    assert_eq!(ds.kind_of("Sales"), Some(ColumnKind::Numeric));
    assert_eq!(ds.kind_of("Date"), Some(ColumnKind::Text));
    assert_eq!(ds.numeric_columns(), vec!["Sales"]);
    assert!(ds.count_column().is_none());
}

#[test]
fn test_text_only_dataset_gains_one_count_column() {
    let ds = DatasetNormalizer::new()
        .load(b"Region,Product\nNorth,Desk\nSouth,Chair\nNorth,Lamp\n", DataFormat::Csv)
        .unwrap();
    assert_eq!(ds.numeric_columns(), vec![COUNT_COLUMN]);
    assert_eq!(ds.column_count(), 3);
    let counts = ds.column(COUNT_COLUMN).unwrap();
    assert_eq!(counts.numeric_values(), vec![1.0, 1.0, 1.0]);
}

#[test]
fn test_count_column_name_does_not_clash() {
    let ds = DatasetNormalizer::new()
        .load(b"Order Count,Region\nmany,North\n", DataFormat::Csv)
        .unwrap();
    let count = ds.count_column().unwrap();
    assert_ne!(count, COUNT_COLUMN);
    assert!(ds.is_numeric(count));
    assert!(!ds.is_numeric(COUNT_COLUMN));
}

#[test]
fn test_latin1_bytes_are_decoded() {
    let bytes = b"City,Sales\nM\xfcnchen,10\nS\xe3o Paulo,20\n";
    let ds = DatasetNormalizer::new().load(bytes, DataFormat::Csv).unwrap();
    let city = ds.column("City").unwrap();
    assert_eq!(city.label(0), "M\u{fc}nchen");
    assert_eq!(city.label(1), "S\u{e3}o Paulo");
}

#[test]
fn test_short_rows_are_padded_and_long_rows_rejected() {
    let ds = DatasetNormalizer::new()
        .load(b"A,B,C\n1,2\n3,4,5\n", DataFormat::Csv)
        .unwrap();
    assert_eq!(ds.row_count(), 2);
    assert!(ds.column("C").unwrap().is_missing(0));

    let err = DatasetNormalizer::new()
        .load(b"A,B\n1,2\n3,4,5\n", DataFormat::Csv)
        .unwrap_err();
    assert!(matches!(
        err,
        LoadError::RaggedRow {
            row: 3,
            expected: 2,
            found: 3
        }
    ));
}

#[test]
fn test_duplicate_headers_are_made_unique() {
    let ds = DatasetNormalizer::new()
        .load(b"Sales,Sales,\n1,2,x\n", DataFormat::Csv)
        .unwrap();
    assert_eq!(ds.column_names(), &["Sales", "Sales.1", "Unnamed: 2"]);
}

#[test]
fn test_empty_upload_is_rejected() {
    let err = DatasetNormalizer::new().load(b"", DataFormat::Csv).unwrap_err();
    assert!(matches!(err, LoadError::EmptyDataset));
}

#[test]
fn test_xlsx_first_sheet_is_loaded() {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Region").unwrap();
    sheet.write_string(0, 1, "Revenue").unwrap();
    for (row, (region, revenue)) in [("North", 12.5), ("South", 7.0), ("East", 3.25)]
        .into_iter()
        .enumerate()
    {
        let row = u32::try_from(row).unwrap() + 1;
        sheet.write_string(row, 0, region).unwrap();
        sheet.write_number(row, 1, revenue).unwrap();
    }
    let bytes = workbook.save_to_buffer().unwrap();

    let ds = DatasetNormalizer::new().load(&bytes, DataFormat::Xlsx).unwrap();
    assert_eq!(ds.row_count(), 3);
    assert_eq!(ds.column_names(), &["Region", "Revenue"]);
    assert!(ds.is_numeric("Revenue"));
    assert_eq!(ds.column("Revenue").unwrap().numeric_values(), vec![12.5, 7.0, 3.25]);
}

#[test]
fn test_corrupt_xlsx_is_a_spreadsheet_error() {
    let err = DatasetNormalizer::new()
        .load(b"definitely not a zip archive", DataFormat::Xlsx)
        .unwrap_err();
    assert!(matches!(err, LoadError::Spreadsheet(_)));
}

#[test]
fn test_load_path_picks_format_from_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sales.csv");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(common::SALES_CSV.as_bytes())
        .unwrap();
    let ds = DatasetNormalizer::new().load_path(&path).unwrap();
    assert_eq!(ds.row_count(), 6);

    let odd = dir.path().join("sales.json");
    std::fs::write(&odd, "{}").unwrap();
    let err = DatasetNormalizer::new().load_path(&odd).unwrap_err();
    assert!(matches!(err, LoadError::UnsupportedFormat { .. }));
}
