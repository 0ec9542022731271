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

use crate::data::column::{Column, ColumnData};
use crate::data::frame::Dataset;
use crate::data::io::{unique_headers, CsvReader, DataFormat, RawTable, XlsxReader};
use crate::error::LoadError;
use rayon::prelude::*;
use std::path::Path;
use tracing::{info, instrument};

/// Name of the all-ones column added when a dataset has nothing numeric to plot.
pub const COUNT_COLUMN: &str = "Order Count";

/// Turns uploaded bytes into a [`Dataset`] with at least one numeric column.
#[derive(Debug, Default)]
pub struct DatasetNormalizer {
    csv: CsvReader,
    xlsx: XlsxReader,
}

impl DatasetNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_csv_reader(mut self, reader: CsvReader) -> Self {
        self.csv = reader;
        self
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub fn load(&self, bytes: &[u8], format: DataFormat) -> Result<Dataset, LoadError> {
        let table = match format {
            DataFormat::Csv => self.csv.read_bytes(bytes)?,
            DataFormat::Xlsx => self.xlsx.read_bytes(bytes)?,
        };
        let dataset = normalize_table(table)?;
        info!(
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            numeric = dataset.numeric_columns().len(),
            synthetic_count = dataset.count_column().is_some(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    pub fn load_path(&self, path: &Path) -> Result<Dataset, LoadError> {
        let format = DataFormat::from_path(path)?;
        let bytes = std::fs::read(path)?;
        self.load(&bytes, format)
    }
}

/// Classifies columns and appends [`COUNT_COLUMN`] when no column is numeric.
pub fn normalize_table(table: RawTable) -> Result<Dataset, LoadError> {
    if table.width() == 0 {
        return Err(LoadError::EmptyDataset);
    }
    let row_count = table.rows.len();
    let columns: Vec<(String, Column)> = table
        .into_columns()
        .into_par_iter()
        .map(|(name, values)| (name, Column::from_strings(values)))
        .collect();

    let mut dataset = Dataset::new();
    for (name, column) in columns {
        dataset.add_column(name, column)?;
    }

    if dataset.numeric_columns().is_empty() {
        let mut names: Vec<String> = dataset.column_names().to_vec();
        names.push(COUNT_COLUMN.to_string());
        let count_name = unique_headers(names)
            .pop()
            .unwrap_or_else(|| COUNT_COLUMN.to_string());
        dataset.add_column(count_name.clone(), Column::constant(1.0, row_count))?;
        dataset.mark_count_column(&count_name);
    }
    debug_assert!(dataset
        .column_names()
        .iter()
        .all(|name| dataset.column(name).is_some_and(|c| c.len() == row_count)));
    Ok(dataset)
}
