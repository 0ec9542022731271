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

use crate::data::column::{Column, ColumnData, ColumnKind};
use crate::error::LoadError;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

/// Column-ordered table with unique names and equal column lengths.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    columns: HashMap<String, Arc<Column>>,
    column_order: Vec<String>,
    row_count: usize,
    count_column: Option<String>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_column(&mut self, name: impl Into<String>, column: Column) -> Result<(), LoadError> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(LoadError::DuplicateColumn { column: name });
        }
        if !self.columns.is_empty() && column.len() != self.row_count {
            return Err(LoadError::ColumnLength {
                column: name,
                expected: self.row_count,
                found: column.len(),
            });
        }
        self.row_count = column.len();
        self.column_order.push(name.clone());
        self.columns.insert(name, Arc::new(column));
        Ok(())
    }

    pub(crate) fn mark_count_column(&mut self, name: &str) {
        self.count_column = Some(name.to_string());
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.column_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_order
    }

    pub fn first_column(&self) -> Option<&str> {
        self.column_order.first().map(String::as_str)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name).map(AsRef::as_ref)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.column(name).map(ColumnData::kind)
    }

    pub fn is_numeric(&self, name: &str) -> bool {
        self.kind_of(name).is_some_and(|kind| kind.is_numeric())
    }

    /// Numeric columns in column order.
    pub fn numeric_columns(&self) -> Vec<&str> {
        self.column_order
            .iter()
            .filter(|name| self.is_numeric(name))
            .map(String::as_str)
            .collect()
    }

    /// Name of the synthetic all-ones column, when one had to be added.
    pub fn count_column(&self) -> Option<&str> {
        self.count_column.as_deref()
    }

    pub fn filter<P>(&self, predicate: P) -> Dataset
    where
        P: Fn(usize) -> bool + Send + Sync,
    {
        let indices: Vec<usize> = (0..self.row_count)
            .into_par_iter()
            .filter(|&i| predicate(i))
            .collect();
        self.select_rows(&indices)
    }

    pub fn select_rows(&self, indices: &[usize]) -> Dataset {
        let columns = self
            .column_order
            .iter()
            .map(|name| {
                let column = self.columns[name].select_rows(indices);
                (name.clone(), Arc::new(column))
            })
            .collect();
        Dataset {
            columns,
            column_order: self.column_order.clone(),
            row_count: indices.len(),
            count_column: self.count_column.clone(),
        }
    }

    pub fn head(&self, limit: usize) -> Dataset {
        if limit >= self.row_count {
            return self.clone();
        }
        let indices: Vec<usize> = (0..limit).collect();
        self.select_rows(&indices)
    }

    /// Restricts to the named columns, skipping names that do not exist.
    pub fn project(&self, names: &[&str]) -> Dataset {
        let mut projected = Dataset::new();
        for name in names {
            if projected.has_column(name) {
                continue;
            }
            if let Some(column) = self.columns.get(*name) {
                projected.columns.insert((*name).to_string(), Arc::clone(column));
                projected.column_order.push((*name).to_string());
            }
        }
        projected.row_count = self.row_count;
        projected
    }

    /// Drops rows where any of the named columns is missing.
    pub fn drop_missing(&self, names: &[&str]) -> Dataset {
        let columns: Vec<&Column> = names.iter().filter_map(|n| self.column(n)).collect();
        self.filter(|row| columns.iter().all(|column| !column.is_missing(row)))
    }

    pub fn row_labels(&self, row: usize) -> Vec<String> {
        self.column_order
            .iter()
            .map(|name| self.columns[name].label(row))
            .collect()
    }

    /// CSV text with a header row; missing cells are written empty.
    pub fn to_csv(&self) -> std::io::Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.column_order)?;
        for row in 0..self.row_count {
            writer.write_record(self.row_labels(row))?;
        }
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        String::from_utf8(bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Plain-text table of the first `limit` rows.
    pub fn format_sample(&self, limit: usize) -> String {
        let sample_size = limit.min(self.row_count);
        let header = self.column_order.join(" | ");
        let mut out = format!("{header}\n{}\n", "-".repeat(header.len()));
        for row in 0..sample_size {
            let cells: Vec<String> = self
                .column_order
                .iter()
                .map(|name| {
                    self.columns[name]
                        .get_string(row)
                        .unwrap_or_else(|| "NULL".to_string())
                })
                .collect();
            out.push_str(&cells.join(" | "));
            out.push('\n');
        }
        if self.row_count > sample_size {
            out.push_str(&format!("... ({} more rows)\n", self.row_count - sample_size));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        let mut ds = Dataset::new();
        ds.add_column(
            "Region",
            Column::from_strings(vec![Some("N".into()), Some("S".into()), None]),
        )
        .unwrap();
        ds.add_column(
            "Sales",
            Column::from_strings(vec![Some("1".into()), Some("2.5".into()), Some("3".into())]),
        )
        .unwrap();
        ds
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let mut ds = sample();
        let err = ds
            .add_column("Short", Column::constant(1.0, 2))
            .unwrap_err();
        assert!(matches!(err, LoadError::ColumnLength { expected: 3, found: 2, .. }));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut ds = sample();
        assert!(ds.add_column("Sales", Column::constant(1.0, 3)).is_err());
    }

    #[test]
    fn test_filter_keeps_order() {
        let ds = sample();
        let filtered = ds.filter(|row| row != 1);
        assert_eq!(filtered.row_count(), 2);
        assert_eq!(filtered.column_names(), ds.column_names());
        assert_eq!(filtered.column("Sales").unwrap().to_f64(1), Some(3.0));
    }

    #[test]
    fn test_to_csv_writes_missing_as_empty() {
        let csv = sample().to_csv().unwrap();
        assert_eq!(csv, "Region,Sales\nN,1\nS,2.5\n,3\n");
    }

    #[test]
    fn test_drop_missing_and_project() {
        let ds = sample();
        let preview = ds.project(&["Sales", "Region"]).drop_missing(&["Sales", "Region"]);
        assert_eq!(preview.column_names(), &["Sales".to_string(), "Region".to_string()]);
        assert_eq!(preview.row_count(), 2);
    }
}
