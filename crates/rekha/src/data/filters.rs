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

use crate::data::column::{ColumnData, ColumnKind, MISSING_LABEL};
use crate::data::frame::Dataset;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Allowed values per column; a row passes when every listed column holds an allowed value.
///
/// Values are compared by their text label, with missing cells labelled `""`.
/// Columns absent from the dataset being filtered are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowFilter {
    selections: BTreeMap<String, BTreeSet<String>>,
}

impl RowFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects every observed value of each named column that exists in `dataset`.
    pub fn all_values<'a>(dataset: &Dataset, columns: impl IntoIterator<Item = &'a str>) -> Self {
        let mut filter = Self::new();
        for name in columns {
            if let Some(column) = dataset.column(name) {
                filter.select(name, column.distinct_labels());
            }
        }
        filter
    }

    /// Selects every observed non-missing value, so rows missing any listed column are dropped.
    pub fn present_values<'a>(dataset: &Dataset, columns: impl IntoIterator<Item = &'a str>) -> Self {
        let mut filter = Self::new();
        for name in columns {
            if let Some(column) = dataset.column(name) {
                let labels = column.distinct_labels().into_iter().filter(|label| label != MISSING_LABEL);
                filter.select(name, labels);
            }
        }
        filter
    }

    pub fn select<I, S>(&mut self, column: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selections
            .insert(column.into(), values.into_iter().map(Into::into).collect());
    }

    pub fn allowed(&self, column: &str) -> Option<&BTreeSet<String>> {
        self.selections.get(column)
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.selections.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.selections.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn apply(&self, dataset: &Dataset) -> Dataset {
        let active: Vec<_> = self
            .selections
            .iter()
            .filter_map(|(name, allowed)| dataset.column(name).map(|column| (column, allowed)))
            .collect();
        if active.is_empty() {
            return dataset.clone();
        }
        dataset.filter(|row| {
            active
                .iter()
                .all(|(column, allowed)| allowed.contains(&column.label(row)))
        })
    }
}

/// Configured global filter columns that exist in the dataset, in configured order.
pub fn global_filter_columns<'a>(dataset: &Dataset, configured: &'a [String]) -> Vec<&'a str> {
    configured
        .iter()
        .map(String::as_str)
        .filter(|name| dataset.has_column(name))
        .collect()
}

/// Text columns with fewer than `max_cardinality` distinct values, in column order.
pub fn per_chart_filter_columns(dataset: &Dataset, max_cardinality: usize) -> Vec<&str> {
    dataset
        .column_names()
        .iter()
        .filter(|name| {
            dataset.column(name).is_some_and(|column| {
                column.kind() == ColumnKind::Text && column.cardinality() < max_cardinality
            })
        })
        .map(String::as_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::column::Column;

    fn dataset() -> Dataset {
        let mut ds = Dataset::new();
        ds.add_column(
            "Region",
            Column::from_strings(vec![Some("N".into()), Some("S".into()), None, Some("N".into())]),
        )
        .unwrap();
        ds.add_column(
            "Sales",
            Column::from_strings(vec![Some("1".into()), Some("2".into()), Some("3".into()), Some("4".into())]),
        )
        .unwrap();
        ds
    }

    #[test]
    fn test_all_values_keeps_every_row() {
        let ds = dataset();
        let filter = RowFilter::all_values(&ds, ["Region", "Missing"]);
        assert_eq!(filter.len(), 1);
        assert_eq!(filter.apply(&ds).row_count(), 4);
    }

    #[test]
    fn test_present_values_drop_missing_rows() {
        let ds = dataset();
        let filter = RowFilter::present_values(&ds, ["Region"]);
        assert_eq!(
            filter.allowed("Region").unwrap().iter().collect::<Vec<_>>(),
            vec!["N", "S"]
        );
        let out = filter.apply(&ds);
        assert_eq!(out.row_count(), 3);
        assert_eq!(out.column("Sales").unwrap().numeric_values(), vec![1.0, 2.0, 4.0]);
    }

    #[test]
    fn test_selection_narrows_rows() {
        let ds = dataset();
        let mut filter = RowFilter::new();
        filter.select("Region", ["N"]);
        let out = filter.apply(&ds);
        assert_eq!(out.row_count(), 2);
        assert_eq!(out.column("Sales").unwrap().to_f64(1), Some(4.0));
    }

    #[test]
    fn test_numeric_labels_filter() {
        let ds = dataset();
        let mut filter = RowFilter::new();
        filter.select("Sales", ["3"]);
        assert_eq!(filter.apply(&ds).row_count(), 1);
    }

    #[test]
    fn test_candidate_columns() {
        let ds = dataset();
        assert_eq!(per_chart_filter_columns(&ds, 20), vec!["Region"]);
        assert!(per_chart_filter_columns(&ds, 2).is_empty());
        let configured = vec!["Date".to_string(), "Region".to_string()];
        assert_eq!(global_filter_columns(&ds, &configured), vec!["Region"]);
    }
}
