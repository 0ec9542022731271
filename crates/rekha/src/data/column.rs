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

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Label used for missing cells wherever values are compared as text.
pub const MISSING_LABEL: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Text,
}

impl ColumnKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnKind::Numeric)
    }
}

pub trait ColumnData: Send + Sync + std::fmt::Debug {
    fn len(&self) -> usize;
    fn kind(&self) -> ColumnKind;
    fn null_count(&self) -> usize;
    fn get_string(&self, index: usize) -> Option<String>;
    fn to_f64(&self, index: usize) -> Option<f64>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Arc<[Option<f64>]>),
    Text(Arc<[Option<Arc<str>>]>),
}

impl ColumnData for Column {
    fn len(&self) -> usize {
        match self {
            Column::Numeric(data) => data.len(),
            Column::Text(data) => data.len(),
        }
    }
    fn kind(&self) -> ColumnKind {
        match self {
            Column::Numeric(_) => ColumnKind::Numeric,
            Column::Text(_) => ColumnKind::Text,
        }
    }
    fn null_count(&self) -> usize {
        match self {
            Column::Numeric(data) => data.par_iter().filter(|v| v.is_none()).count(),
            Column::Text(data) => data.par_iter().filter(|v| v.is_none()).count(),
        }
    }
    fn get_string(&self, index: usize) -> Option<String> {
        match self {
            Column::Numeric(data) => data.get(index)?.map(format_number),
            Column::Text(data) => data.get(index)?.as_ref().map(|s| s.to_string()),
        }
    }
    fn to_f64(&self, index: usize) -> Option<f64> {
        match self {
            Column::Numeric(data) => data.get(index).copied()?,
            Column::Text(data) => data
                .get(index)?
                .as_ref()
                .and_then(|s| parse_number(s)),
        }
    }
}

impl Column {
    /// Classifies raw cells: numeric when every non-missing cell parses as a finite number.
    pub fn from_strings(values: Vec<Option<String>>) -> Self {
        let values: Vec<Option<String>> = values
            .into_par_iter()
            .map(|cell| cell.filter(|s| !s.trim().is_empty()))
            .collect();
        let all_numeric = values
            .par_iter()
            .flatten()
            .all(|s| parse_number(s).is_some());
        if all_numeric {
            let parsed: Vec<Option<f64>> = values
                .par_iter()
                .map(|cell| cell.as_deref().and_then(parse_number))
                .collect();
            Column::Numeric(parsed.into())
        } else {
            let strings: Vec<Option<Arc<str>>> = values
                .into_iter()
                .map(|cell| cell.map(Arc::from))
                .collect();
            Column::Text(strings.into())
        }
    }

    pub fn constant(value: f64, len: usize) -> Self {
        Column::Numeric(vec![Some(value); len].into())
    }

    pub fn select_rows(&self, indices: &[usize]) -> Self {
        match self {
            Column::Numeric(data) => {
                let picked: Vec<Option<f64>> = indices
                    .par_iter()
                    .map(|&i| data.get(i).copied().flatten())
                    .collect();
                Column::Numeric(picked.into())
            }
            Column::Text(data) => {
                let picked: Vec<Option<Arc<str>>> = indices
                    .par_iter()
                    .map(|&i| data.get(i).cloned().flatten())
                    .collect();
                Column::Text(picked.into())
            }
        }
    }

    /// Text form of a cell, with [`MISSING_LABEL`] for missing values.
    pub fn label(&self, index: usize) -> String {
        self.get_string(index)
            .unwrap_or_else(|| MISSING_LABEL.to_string())
    }

    pub fn is_missing(&self, index: usize) -> bool {
        match self {
            Column::Numeric(data) => !matches!(data.get(index), Some(Some(_))),
            Column::Text(data) => !matches!(data.get(index), Some(Some(_))),
        }
    }

    /// Distinct labels in first-appearance order, including [`MISSING_LABEL`] when present.
    pub fn distinct_labels(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut labels = Vec::new();
        for i in 0..self.len() {
            let label = self.label(i);
            if seen.insert(label.clone()) {
                labels.push(label);
            }
        }
        labels
    }

    /// Number of distinct non-missing values.
    pub fn cardinality(&self) -> usize {
        (0..self.len())
            .filter_map(|i| self.get_string(i))
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn numeric_values(&self) -> Vec<f64> {
        (0..self.len()).filter_map(|i| self.to_f64(i)).collect()
    }
}

pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integral values print without a fractional part so `3` stays `3`, not `3.0`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some((*v).to_string())).collect()
    }

    #[test]
    fn test_numeric_inference_ignores_blanks() {
        let column = Column::from_strings(cells(&["1", "", "2.5", " "]));
        assert_eq!(column.kind(), ColumnKind::Numeric);
        assert_eq!(column.null_count(), 2);
        assert_eq!(column.to_f64(2), Some(2.5));
    }

    #[test]
    fn test_mixed_column_is_text() {
        let column = Column::from_strings(cells(&["1", "two", "3"]));
        assert_eq!(column.kind(), ColumnKind::Text);
        assert_eq!(column.get_string(1).as_deref(), Some("two"));
    }

    #[test]
    fn test_non_finite_is_text() {
        let column = Column::from_strings(cells(&["1", "inf"]));
        assert_eq!(column.kind(), ColumnKind::Text);
    }

    #[test]
    fn test_all_missing_column_is_numeric() {
        let column = Column::from_strings(vec![None, Some(String::new())]);
        assert!(column.kind().is_numeric());
        assert_eq!(column.cardinality(), 0);
    }

    #[test]
    fn test_distinct_labels_keep_order_and_missing() {
        let column = Column::from_strings(vec![
            Some("b".into()),
            None,
            Some("a".into()),
            Some("b".into()),
        ]);
        assert_eq!(column.distinct_labels(), vec!["b", "", "a"]);
        assert_eq!(column.cardinality(), 2);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-2.5), "-2.5");
        assert_eq!(format_number(0.1), "0.1");
    }
}
