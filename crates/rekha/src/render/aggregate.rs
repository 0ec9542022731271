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

//! Group-by helpers over a [`Dataset`]. Rows whose group key is missing are
//! left out, and missing y values are skipped.

use crate::data::column::parse_number;
use crate::data::{Column, ColumnData, Dataset};
use crate::error::RenderError;
use crate::render::plot::{BoxStats, HistogramBin};
use std::cmp::Ordering;
use std::collections::HashMap;

const MAX_HISTOGRAM_BINS: usize = 50;

pub(crate) fn column<'a>(data: &'a Dataset, name: &str) -> Result<&'a Column, RenderError> {
    data.column(name).ok_or_else(|| RenderError::MissingColumn {
        column: name.to_string(),
    })
}

/// Orders labels numerically for numeric columns and lexically otherwise.
pub fn compare_labels(a: &str, b: &str, numeric: bool) -> Ordering {
    if numeric {
        let parse = |s: &str| parse_number(s).unwrap_or(f64::NAN);
        parse(a).total_cmp(&parse(b))
    } else {
        a.cmp(b)
    }
}

/// Row indices per distinct non-missing value of `x`, in key order.
pub fn group_rows(data: &Dataset, x: &str) -> Result<Vec<(String, Vec<usize>)>, RenderError> {
    let column = column(data, x)?;
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for row in 0..data.row_count() {
        if let Some(label) = column.get_string(row) {
            groups.entry(label).or_default().push(row);
        }
    }
    let numeric = column.kind().is_numeric();
    let mut keyed: Vec<(String, Vec<usize>)> = groups.into_iter().collect();
    keyed.sort_by(|(a, _), (b, _)| compare_labels(a, b, numeric));
    Ok(keyed)
}

pub fn count_by(data: &Dataset, x: &str) -> Result<Vec<(String, f64)>, RenderError> {
    Ok(group_rows(data, x)?
        .into_iter()
        .map(|(label, rows)| (label, rows.len() as f64))
        .collect())
}

pub fn sum_by(data: &Dataset, x: &str, y: &str) -> Result<Vec<(String, f64)>, RenderError> {
    let values = column(data, y)?;
    Ok(group_rows(data, x)?
        .into_iter()
        .map(|(label, rows)| {
            let total = rows.iter().filter_map(|&row| values.to_f64(row)).sum();
            (label, total)
        })
        .collect())
}

/// Mean of `y` per `x`; groups without any `y` value are dropped.
pub fn mean_by(data: &Dataset, x: &str, y: &str) -> Result<Vec<(String, f64)>, RenderError> {
    let values = column(data, y)?;
    Ok(group_rows(data, x)?
        .into_iter()
        .filter_map(|(label, rows)| {
            let present: Vec<f64> = rows.iter().filter_map(|&row| values.to_f64(row)).collect();
            (!present.is_empty())
                .then(|| (label, present.iter().sum::<f64>() / present.len() as f64))
        })
        .collect())
}

/// Counts per value, largest first; ties keep label order.
pub fn value_counts(data: &Dataset, x: &str) -> Result<Vec<(String, f64)>, RenderError> {
    let mut counts = count_by(data, x)?;
    counts.sort_by(|a, b| b.1.total_cmp(&a.1));
    Ok(counts)
}

/// Row counts over (x, y) pairs: `(x labels, y labels, counts[y][x])`.
pub fn crosstab(
    data: &Dataset,
    x: &str,
    y: &str,
) -> Result<(Vec<String>, Vec<String>, Vec<Vec<f64>>), RenderError> {
    let x_groups = group_rows(data, x)?;
    let y_groups = group_rows(data, y)?;
    let mut y_index = vec![None; data.row_count()];
    for (j, (_, rows)) in y_groups.iter().enumerate() {
        for &row in rows {
            y_index[row] = Some(j);
        }
    }
    let mut counts = vec![vec![0.0; x_groups.len()]; y_groups.len()];
    for (i, (_, rows)) in x_groups.iter().enumerate() {
        for &row in rows {
            if let Some(j) = y_index[row] {
                counts[j][i] += 1.0;
            }
        }
    }
    let x_labels = x_groups.into_iter().map(|(label, _)| label).collect();
    let y_labels = y_groups.into_iter().map(|(label, _)| label).collect();
    Ok((x_labels, y_labels, counts))
}

/// Quantile of sorted values with linear interpolation between closest ranks.
pub fn quantile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let frac = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Box statistics with whiskers at the furthest values within 1.5 IQR of the box.
pub fn box_stats(label: String, values: &[f64]) -> Option<BoxStats> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let q1 = quantile(&sorted, 0.25)?;
    let median = quantile(&sorted, 0.5)?;
    let q3 = quantile(&sorted, 0.75)?;
    let fence = 1.5 * (q3 - q1);
    let lower_whisker = sorted
        .iter()
        .copied()
        .find(|v| *v >= q1 - fence)
        .unwrap_or(q1);
    let upper_whisker = sorted
        .iter()
        .rev()
        .copied()
        .find(|v| *v <= q3 + fence)
        .unwrap_or(q3);
    Some(BoxStats {
        label,
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
        count: sorted.len(),
    })
}

/// Equal-width bins over the value range; Sturges' rule picks the bin count.
pub fn histogram_bins(values: &[f64]) -> Vec<HistogramBin> {
    if values.is_empty() {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if (max - min).abs() < f64::EPSILON {
        return vec![HistogramBin {
            label: crate::data::column::format_number(min),
            count: values.len() as f64,
        }];
    }
    let bins = ((values.len() as f64).log2().ceil() as usize + 1).clamp(1, MAX_HISTOGRAM_BINS);
    let width = (max - min) / bins as f64;
    let mut counts = vec![0.0; bins];
    for value in values {
        let slot = (((value - min) / width).floor() as usize).min(bins - 1);
        counts[slot] += 1.0;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| {
            let start = min + width * i as f64;
            HistogramBin {
                label: format!("{}-{}", short_number(start), short_number(start + width)),
                count,
            }
        })
        .collect()
}

fn short_number(value: f64) -> String {
    if value.fract().abs() < 1e-9 {
        crate::data::column::format_number(value)
    } else {
        let text = format!("{value:.2}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
