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

use super::aggregate::{self, column, compare_labels};
use super::plot::{PieSlice, PlottableSeries, PreparedChart, ScatterPoint, StackSeries};
use crate::data::{ColumnData, Dataset, COUNT_COLUMN};
use crate::error::RenderError;
use crate::plan::{ChartKind, ResolvedChartConfig, YAxis};
use std::collections::HashMap;

/// Line charts switch to a per-x mean above this many distinct x values.
const LINE_MEAN_THRESHOLD: usize = 20;
const LINE_TOP_N: usize = 10;
const BUBBLE_MIN_RADIUS: f64 = 3.0;
const BUBBLE_RADIUS_RANGE: f64 = 17.0;
const SCATTER_RADIUS: f64 = 4.0;

/// Turns a validated config and its data slice into drawable series.
pub trait ChartKindRenderer: Send + Sync {
    fn kind(&self) -> ChartKind;
    fn prepare(&self, data: &Dataset, config: &ResolvedChartConfig) -> Result<PreparedChart, RenderError>;
}

pub struct BarRenderer;
pub struct LineRenderer;
pub struct ScatterRenderer;
pub struct PieRenderer;
pub struct HistogramRenderer;
pub struct HeatmapRenderer;
pub struct BoxRenderer;
pub struct AreaRenderer;
pub struct BubbleRenderer;
pub struct StackedBarRenderer;

static BAR: BarRenderer = BarRenderer;
static LINE: LineRenderer = LineRenderer;
static SCATTER: ScatterRenderer = ScatterRenderer;
static PIE: PieRenderer = PieRenderer;
static HISTOGRAM: HistogramRenderer = HistogramRenderer;
static HEATMAP: HeatmapRenderer = HeatmapRenderer;
static BOX: BoxRenderer = BoxRenderer;
static AREA: AreaRenderer = AreaRenderer;
static BUBBLE: BubbleRenderer = BubbleRenderer;
static STACKED_BAR: StackedBarRenderer = StackedBarRenderer;

pub fn renderer_for(kind: ChartKind) -> &'static dyn ChartKindRenderer {
    match kind {
        ChartKind::Bar => &BAR,
        ChartKind::Line => &LINE,
        ChartKind::Scatter => &SCATTER,
        ChartKind::Pie => &PIE,
        ChartKind::Histogram => &HISTOGRAM,
        ChartKind::Heatmap => &HEATMAP,
        ChartKind::Box => &BOX,
        ChartKind::Area => &AREA,
        ChartKind::Bubble => &BUBBLE,
        ChartKind::StackedBar => &STACKED_BAR,
    }
}

fn non_empty<T>(items: Vec<T>, column: &str) -> Result<Vec<T>, RenderError> {
    if items.is_empty() {
        Err(RenderError::NoPlottableValues {
            column: column.to_string(),
        })
    } else {
        Ok(items)
    }
}

fn unzip(pairs: Vec<(String, f64)>) -> (Vec<String>, Vec<f64>) {
    pairs.into_iter().unzip()
}

/// Bar chart of row counts per x value.
fn count_bars(
    data: &Dataset,
    config: &ResolvedChartConfig,
    warning: Option<String>,
) -> Result<PreparedChart, RenderError> {
    let counts = non_empty(aggregate::count_by(data, &config.x)?, &config.x)?;
    let (categories, values) = unzip(counts);
    Ok(PreparedChart {
        kind: ChartKind::Bar,
        title: format!("{}: {COUNT_COLUMN} by {}", ChartKind::Bar, config.x),
        x_label: config.x.clone(),
        y_label: COUNT_COLUMN.to_string(),
        series: PlottableSeries::Bars { categories, values },
        warning,
    })
}

/// The numeric y column, or the count-bar fallback with a warning.
fn numeric_y_or_fallback<'c>(
    data: &Dataset,
    config: &'c ResolvedChartConfig,
) -> Result<Result<&'c str, PreparedChart>, RenderError> {
    let kind = config.chart_type;
    let warning = match &config.y {
        YAxis::Column(y) if data.is_numeric(y) => return Ok(Ok(y.as_str())),
        YAxis::Column(y) => format!("Y-axis '{y}' is not numeric for {kind} chart. Using bar chart instead."),
        YAxis::CountFallback | YAxis::Discarded => {
            format!("{kind} chart needs a numeric y-axis. Using bar chart instead.")
        }
    };
    count_bars(data, config, Some(warning)).map(Err)
}

fn prepared(
    config: &ResolvedChartConfig,
    y_label: &str,
    series: PlottableSeries,
) -> PreparedChart {
    PreparedChart {
        kind: config.chart_type,
        title: config.title(),
        x_label: config.x.clone(),
        y_label: y_label.to_string(),
        series,
        warning: None,
    }
}

/// Rows where both x and y are present, as (x label, y value).
fn xy_rows(data: &Dataset, x: &str, y: &str) -> Result<Vec<(String, f64)>, RenderError> {
    let xs = column(data, x)?;
    let ys = column(data, y)?;
    Ok((0..data.row_count())
        .filter_map(|row| Some((xs.get_string(row)?, ys.to_f64(row)?)))
        .collect())
}

impl ChartKindRenderer for BarRenderer {
    fn kind(&self) -> ChartKind {
        ChartKind::Bar
    }

    fn prepare(&self, data: &Dataset, config: &ResolvedChartConfig) -> Result<PreparedChart, RenderError> {
        match config.y.column() {
            Some(y) if data.is_numeric(y) => {
                let sums = non_empty(aggregate::sum_by(data, &config.x, y)?, &config.x)?;
                let (categories, values) = unzip(sums);
                Ok(prepared(config, y, PlottableSeries::Bars { categories, values }))
            }
            _ => count_bars(data, config, None),
        }
    }
}

impl ChartKindRenderer for LineRenderer {
    fn kind(&self) -> ChartKind {
        ChartKind::Line
    }

    fn prepare(&self, data: &Dataset, config: &ResolvedChartConfig) -> Result<PreparedChart, RenderError> {
        let y = match numeric_y_or_fallback(data, config)? {
            Ok(y) => y,
            Err(fallback) => return Ok(fallback),
        };
        let distinct = column(data, &config.x)?.cardinality();
        let mut points = if distinct > LINE_MEAN_THRESHOLD {
            aggregate::mean_by(data, &config.x, y)?
        } else {
            xy_rows(data, &config.x, y)?
        };
        points.sort_by(|a, b| b.1.total_cmp(&a.1));
        points.truncate(LINE_TOP_N);
        let numeric_x = data.is_numeric(&config.x);
        points.sort_by(|a, b| compare_labels(&a.0, &b.0, numeric_x));
        let (categories, values) = unzip(non_empty(points, y)?);
        Ok(prepared(
            config,
            y,
            PlottableSeries::Line {
                categories,
                values,
                filled: false,
            },
        ))
    }
}

impl ChartKindRenderer for AreaRenderer {
    fn kind(&self) -> ChartKind {
        ChartKind::Area
    }

    fn prepare(&self, data: &Dataset, config: &ResolvedChartConfig) -> Result<PreparedChart, RenderError> {
        let y = match numeric_y_or_fallback(data, config)? {
            Ok(y) => y,
            Err(fallback) => return Ok(fallback),
        };
        let (categories, values) = unzip(non_empty(aggregate::sum_by(data, &config.x, y)?, y)?);
        Ok(prepared(
            config,
            y,
            PlottableSeries::Line {
                categories,
                values,
                filled: true,
            },
        ))
    }
}

/// Points for scatter-like charts. Text x values are placed at their category index.
fn scatter_points(
    data: &Dataset,
    x: &str,
    y: &str,
    size: impl Fn(f64) -> f64,
) -> Result<(Vec<ScatterPoint>, Option<Vec<String>>), RenderError> {
    if data.is_numeric(x) {
        let xs = column(data, x)?;
        let ys = column(data, y)?;
        let points = (0..data.row_count())
            .filter_map(|row| {
                let (px, py) = (xs.to_f64(row)?, ys.to_f64(row)?);
                Some(ScatterPoint { x: px, y: py, size: size(py) })
            })
            .collect();
        return Ok((points, None));
    }
    let rows = xy_rows(data, x, y)?;
    let mut categories: Vec<String> = rows.iter().map(|(label, _)| label.clone()).collect();
    categories.sort();
    categories.dedup();
    let index: HashMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, label)| (label.as_str(), i))
        .collect();
    let points = rows
        .iter()
        .filter_map(|(label, py)| {
            let px = *index.get(label.as_str())? as f64;
            Some(ScatterPoint { x: px, y: *py, size: size(*py) })
        })
        .collect();
    Ok((points, Some(categories)))
}

impl ChartKindRenderer for ScatterRenderer {
    fn kind(&self) -> ChartKind {
        ChartKind::Scatter
    }

    fn prepare(&self, data: &Dataset, config: &ResolvedChartConfig) -> Result<PreparedChart, RenderError> {
        let y = match numeric_y_or_fallback(data, config)? {
            Ok(y) => y,
            Err(fallback) => return Ok(fallback),
        };
        let (points, x_categories) = scatter_points(data, &config.x, y, |_| SCATTER_RADIUS)?;
        let points = non_empty(points, y)?;
        Ok(prepared(config, y, PlottableSeries::Scatter { points, x_categories }))
    }
}

impl ChartKindRenderer for BubbleRenderer {
    fn kind(&self) -> ChartKind {
        ChartKind::Bubble
    }

    fn prepare(&self, data: &Dataset, config: &ResolvedChartConfig) -> Result<PreparedChart, RenderError> {
        let y = match numeric_y_or_fallback(data, config)? {
            Ok(y) => y,
            Err(fallback) => return Ok(fallback),
        };
        let largest = column(data, y)?
            .numeric_values()
            .into_iter()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let radius = |value: f64| {
            if largest > 0.0 {
                BUBBLE_MIN_RADIUS + BUBBLE_RADIUS_RANGE * (value.abs() / largest).sqrt()
            } else {
                BUBBLE_MIN_RADIUS
            }
        };
        let (points, x_categories) = scatter_points(data, &config.x, y, radius)?;
        let points = non_empty(points, y)?;
        Ok(prepared(config, y, PlottableSeries::Scatter { points, x_categories }))
    }
}

impl ChartKindRenderer for BoxRenderer {
    fn kind(&self) -> ChartKind {
        ChartKind::Box
    }

    fn prepare(&self, data: &Dataset, config: &ResolvedChartConfig) -> Result<PreparedChart, RenderError> {
        let y = match numeric_y_or_fallback(data, config)? {
            Ok(y) => y,
            Err(fallback) => return Ok(fallback),
        };
        let values = column(data, y)?;
        let groups = aggregate::group_rows(data, &config.x)?
            .into_iter()
            .filter_map(|(label, rows)| {
                let present: Vec<f64> = rows.iter().filter_map(|&row| values.to_f64(row)).collect();
                aggregate::box_stats(label, &present)
            })
            .collect();
        let groups = non_empty(groups, y)?;
        Ok(prepared(config, y, PlottableSeries::Boxes { groups }))
    }
}

impl ChartKindRenderer for PieRenderer {
    fn kind(&self) -> ChartKind {
        ChartKind::Pie
    }

    fn prepare(&self, data: &Dataset, config: &ResolvedChartConfig) -> Result<PreparedChart, RenderError> {
        let counts = non_empty(aggregate::value_counts(data, &config.x)?, &config.x)?;
        let total: f64 = counts.iter().map(|(_, count)| count).sum();
        let slices = counts
            .into_iter()
            .map(|(label, count)| PieSlice {
                label,
                count,
                share: count / total,
            })
            .collect();
        Ok(prepared(config, "count", PlottableSeries::Pie { slices }))
    }
}

impl ChartKindRenderer for HistogramRenderer {
    fn kind(&self) -> ChartKind {
        ChartKind::Histogram
    }

    fn prepare(&self, data: &Dataset, config: &ResolvedChartConfig) -> Result<PreparedChart, RenderError> {
        let xs = column(data, &config.x)?;
        let bins = if xs.kind().is_numeric() {
            aggregate::histogram_bins(&xs.numeric_values())
        } else {
            let mut order: Vec<String> = Vec::new();
            let mut counts: HashMap<String, f64> = HashMap::new();
            for label in (0..data.row_count()).filter_map(|row| xs.get_string(row)) {
                let slot = counts.entry(label.clone()).or_insert_with(|| {
                    order.push(label);
                    0.0
                });
                *slot += 1.0;
            }
            order
                .into_iter()
                .map(|label| {
                    let count = counts.get(&label).copied().unwrap_or_default();
                    super::plot::HistogramBin { label, count }
                })
                .collect()
        };
        let bins = non_empty(bins, &config.x)?;
        Ok(prepared(config, "count", PlottableSeries::Histogram { bins }))
    }
}

impl ChartKindRenderer for HeatmapRenderer {
    fn kind(&self) -> ChartKind {
        ChartKind::Heatmap
    }

    fn prepare(&self, data: &Dataset, config: &ResolvedChartConfig) -> Result<PreparedChart, RenderError> {
        let Some(y) = config.y.column() else {
            let warning = "Heatmap chart has no y-axis. Using bar chart instead.".to_string();
            return count_bars(data, config, Some(warning));
        };
        let (x_labels, y_labels, counts) = aggregate::crosstab(data, &config.x, y)?;
        if x_labels.is_empty() || y_labels.is_empty() {
            return Err(RenderError::NoPlottableValues { column: y.to_string() });
        }
        Ok(prepared(
            config,
            y,
            PlottableSeries::Heatmap {
                x_labels,
                y_labels,
                counts,
            },
        ))
    }
}

impl ChartKindRenderer for StackedBarRenderer {
    fn kind(&self) -> ChartKind {
        ChartKind::StackedBar
    }

    fn prepare(&self, data: &Dataset, config: &ResolvedChartConfig) -> Result<PreparedChart, RenderError> {
        let Some(y) = config.y.column() else {
            let warning = "Stacked Bar chart has no y-axis. Using bar chart instead.".to_string();
            return count_bars(data, config, Some(warning));
        };
        let (categories, series) = if data.is_numeric(y) {
            // One segment per x category, each coloured separately.
            let (categories, totals) = unzip(aggregate::sum_by(data, &config.x, y)?);
            let series = categories
                .iter()
                .zip(&totals)
                .enumerate()
                .map(|(i, (name, total))| {
                    let mut values = vec![0.0; categories.len()];
                    values[i] = *total;
                    StackSeries {
                        name: name.clone(),
                        values,
                    }
                })
                .collect();
            (categories, series)
        } else {
            let (x_labels, y_labels, counts) = aggregate::crosstab(data, &config.x, y)?;
            let series = y_labels
                .into_iter()
                .zip(counts)
                .map(|(name, values)| StackSeries { name, values })
                .collect();
            (x_labels, series)
        };
        let categories = non_empty(categories, &config.x)?;
        let y_label = if data.is_numeric(y) { y } else { "count" };
        Ok(prepared(config, y_label, PlottableSeries::Stacked { categories, series }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataFormat, DatasetNormalizer, RowFilter};
    use crate::plan::Rgb;

    fn config(kind: ChartKind, x: &str, y: YAxis) -> ResolvedChartConfig {
        ResolvedChartConfig {
            chart_type: kind,
            x: x.to_string(),
            y,
            color: Rgb(0x1f, 0x77, 0xb4),
            filters: RowFilter::new(),
        }
    }

    fn sales() -> Dataset {
        DatasetNormalizer::new()
            .load(
                b"Category,Region,Sales\nA,N,10\nB,S,20\nA,S,5\nC,N,\nB,N,1\n",
                DataFormat::Csv,
            )
            .unwrap()
    }

    #[test]
    fn test_every_kind_has_a_renderer() {
        for kind in ChartKind::ALL {
            assert_eq!(renderer_for(kind).kind(), kind);
        }
    }

    #[test]
    fn test_bar_sums_numeric_y() {
        let chart = renderer_for(ChartKind::Bar)
            .prepare(&sales(), &config(ChartKind::Bar, "Category", YAxis::Column("Sales".into())))
            .unwrap();
        assert_eq!(
            chart.series,
            PlottableSeries::Bars {
                categories: vec!["A".into(), "B".into(), "C".into()],
                values: vec![15.0, 21.0, 0.0],
            }
        );
        assert!(!chart.is_fallback());
    }

    #[test]
    fn test_scatter_with_text_y_falls_back_to_counts() {
        let chart = renderer_for(ChartKind::Scatter)
            .prepare(&sales(), &config(ChartKind::Scatter, "Category", YAxis::Column("Region".into())))
            .unwrap();
        assert_eq!(chart.kind, ChartKind::Bar);
        assert_eq!(chart.y_label, COUNT_COLUMN);
        assert!(chart.warning.unwrap().contains("'Region' is not numeric"));
    }

    #[test]
    fn test_pie_shares_sum_to_one() {
        let chart = renderer_for(ChartKind::Pie)
            .prepare(&sales(), &config(ChartKind::Pie, "Region", YAxis::Discarded))
            .unwrap();
        let PlottableSeries::Pie { slices } = chart.series else {
            panic!("expected pie");
        };
        assert_eq!(slices[0].label, "N");
        assert!((slices.iter().map(|s| s.share).sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_text_histogram_keeps_first_appearance_order() {
        let chart = renderer_for(ChartKind::Histogram)
            .prepare(&sales(), &config(ChartKind::Histogram, "Region", YAxis::Discarded))
            .unwrap();
        let PlottableSeries::Histogram { bins } = chart.series else {
            panic!("expected histogram");
        };
        let labels: Vec<&str> = bins.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["N", "S"]);
    }

    #[test]
    fn test_stacked_text_y_is_crosstab() {
        let chart = renderer_for(ChartKind::StackedBar)
            .prepare(&sales(), &config(ChartKind::StackedBar, "Category", YAxis::Column("Region".into())))
            .unwrap();
        let PlottableSeries::Stacked { categories, series } = chart.series else {
            panic!("expected stacked");
        };
        assert_eq!(categories, vec!["A", "B", "C"]);
        assert_eq!(series[0].name, "N");
        assert_eq!(series[0].values, vec![1.0, 1.0, 1.0]);
        assert_eq!(series[1].values, vec![1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_heatmap_without_y_warns() {
        let chart = renderer_for(ChartKind::Heatmap)
            .prepare(&sales(), &config(ChartKind::Heatmap, "Region", YAxis::CountFallback))
            .unwrap();
        assert_eq!(chart.kind, ChartKind::Bar);
        assert!(chart.is_fallback());
    }

    #[test]
    fn test_box_groups_by_x() {
        let chart = renderer_for(ChartKind::Box)
            .prepare(&sales(), &config(ChartKind::Box, "Region", YAxis::Column("Sales".into())))
            .unwrap();
        let PlottableSeries::Boxes { groups } = chart.series else {
            panic!("expected boxes");
        };
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].count, 2);
    }
}
