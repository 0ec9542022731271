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

use rekha::data::COUNT_COLUMN;
use rekha::plan::Rgb;
use rekha::render::PlottableSeries;
use rekha::{
    ChartKind, ChartRenderer, DataFormat, Dataset, DatasetNormalizer, PlanValidator, RawChartPlan,
    RenderError, ResolvedChartConfig, RowFilter, YAxis,
};

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

fn load(csv: &str) -> Dataset {
    DatasetNormalizer::new().load(csv.as_bytes(), DataFormat::Csv).unwrap()
}

fn resolve(ds: &Dataset, kind: &str, x: &str, y: Option<&str>) -> ResolvedChartConfig {
    PlanValidator::new(ds).resolve(&RawChartPlan {
        chart_type: Some(kind.to_string()),
        x: Some(x.to_string()),
        y: y.map(str::to_string),
        insight: None,
    })
}

fn renderer() -> ChartRenderer {
    ChartRenderer::new(400, 300)
}

#[test]
fn test_every_kind_encodes_a_png() {
    let ds = load(common::SALES_CSV);
    let cases = [
        ("Bar", "Category", Some("Sales")),
        ("Line", "Date", Some("Sales")),
        ("Scatter", "Category", Some("Sales")),
        ("Pie", "Category", None),
        ("Histogram", "Sales", None),
        ("Heatmap", "Category", Some("Date")),
        ("Box", "Category", Some("Sales")),
        ("Area", "Date", Some("Sales")),
        ("Bubble", "Date", Some("Sales")),
        ("Stacked Bar", "Category", Some("Sales")),
    ];
    for (index, (kind, x, y)) in cases.into_iter().enumerate() {
        let config = resolve(&ds, kind, x, y);
        let chart = renderer().render(index, &config, &ds, "- insight").unwrap();
        assert_eq!(chart.rendered_kind, config.chart_type, "{kind}");
        assert!(chart.warnings.is_empty(), "{kind}: {:?}", chart.warnings);
        assert_eq!(&chart.png[..8], &PNG_MAGIC, "{kind}");
        assert_eq!(chart.image_size, (400, 300));
        assert_eq!(chart.png_file_name(), format!("chart_{}.png", index + 1));
    }
}

#[test]
fn test_text_y_falls_back_to_count_bars_with_warning() {
    let ds = load(common::SALES_CSV);
    let mut config = resolve(&ds, "Scatter", "Category", Some("Sales"));
    config.y = YAxis::Column("Date".into());
    let chart = renderer().render(1, &config, &ds, "").unwrap();

    assert_eq!(chart.rendered_kind, ChartKind::Bar);
    assert_eq!(chart.prepared.y_label, COUNT_COLUMN);
    assert_eq!(
        chart.warnings,
        vec!["Chart 2: Y-axis 'Date' is not numeric for Scatter chart. Using bar chart instead.".to_string()]
    );
    match &chart.prepared.series {
        PlottableSeries::Bars { categories, values } => {
            assert_eq!(categories, &["Furniture", "Office", "Tech"]);
            assert_eq!(values, &[2.0, 2.0, 2.0]);
        }
        other => panic!("unexpected series {other:?}"),
    }
}

#[test]
fn test_every_numeric_y_kind_falls_back_on_text_y() {
    let ds = load(common::SALES_CSV);
    for kind in [ChartKind::Line, ChartKind::Box, ChartKind::Area, ChartKind::Bubble] {
        let mut config = resolve(&ds, &kind.to_string(), "Category", Some("Sales"));
        assert_eq!(config.chart_type, kind);
        config.y = YAxis::Column("Date".into());
        let chart = renderer().render(0, &config, &ds, "").unwrap();

        assert_eq!(chart.rendered_kind, ChartKind::Bar, "{kind}");
        assert_eq!(chart.prepared.y_label, COUNT_COLUMN, "{kind}");
        assert_eq!(
            chart.warnings,
            vec![format!("Chart 1: Y-axis 'Date' is not numeric for {kind} chart. Using bar chart instead.")]
        );
        assert_eq!(&chart.png[..8], &PNG_MAGIC, "{kind}");
    }
}

#[test]
fn test_line_with_many_dates_keeps_ten_highest_in_date_order() {
    let mut csv = String::from("Date,Sales\n");
    for day in 1..=30 {
        csv.push_str(&format!("2024-01-{day:02},{day}\n"));
    }
    let ds = load(&csv);
    let config = resolve(&ds, "Line", "Date", Some("Sales"));
    let chart = renderer().render(0, &config, &ds, "").unwrap();
    match &chart.prepared.series {
        PlottableSeries::Line {
            categories,
            values,
            filled,
        } => {
            assert!(!filled);
            assert_eq!(categories.len(), 10);
            assert_eq!(categories.first().unwrap(), "2024-01-21");
            assert_eq!(categories.last().unwrap(), "2024-01-30");
            assert_eq!(values.first(), Some(&21.0));
        }
        other => panic!("unexpected series {other:?}"),
    }
}

#[test]
fn test_pie_shares_sum_to_one() {
    let ds = load("Region\nNorth\nNorth\nSouth\nEast\n");
    let config = resolve(&ds, "Pie", "Region", None);
    let chart = renderer().render(0, &config, &ds, "").unwrap();
    match &chart.prepared.series {
        PlottableSeries::Pie { slices } => {
            assert_eq!(slices[0].label, "North");
            assert_eq!(slices[0].count, 2.0);
            let total: f64 = slices.iter().map(|s| s.share).sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
        other => panic!("unexpected series {other:?}"),
    }
}

#[test]
fn test_stacked_bar_with_text_y_counts_combinations() {
    let ds = load("Region,Segment\nN,Retail\nN,Retail\nN,Online\nS,Online\n");
    let config = resolve(&ds, "Stacked Bar", "Region", Some("Segment"));
    let chart = renderer().render(0, &config, &ds, "").unwrap();
    match &chart.prepared.series {
        PlottableSeries::Stacked { categories, series } => {
            assert_eq!(categories, &["N", "S"]);
            let online = series.iter().find(|s| s.name == "Online").unwrap();
            let retail = series.iter().find(|s| s.name == "Retail").unwrap();
            assert_eq!(online.values, vec![1.0, 1.0]);
            assert_eq!(retail.values, vec![2.0, 0.0]);
        }
        other => panic!("unexpected series {other:?}"),
    }
}

#[test]
fn test_heatmap_counts_pairs() {
    let ds = load(common::SALES_CSV);
    let config = resolve(&ds, "Heatmap", "Category", Some("Date"));
    let chart = renderer().render(0, &config, &ds, "").unwrap();
    match &chart.prepared.series {
        PlottableSeries::Heatmap {
            x_labels,
            y_labels,
            counts,
        } => {
            assert_eq!(x_labels.len(), 3);
            assert_eq!(y_labels.len(), 3);
            let total: f64 = counts.iter().flatten().sum();
            assert_eq!(total, 6.0);
        }
        other => panic!("unexpected series {other:?}"),
    }
}

#[test]
fn test_empty_slice_is_reported_with_chart_number() {
    let ds = load(common::SALES_CSV);
    let mut config = resolve(&ds, "Bar", "Category", Some("Sales"));
    config.filters.select("Category", Vec::<String>::new());
    let slice = config.filters.apply(&ds);
    let err = renderer().render(2, &config, &slice, "").unwrap_err();
    assert!(matches!(err, RenderError::EmptySlice { chart: 3 }));
}

#[test]
fn test_preview_drops_incomplete_rows() {
    let ds = load("Region,Sales,Note\nN,10,a\nS,,b\nE,5,c\n");
    let config = ResolvedChartConfig {
        chart_type: ChartKind::Bar,
        x: "Region".into(),
        y: YAxis::Column("Sales".into()),
        color: Rgb(200, 40, 40),
        filters: RowFilter::new(),
    };
    let chart = renderer().render(0, &config, &ds, "").unwrap();
    let preview = chart.data_preview();
    assert_eq!(preview.column_names(), &["Region", "Sales"]);
    assert_eq!(preview.row_count(), 2);
}
