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

use proptest::prelude::*;
use rekha::plan::validator::to_raw_plan;
use rekha::{ChartKind, DataFormat, Dataset, DatasetNormalizer, PlanValidator, RawChartPlan, YAxis};

fn sales() -> Dataset {
    DatasetNormalizer::new()
        .load(common::SALES_CSV.as_bytes(), DataFormat::Csv)
        .unwrap()
}

fn plan(chart_type: &str, x: &str, y: Option<&str>) -> RawChartPlan {
    RawChartPlan {
        chart_type: Some(chart_type.to_string()),
        x: Some(x.to_string()),
        y: y.map(str::to_string),
        insight: Some("- note".to_string()),
    }
}

#[test]
fn test_unknown_x_falls_back_to_first_column() {
    let ds = sales();
    let config = PlanValidator::new(&ds).resolve(&plan("Bar", "Profit", Some("Sales")));
    assert_eq!(config.x, "Category");
    assert_eq!(config.y, YAxis::Column("Sales".into()));
}

#[test]
fn test_unknown_chart_type_becomes_bar() {
    let ds = sales();
    let config = PlanValidator::new(&ds).resolve(&plan("Sankey", "Category", Some("Sales")));
    assert_eq!(config.chart_type, ChartKind::Bar);
}

#[test]
fn test_text_y_on_numeric_kinds_falls_back_to_count() {
    let ds = sales();
    let validator = PlanValidator::new(&ds);
    for kind in ["Line", "Scatter", "Box", "Area", "Bubble"] {
        let config = validator.resolve(&plan(kind, "Category", Some("Date")));
        assert_eq!(config.y, YAxis::CountFallback, "{kind}");
    }
}

#[test]
fn test_pie_and_histogram_discard_y() {
    let ds = sales();
    let validator = PlanValidator::new(&ds);
    assert_eq!(validator.resolve(&plan("Pie", "Category", Some("Sales"))).y, YAxis::Discarded);
    assert_eq!(validator.resolve(&plan("histogram", "Sales", None)).y, YAxis::Discarded);
}

#[test]
fn test_missing_y_on_bar_uses_first_numeric_column() {
    let ds = sales();
    let config = PlanValidator::new(&ds).resolve(&plan("Bar", "Date", None));
    assert_eq!(config.y, YAxis::Column("Sales".into()));
}

#[test]
fn test_lenient_type_spelling() {
    let ds = sales();
    let config = PlanValidator::new(&ds).resolve(&plan("stacked_bar", "Category", Some("Date")));
    assert_eq!(config.chart_type, ChartKind::StackedBar);
    assert_eq!(config.y, YAxis::Column("Date".into()));
}

fn arbitrary_plan() -> impl Strategy<Value = RawChartPlan> {
    let kinds = prop::sample::select(vec![
        "Bar", "Line", "Scatter", "Pie", "Histogram", "Heatmap", "Box", "Area", "Bubble",
        "Stacked Bar", "stackedbar", "donut", "",
    ]);
    let columns = prop::sample::select(vec!["Category", "Date", "Sales", "sales", " Date ", "Missing", ""]);
    (
        prop::option::of(kinds),
        prop::option::of(columns.clone()),
        prop::option::of(columns),
    )
        .prop_map(|(kind, x, y)| RawChartPlan {
            chart_type: kind.map(str::to_string),
            x: x.map(str::to_string),
            y: y.map(str::to_string),
            insight: None,
        })
}

proptest! {
    #[test]
    fn test_resolving_same_plan_twice_is_identical(raw in arbitrary_plan()) {
        let ds = sales();
        let validator = PlanValidator::new(&ds);
        prop_assert_eq!(validator.resolve(&raw), validator.resolve(&raw));
        prop_assert_eq!(validator.resolve(&raw), PlanValidator::new(&ds).resolve(&raw));
    }

    #[test]
    fn test_resolution_is_idempotent(raw in arbitrary_plan()) {
        let ds = sales();
        let validator = PlanValidator::new(&ds);
        let first = validator.resolve(&raw);
        let second = validator.resolve(&to_raw_plan(&first, ""));
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_resolved_configs_are_renderable(raw in arbitrary_plan()) {
        let ds = sales();
        let config = PlanValidator::new(&ds).resolve(&raw);
        prop_assert!(ds.has_column(&config.x));
        if config.chart_type.requires_numeric_y() {
            let numeric_or_count = match &config.y {
                YAxis::Column(name) => ds.is_numeric(name),
                YAxis::CountFallback => true,
                YAxis::Discarded => false,
            };
            prop_assert!(numeric_or_count);
        }
        if config.chart_type.ignores_y() {
            prop_assert_eq!(&config.y, &YAxis::Discarded);
        }
    }
}
