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

use crate::data::{per_chart_filter_columns, Dataset, RowFilter};
use crate::plan::resolved::{ResolvedChartConfig, Rgb, YAxis};
use crate::plan::{ChartKind, RawChartPlan};
use crate::settings::DEFAULT_CHART_COLOR;
use tracing::debug;

const DEFAULT_FILTER_CARDINALITY: usize = 20;

/// Resolves untrusted plans against a dataset. Resolution never fails.
#[derive(Debug, Clone)]
pub struct PlanValidator<'a> {
    dataset: &'a Dataset,
    filter_columns: Vec<String>,
    default_color: Rgb,
}

impl<'a> PlanValidator<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        Self {
            dataset,
            filter_columns: per_chart_filter_columns(dataset, DEFAULT_FILTER_CARDINALITY)
                .into_iter()
                .map(str::to_string)
                .collect(),
            default_color: Rgb::parse_hex(DEFAULT_CHART_COLOR).unwrap_or(Rgb(0x1f, 0x77, 0xb4)),
        }
    }

    pub fn with_filter_cardinality(mut self, max_cardinality: usize) -> Self {
        self.filter_columns = per_chart_filter_columns(self.dataset, max_cardinality)
            .into_iter()
            .map(str::to_string)
            .collect();
        self
    }

    pub fn with_default_color(mut self, color: Rgb) -> Self {
        self.default_color = color;
        self
    }

    pub fn filter_columns(&self) -> &[String] {
        &self.filter_columns
    }

    pub fn resolve(&self, plan: &RawChartPlan) -> ResolvedChartConfig {
        let chart_type = plan
            .chart_type
            .as_deref()
            .and_then(ChartKind::parse_lenient)
            .unwrap_or(ChartKind::Bar);

        let x = plan
            .x
            .as_deref()
            .and_then(|name| self.lookup(name))
            .or_else(|| self.dataset.first_column())
            .unwrap_or_default()
            .to_string();

        let requested_y = plan.y.as_deref().and_then(|name| self.lookup(name));
        let y = if chart_type.ignores_y() {
            YAxis::Discarded
        } else if chart_type.requires_numeric_y() {
            match requested_y {
                Some(name) if self.dataset.is_numeric(name) => YAxis::Column(name.to_string()),
                _ => YAxis::CountFallback,
            }
        } else {
            match requested_y.or_else(|| self.dataset.numeric_columns().first().copied()) {
                Some(name) => YAxis::Column(name.to_string()),
                None => YAxis::CountFallback,
            }
        };

        let config = ResolvedChartConfig {
            chart_type,
            x,
            y,
            color: self.default_color,
            filters: RowFilter::all_values(self.dataset, self.filter_columns.iter().map(String::as_str)),
        };
        debug!(
            requested = ?plan.chart_type,
            resolved = %config.chart_type,
            x = %config.x,
            y = config.y.describe(),
            "plan resolved"
        );
        config
    }

    pub fn resolve_all(&self, plans: &[RawChartPlan]) -> Vec<ResolvedChartConfig> {
        plans.iter().map(|plan| self.resolve(plan)).collect()
    }

    /// Exact column match first, then a case-insensitive match on the trimmed name.
    fn lookup(&self, requested: &str) -> Option<&'a str> {
        let names = self.dataset.column_names();
        names
            .iter()
            .find(|name| name.as_str() == requested)
            .or_else(|| {
                let wanted = requested.trim();
                names.iter().find(|name| name.eq_ignore_ascii_case(wanted))
            })
            .map(String::as_str)
    }
}

/// Expresses a resolved configuration as a plan that resolves to the same configuration.
pub fn to_raw_plan(config: &ResolvedChartConfig, insight: &str) -> RawChartPlan {
    RawChartPlan {
        chart_type: Some(config.chart_type.label().to_string()),
        x: Some(config.x.clone()),
        y: config.y.column().map(str::to_string),
        insight: Some(insight.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataFormat, DatasetNormalizer};

    fn dataset() -> Dataset {
        DatasetNormalizer::new()
            .load(
                b"Category,Date,Sales,Region\nA,2024-01-01,10,N\nB,2024-01-02,20,S\nA,2024-01-03,5,N\n",
                DataFormat::Csv,
            )
            .unwrap()
    }

    fn plan(chart_type: &str, x: &str, y: Option<&str>) -> RawChartPlan {
        RawChartPlan {
            chart_type: Some(chart_type.to_string()),
            x: Some(x.to_string()),
            y: y.map(str::to_string),
            insight: None,
        }
    }

    #[test]
    fn test_case_insensitive_column_lookup() {
        let ds = dataset();
        let config = PlanValidator::new(&ds).resolve(&plan("bar", "category", Some("sales")));
        assert_eq!(config.x, "Category");
        assert_eq!(config.y, YAxis::Column("Sales".into()));
    }

    #[test]
    fn test_bar_keeps_existing_text_y() {
        let ds = dataset();
        let config = PlanValidator::new(&ds).resolve(&plan("Bar", "Category", Some("Region")));
        assert_eq!(config.y, YAxis::Column("Region".into()));
    }

    #[test]
    fn test_filters_cover_low_cardinality_text_columns() {
        let ds = dataset();
        let validator = PlanValidator::new(&ds);
        let config = validator.resolve(&RawChartPlan::default());
        assert_eq!(
            config.filters.columns().collect::<Vec<_>>(),
            vec!["Category", "Date", "Region"]
        );
        assert_eq!(config.filters.allowed("Category").unwrap().len(), 2);

        let narrow = PlanValidator::new(&ds).with_filter_cardinality(3);
        assert_eq!(narrow.filter_columns(), &["Category".to_string(), "Region".to_string()]);
    }
}
