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

pub mod cache;
pub mod prompts;
pub mod requester;
pub mod resolved;
pub mod validator;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub use cache::{PlanCache, PlanCacheKey};
pub use requester::{fallback_plans, parse_plan_response, PlanRequester};
pub use resolved::{ResolvedChartConfig, Rgb, YAxis};
pub use validator::PlanValidator;

/// Insight attached to fallback plans when the AI service could not be used.
pub const FALLBACK_INSIGHT: &str = "- **Key Observation:** Default chart generated.\n\
- **Business Impact:** Limited analysis due to API error.\n\
- **Recommended Action:** Try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChartKind {
    Bar,
    Line,
    Scatter,
    Pie,
    Histogram,
    Heatmap,
    Box,
    Area,
    Bubble,
    StackedBar,
}

impl ChartKind {
    pub const ALL: [ChartKind; 10] = [
        ChartKind::Bar,
        ChartKind::Line,
        ChartKind::Scatter,
        ChartKind::Pie,
        ChartKind::Histogram,
        ChartKind::Heatmap,
        ChartKind::Box,
        ChartKind::Area,
        ChartKind::Bubble,
        ChartKind::StackedBar,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ChartKind::Bar => "Bar",
            ChartKind::Line => "Line",
            ChartKind::Scatter => "Scatter",
            ChartKind::Pie => "Pie",
            ChartKind::Histogram => "Histogram",
            ChartKind::Heatmap => "Heatmap",
            ChartKind::Box => "Box",
            ChartKind::Area => "Area",
            ChartKind::Bubble => "Bubble",
            ChartKind::StackedBar => "Stacked Bar",
        }
    }

    /// Lenient lookup: case, spaces, underscores and hyphens are ignored.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let key: String = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL.into_iter().find(|kind| {
            kind.label()
                .chars()
                .filter(|c| *c != ' ')
                .flat_map(char::to_lowercase)
                .eq(key.chars())
        })
    }

    /// Kinds that plot a numeric y value per point.
    pub fn requires_numeric_y(&self) -> bool {
        matches!(
            self,
            ChartKind::Line | ChartKind::Scatter | ChartKind::Box | ChartKind::Area | ChartKind::Bubble
        )
    }

    /// Kinds that only look at the x column.
    pub fn ignores_y(&self) -> bool {
        matches!(self, ChartKind::Pie | ChartKind::Histogram)
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_lenient(s).ok_or_else(|| format!("unknown chart type '{s}'"))
    }
}

/// One chart recommendation as the AI service returned it. Nothing here is trusted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawChartPlan {
    pub chart_type: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
    pub insight: Option<String>,
}

impl RawChartPlan {
    /// Reads a plan from any JSON value; wrong-typed or missing fields become `None`.
    pub fn from_value(value: &Value) -> Self {
        let field = |name: &str| value.get(name).and_then(scalar_text);
        Self {
            chart_type: field("chart_type"),
            x: field("x"),
            y: field("y"),
            insight: field("insight"),
        }
    }

    pub fn insight_text(&self) -> &str {
        self.insight.as_deref().unwrap_or_default()
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlanSource {
    Ai,
    Fallback,
}

/// Plans for one (dataset sample, chart count) pair plus their current insight texts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanBatch {
    pub plans: Vec<RawChartPlan>,
    pub insights: Vec<String>,
    pub source: PlanSource,
}

impl PlanBatch {
    pub fn new(plans: Vec<RawChartPlan>, source: PlanSource) -> Self {
        let insights = plans.iter().map(|p| p.insight_text().to_string()).collect();
        Self {
            plans,
            insights,
            source,
        }
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn insight(&self, index: usize) -> &str {
        self.insights.get(index).map_or("", String::as_str)
    }
}
