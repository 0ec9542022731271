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

use crate::plan::ChartKind;
use serde::Serialize;

/// Chart data after aggregation, ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PlottableSeries {
    Bars {
        categories: Vec<String>,
        values: Vec<f64>,
    },
    Line {
        categories: Vec<String>,
        values: Vec<f64>,
        filled: bool,
    },
    Scatter {
        points: Vec<ScatterPoint>,
        /// Present when x is a text column; point x values are category indices.
        x_categories: Option<Vec<String>>,
    },
    Histogram {
        bins: Vec<HistogramBin>,
    },
    Pie {
        slices: Vec<PieSlice>,
    },
    Heatmap {
        x_labels: Vec<String>,
        y_labels: Vec<String>,
        /// `counts[y][x]`
        counts: Vec<Vec<f64>>,
    },
    Boxes {
        groups: Vec<BoxStats>,
    },
    Stacked {
        categories: Vec<String>,
        series: Vec<StackSeries>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    /// Marker radius in pixels.
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub label: String,
    pub count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub label: String,
    pub count: f64,
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxStats {
    pub label: String,
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackSeries {
    pub name: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedChart {
    /// Kind actually drawn; differs from the configured kind after a count fallback.
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub series: PlottableSeries,
    pub warning: Option<String>,
}

impl PreparedChart {
    pub fn is_fallback(&self) -> bool {
        self.warning.is_some()
    }
}
