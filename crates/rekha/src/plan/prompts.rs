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

use crate::plan::ResolvedChartConfig;

/// Instructions shared by the batch recommendation and insight refresh calls.
pub const SYSTEM_PROMPT: &str = "You are a senior business data analyst who recommends charts for a dataset.

Available chart types: Bar, Line, Scatter, Pie, Histogram, Heatmap, Box, Area, Bubble, Stacked Bar.

Rules:
- Only use column names that appear in the data sample.
- Line, Scatter, Box, Area and Bubble charts need a numeric y column.
- When no numeric column fits, use a count-based aggregation and set y to null.
- Pie and Histogram charts only use x; set y to null.
- Prefer a mix of chart types that reveal different aspects of the data.

Write each insight as exactly three bullets in this format:
- **Key Observation:** what the chart shows.
- **Business Impact:** why it matters.
- **Recommended Action:** what to do next.

Respond with a JSON list only, no prose, where every element looks like:
{\"chart_type\": \"Bar\", \"x\": \"column name\", \"y\": \"column name or null\", \"insight\": \"three bullets\"}";

pub fn batch_user_message(sample_csv: &str, chart_count: usize) -> String {
    format!(
        "Here is a data sample:\n{sample_csv}\n\nGenerate {chart_count} intelligent chart recommendations."
    )
}

pub fn insight_user_message(config: &ResolvedChartConfig, sample_csv: &str) -> String {
    format!(
        "Given this chart config with x={x}, y={y}, type={kind}, generate a business insight \
         using the 3-bullet format in a brief tone. Respond with a JSON object \
         {{\"insight\": \"...\"}}. Data sample:\n{sample_csv}",
        x = config.x,
        y = config.y.describe(),
        kind = config.chart_type,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RowFilter;
    use crate::plan::{ChartKind, Rgb, YAxis};

    #[test]
    fn test_batch_message_layout() {
        let message = batch_user_message("a,b\n1,2\n", 4);
        assert_eq!(
            message,
            "Here is a data sample:\na,b\n1,2\n\n\nGenerate 4 intelligent chart recommendations."
        );
    }

    #[test]
    fn test_insight_message_names_count_for_missing_y() {
        let config = ResolvedChartConfig {
            chart_type: ChartKind::Pie,
            x: "Region".into(),
            y: YAxis::Discarded,
            color: Rgb(0, 0, 0),
            filters: RowFilter::new(),
        };
        let message = insight_user_message(&config, "Region\nN\n");
        assert!(message.contains("x=Region, y=count, type=Pie"));
        assert!(message.ends_with("Data sample:\nRegion\nN\n"));
    }
}
