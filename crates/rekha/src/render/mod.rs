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

pub mod aggregate;
pub mod draw;
pub mod kinds;
pub mod palette;
pub mod plot;

pub use draw::encode_png;
pub use kinds::{renderer_for, ChartKindRenderer};
pub use plot::{PlottableSeries, PreparedChart};

use crate::data::Dataset;
use crate::error::RenderError;
use crate::plan::{ChartKind, ResolvedChartConfig};
use crate::settings::RenderSettings;
use tracing::{info, instrument, warn};

/// A chart that has been prepared and encoded once; the PNG is shared by
/// every consumer (preview, slide deck, PDF, image export).
#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub index: usize,
    pub config: ResolvedChartConfig,
    pub rendered_kind: ChartKind,
    pub prepared: PreparedChart,
    pub data: Dataset,
    pub png: Vec<u8>,
    pub image_size: (u32, u32),
    pub insight_text: String,
    pub warnings: Vec<String>,
    preview_rows: usize,
}

impl RenderedChart {
    /// 1-based chart number used in notices and file names.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn png_file_name(&self) -> String {
        format!("chart_{}.png", self.number())
    }

    /// The x and y columns of the slice without incomplete rows.
    pub fn data_preview(&self) -> Dataset {
        let mut columns = vec![self.config.x.as_str()];
        if let Some(y) = self.config.y.column() {
            if self.data.has_column(y) {
                columns.push(y);
            }
        }
        self.data
            .project(&columns)
            .drop_missing(&columns)
            .head(self.preview_rows)
    }

    pub fn set_insight(&mut self, text: impl Into<String>) {
        self.insight_text = text.into();
    }
}

#[derive(Debug, Clone)]
pub struct ChartRenderer {
    width: u32,
    height: u32,
    preview_rows: usize,
}

impl Default for ChartRenderer {
    fn default() -> Self {
        Self::from_settings(&RenderSettings::default())
    }
}

impl ChartRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            preview_rows: RenderSettings::default().preview_rows,
        }
    }

    pub fn from_settings(settings: &RenderSettings) -> Self {
        Self {
            width: settings.width,
            height: settings.height,
            preview_rows: settings.preview_rows,
        }
    }

    pub fn image_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn prepare(&self, config: &ResolvedChartConfig, slice: &Dataset) -> Result<PreparedChart, RenderError> {
        renderer_for(config.chart_type).prepare(slice, config)
    }

    /// Prepares and encodes chart `index` (0-based) from its filtered slice.
    #[instrument(skip(self, config, slice, insight), fields(kind = %config.chart_type, rows = slice.row_count()))]
    pub fn render(
        &self,
        index: usize,
        config: &ResolvedChartConfig,
        slice: &Dataset,
        insight: &str,
    ) -> Result<RenderedChart, RenderError> {
        if slice.is_empty() {
            warn!(chart = index + 1, "no rows left after filtering");
            return Err(RenderError::EmptySlice { chart: index + 1 });
        }
        let prepared = self.prepare(config, slice)?;
        let mut warnings = Vec::new();
        if let Some(warning) = &prepared.warning {
            warn!(chart = index + 1, "{warning}");
            warnings.push(format!("Chart {}: {warning}", index + 1));
        }
        let png = encode_png(&prepared, config.color, self.width, self.height)?;
        info!(chart = index + 1, rendered = %prepared.kind, "chart rendered");
        Ok(RenderedChart {
            index,
            config: config.clone(),
            rendered_kind: prepared.kind,
            prepared,
            data: slice.clone(),
            png,
            image_size: (self.width, self.height),
            insight_text: insight.to_string(),
            warnings,
            preview_rows: self.preview_rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataFormat, DatasetNormalizer, RowFilter};
    use crate::plan::{Rgb, YAxis};

    fn config(kind: ChartKind, y: YAxis) -> ResolvedChartConfig {
        ResolvedChartConfig {
            chart_type: kind,
            x: "Region".into(),
            y,
            color: Rgb(10, 20, 30),
            filters: RowFilter::new(),
        }
    }

    #[test]
    fn test_empty_slice_is_skipped() {
        let data = DatasetNormalizer::new()
            .load(b"Region,Sales\nN,1\n", DataFormat::Csv)
            .unwrap()
            .filter(|_| false);
        let err = ChartRenderer::new(300, 200)
            .render(2, &config(ChartKind::Bar, YAxis::Column("Sales".into())), &data, "")
            .unwrap_err();
        assert!(matches!(err, RenderError::EmptySlice { chart: 3 }));
    }

    #[test]
    fn test_preview_drops_incomplete_rows() {
        let data = DatasetNormalizer::new()
            .load(b"Region,Sales,Other\nN,1,x\nS,,y\n,3,z\n", DataFormat::Csv)
            .unwrap();
        let chart = ChartRenderer::new(300, 200)
            .render(0, &config(ChartKind::Bar, YAxis::Column("Sales".into())), &data, "insight")
            .unwrap();
        let preview = chart.data_preview();
        assert_eq!(preview.column_names(), &["Region".to_string(), "Sales".to_string()]);
        assert_eq!(preview.row_count(), 1);
        assert_eq!(chart.png_file_name(), "chart_1.png");
        assert_eq!(chart.insight_text, "insight");
    }
}
