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

use crate::error::ExportError;
use crate::render::RenderedChart;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes `chart_{n}.png` for every chart into `dir`, creating it if needed.
pub fn write_chart_images(charts: &[RenderedChart], dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    fs::create_dir_all(dir)?;
    charts
        .iter()
        .map(|chart| {
            let path = dir.join(chart.png_file_name());
            fs::write(&path, &chart.png)?;
            Ok(path)
        })
        .collect()
}
