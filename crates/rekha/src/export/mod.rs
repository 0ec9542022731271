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

pub mod images;
pub mod pdf;
pub mod pptx;

pub use images::write_chart_images;
pub use pdf::build_pdf;
pub use pptx::build_deck;

use crate::error::ExportError;
use crate::render::RenderedChart;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

pub const DECK_FILE_NAME: &str = "rekha_charts_report.pptx";
pub const PDF_FILE_NAME: &str = "rekha_charts_report.pdf";

/// Paths of everything written by [`write_report`].
#[derive(Debug, Clone, Serialize)]
pub struct ReportFiles {
    pub deck: PathBuf,
    pub pdf: PathBuf,
    pub images: Vec<PathBuf>,
}

/// Writes the slide deck, the PDF and one PNG per chart into `dir`.
///
/// Only charts that were rendered are exported, so every output holds the
/// same number of charts.
#[instrument(skip(charts), fields(charts = charts.len()))]
pub fn write_report(charts: &[RenderedChart], dir: &Path) -> Result<ReportFiles, ExportError> {
    fs::create_dir_all(dir)?;
    let deck = dir.join(DECK_FILE_NAME);
    fs::write(&deck, build_deck(charts)?)?;
    let pdf = dir.join(PDF_FILE_NAME);
    fs::write(&pdf, build_pdf(charts)?)?;
    let images = write_chart_images(charts, dir)?;
    info!(dir = %dir.display(), "report exported");
    Ok(ReportFiles { deck, pdf, images })
}
