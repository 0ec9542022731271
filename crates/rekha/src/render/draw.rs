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

//! Rasterises a [`PreparedChart`] with plotters and encodes it as PNG.

use super::palette::{cycle, viridis, PASTEL, SET3};
use super::plot::{BoxStats, PieSlice, PlottableSeries, PreparedChart, ScatterPoint, StackSeries};
use crate::error::RenderError;
use crate::plan::Rgb;
use image::{ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::f64::consts::PI;
use std::io::Cursor;
use std::sync::OnceLock;
use tracing::{debug, warn};

type Canvas<'a> = DrawingArea<BitMapBackend<'a>, Shift>;
type DrawResult = Result<(), Box<dyn std::error::Error>>;

const FONT: &str = "sans-serif";
const MAX_LABEL_CHARS: usize = 14;

/// DejaVu Sans, registered as [`FONT`] so labels render without system fonts.
static BUNDLED_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
static FONT_READY: OnceLock<bool> = OnceLock::new();

fn ensure_font() -> Result<(), RenderError> {
    let ready = *FONT_READY.get_or_init(|| {
        let registered =
            plotters::style::register_font(FONT, plotters::style::FontStyle::Normal, BUNDLED_FONT).is_ok();
        if !registered {
            warn!("bundled chart font could not be parsed");
        }
        registered
    });
    if ready {
        Ok(())
    } else {
        Err(RenderError::Draw("bundled chart font could not be loaded".to_string()))
    }
}

impl From<Rgb> for RGBColor {
    fn from(color: Rgb) -> Self {
        RGBColor(color.0, color.1, color.2)
    }
}

/// Draws the chart into an RGB buffer of `width`×`height` and returns PNG bytes.
pub fn encode_png(chart: &PreparedChart, color: Rgb, width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
    ensure_font()?;
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        draw_chart(&root, chart, color.into()).map_err(|err| RenderError::Draw(err.to_string()))?;
        root.present().map_err(|err| RenderError::Draw(err.to_string()))?;
    }
    let image = RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| RenderError::Encode("pixel buffer does not match image size".to_string()))?;
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|err| RenderError::Encode(err.to_string()))?;
    debug!(kind = %chart.kind, bytes = png.len(), "encoded chart");
    Ok(png)
}

fn draw_chart(root: &Canvas<'_>, chart: &PreparedChart, color: RGBColor) -> DrawResult {
    root.fill(&WHITE)?;
    match &chart.series {
        PlottableSeries::Bars { categories, values } => draw_bars(root, chart, categories, values, color),
        PlottableSeries::Histogram { bins } => {
            let categories: Vec<String> = bins.iter().map(|bin| bin.label.clone()).collect();
            let values: Vec<f64> = bins.iter().map(|bin| bin.count).collect();
            draw_bars(root, chart, &categories, &values, color)
        }
        PlottableSeries::Line {
            categories,
            values,
            filled,
        } => draw_line(root, chart, categories, values, *filled, color),
        PlottableSeries::Scatter { points, x_categories } => {
            draw_scatter(root, chart, points, x_categories.as_deref(), color)
        }
        PlottableSeries::Pie { slices } => draw_pie(root, chart, slices),
        PlottableSeries::Heatmap {
            x_labels,
            y_labels,
            counts,
        } => draw_heatmap(root, chart, x_labels, y_labels, counts),
        PlottableSeries::Boxes { groups } => draw_boxes(root, chart, groups, color),
        PlottableSeries::Stacked { categories, series } => draw_stacked(root, chart, categories, series),
    }
}

fn short_label(label: &str) -> String {
    if label.chars().count() > MAX_LABEL_CHARS {
        let head: String = label.chars().take(MAX_LABEL_CHARS - 1).collect();
        format!("{head}…")
    } else {
        label.to_string()
    }
}

fn segment_label(labels: &[String], value: &SegmentValue<i32>) -> String {
    match value {
        SegmentValue::CenterOf(i) => usize::try_from(*i)
            .ok()
            .and_then(|i| labels.get(i))
            .map(|label| short_label(label))
            .unwrap_or_default(),
        SegmentValue::Exact(_) | SegmentValue::Last => String::new(),
    }
}

/// Value range padded by 10%, always including zero.
fn value_range(values: impl IntoIterator<Item = f64>) -> std::ops::Range<f64> {
    let (low, high) = values
        .into_iter()
        .fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = ((high - low) * 0.1).max(1e-9);
    let high = if high - low < 1e-9 { high + 1.0 } else { high + pad };
    let low = if low < 0.0 { low - pad } else { low };
    low..high
}

fn segment_count(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

fn draw_bars(
    root: &Canvas<'_>,
    chart: &PreparedChart,
    categories: &[String],
    values: &[f64],
    color: RGBColor,
) -> DrawResult {
    let n = segment_count(categories.len());
    let mut ctx = ChartBuilder::on(root)
        .margin(10)
        .caption(&chart.title, (FONT, 24))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((0..n).into_segmented(), value_range(values.iter().copied()))?;
    let label = |v: &SegmentValue<i32>| segment_label(categories, v);
    ctx.configure_mesh()
        .disable_x_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .x_labels(categories.len())
        .x_label_formatter(&label)
        .draw()?;
    ctx.draw_series(values.iter().zip(0..).map(|(value, i)| {
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *value)],
            color.filled(),
        );
        bar.set_margin(0, 0, 4, 4);
        bar
    }))?;
    Ok(())
}

fn draw_line(
    root: &Canvas<'_>,
    chart: &PreparedChart,
    categories: &[String],
    values: &[f64],
    filled: bool,
    color: RGBColor,
) -> DrawResult {
    let n = segment_count(categories.len());
    let mut ctx = ChartBuilder::on(root)
        .margin(10)
        .caption(&chart.title, (FONT, 24))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((0..n).into_segmented(), value_range(values.iter().copied()))?;
    let label = |v: &SegmentValue<i32>| segment_label(categories, v);
    ctx.configure_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .x_labels(categories.len())
        .x_label_formatter(&label)
        .draw()?;
    let points: Vec<(SegmentValue<i32>, f64)> = values
        .iter()
        .zip(0..)
        .map(|(value, i)| (SegmentValue::CenterOf(i), *value))
        .collect();
    if filled {
        ctx.draw_series(
            AreaSeries::new(points.iter().cloned(), 0.0, &color.mix(0.3)).border_style(color.stroke_width(2)),
        )?;
    } else {
        ctx.draw_series(LineSeries::new(points.iter().cloned(), color.stroke_width(2)))?;
    }
    ctx.draw_series(points.into_iter().map(|point| Circle::new(point, 4, color.filled())))?;
    Ok(())
}

fn draw_scatter(
    root: &Canvas<'_>,
    chart: &PreparedChart,
    points: &[ScatterPoint],
    x_categories: Option<&[String]>,
    color: RGBColor,
) -> DrawResult {
    let x_range = match x_categories {
        Some(categories) => -0.5..(categories.len() as f64 - 0.5),
        None => {
            let (lo, hi) = points
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| (lo.min(p.x), hi.max(p.x)));
            let pad = ((hi - lo) * 0.05).max(0.5);
            (lo - pad)..(hi + pad)
        }
    };
    let mut ctx = ChartBuilder::on(root)
        .margin(10)
        .caption(&chart.title, (FONT, 24))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, value_range(points.iter().map(|p| p.y)))?;
    let categorical = |x: &f64| {
        let index = x.round();
        match x_categories {
            Some(labels) if (x - index).abs() < 1e-6 && index >= 0.0 => {
                labels.get(index as usize).map(|l| short_label(l)).unwrap_or_default()
            }
            Some(_) => String::new(),
            None => format!("{x:.2}"),
        }
    };
    let mut mesh = ctx.configure_mesh();
    mesh.x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .x_label_formatter(&categorical);
    if let Some(labels) = x_categories {
        mesh.x_labels(labels.len());
    }
    mesh.draw()?;
    ctx.draw_series(points.iter().map(|p| {
        Circle::new((p.x, p.y), p.size.round() as i32, color.mix(0.7).filled())
    }))?;
    Ok(())
}

fn draw_pie(root: &Canvas<'_>, chart: &PreparedChart, slices: &[PieSlice]) -> DrawResult {
    let area = root.titled(&chart.title, (FONT, 24))?;
    let (width, height) = area.dim_in_pixel();
    let radius = f64::from(width.min(height)) * 0.4;
    let center = (f64::from(width) * 0.4, f64::from(height) * 0.5);
    let mut start = -PI / 2.0;
    for (i, slice) in slices.iter().enumerate() {
        let sweep = slice.share * 2.0 * PI;
        let steps = ((sweep / (PI / 90.0)).ceil() as usize).max(1);
        let mut outline = vec![(center.0 as i32, center.1 as i32)];
        outline.extend((0..=steps).map(|step| {
            let angle = start + sweep * step as f64 / steps as f64;
            (
                (center.0 + radius * angle.cos()) as i32,
                (center.1 + radius * angle.sin()) as i32,
            )
        }));
        let fill: RGBColor = cycle(&SET3, i).into();
        area.draw(&Polygon::new(outline, fill.filled()))?;
        let legend_y = 20 + 22 * i32::try_from(i).unwrap_or(i32::MAX / 32);
        let legend_x = (f64::from(width) * 0.8) as i32;
        area.draw(&Rectangle::new(
            [(legend_x, legend_y), (legend_x + 14, legend_y + 14)],
            fill.filled(),
        ))?;
        area.draw(&Text::new(
            format!("{} ({:.1}%)", short_label(&slice.label), slice.share * 100.0),
            (legend_x + 20, legend_y),
            (FONT, 14),
        ))?;
        start += sweep;
    }
    Ok(())
}

fn draw_heatmap(
    root: &Canvas<'_>,
    chart: &PreparedChart,
    x_labels: &[String],
    y_labels: &[String],
    counts: &[Vec<f64>],
) -> DrawResult {
    let mut ctx = ChartBuilder::on(root)
        .margin(10)
        .caption(&chart.title, (FONT, 24))
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(
            (0..segment_count(x_labels.len())).into_segmented(),
            (0..segment_count(y_labels.len())).into_segmented(),
        )?;
    let x_label = |v: &SegmentValue<i32>| segment_label(x_labels, v);
    let y_label = |v: &SegmentValue<i32>| segment_label(y_labels, v);
    ctx.configure_mesh()
        .disable_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .x_labels(x_labels.len())
        .y_labels(y_labels.len())
        .x_label_formatter(&x_label)
        .y_label_formatter(&y_label)
        .draw()?;
    let peak = counts.iter().flatten().copied().fold(0.0_f64, f64::max).max(1.0);
    let cells = counts.iter().zip(0..).flat_map(|(row, j)| {
        row.iter().zip(0..).map(move |(count, i)| {
            let fill: RGBColor = viridis(count / peak).into();
            Rectangle::new(
                [
                    (SegmentValue::Exact(i), SegmentValue::Exact(j)),
                    (SegmentValue::Exact(i + 1), SegmentValue::Exact(j + 1)),
                ],
                fill.filled(),
            )
        })
    });
    ctx.draw_series(cells)?;
    Ok(())
}

fn draw_boxes(root: &Canvas<'_>, chart: &PreparedChart, groups: &[BoxStats], color: RGBColor) -> DrawResult {
    let labels: Vec<String> = groups.iter().map(|g| g.label.clone()).collect();
    let values = groups.iter().flat_map(|g| [g.lower_whisker, g.upper_whisker]);
    let mut ctx = ChartBuilder::on(root)
        .margin(10)
        .caption(&chart.title, (FONT, 24))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((0..segment_count(groups.len())).into_segmented(), value_range(values))?;
    let label = |v: &SegmentValue<i32>| segment_label(&labels, v);
    ctx.configure_mesh()
        .disable_x_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .x_labels(labels.len())
        .x_label_formatter(&label)
        .draw()?;
    for (group, i) in groups.iter().zip(0..) {
        let mut body = Rectangle::new(
            [(SegmentValue::Exact(i), group.q1), (SegmentValue::Exact(i + 1), group.q3)],
            color.mix(0.5).filled(),
        );
        body.set_margin(0, 0, 12, 12);
        ctx.draw_series(std::iter::once(body))?;
        ctx.draw_series([
            PathElement::new(
                vec![(SegmentValue::Exact(i), group.median), (SegmentValue::Exact(i + 1), group.median)],
                BLACK.stroke_width(2),
            ),
            PathElement::new(
                vec![(SegmentValue::CenterOf(i), group.lower_whisker), (SegmentValue::CenterOf(i), group.q1)],
                color.stroke_width(1),
            ),
            PathElement::new(
                vec![(SegmentValue::CenterOf(i), group.q3), (SegmentValue::CenterOf(i), group.upper_whisker)],
                color.stroke_width(1),
            ),
        ])?;
    }
    Ok(())
}

fn draw_stacked(root: &Canvas<'_>, chart: &PreparedChart, categories: &[String], series: &[StackSeries]) -> DrawResult {
    let totals: Vec<f64> = (0..categories.len())
        .map(|i| series.iter().filter_map(|s| s.values.get(i)).sum())
        .collect();
    let mut ctx = ChartBuilder::on(root)
        .margin(10)
        .caption(&chart.title, (FONT, 24))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (0..segment_count(categories.len())).into_segmented(),
            value_range(totals.iter().copied()),
        )?;
    let label = |v: &SegmentValue<i32>| segment_label(categories, v);
    ctx.configure_mesh()
        .disable_x_mesh()
        .x_desc(chart.x_label.as_str())
        .y_desc(chart.y_label.as_str())
        .x_labels(categories.len())
        .x_label_formatter(&label)
        .draw()?;
    let mut base = vec![0.0; categories.len()];
    for (s, stack) in series.iter().enumerate() {
        let fill: RGBColor = cycle(&PASTEL, s).into();
        let segments: Vec<Rectangle<(SegmentValue<i32>, f64)>> = stack
            .values
            .iter()
            .zip(base.iter_mut())
            .zip(0..)
            .filter(|((value, _), _)| **value != 0.0)
            .map(|((value, bottom), i)| {
                let top = *bottom + value;
                let mut bar = Rectangle::new(
                    [(SegmentValue::Exact(i), *bottom), (SegmentValue::Exact(i + 1), top)],
                    fill.filled(),
                );
                bar.set_margin(0, 0, 4, 4);
                *bottom = top;
                bar
            })
            .collect();
        ctx.draw_series(segments)?
            .label(short_label(&stack.name))
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], fill.filled()));
    }
    ctx.configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    Ok(())
}
