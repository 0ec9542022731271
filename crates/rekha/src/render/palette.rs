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

use crate::plan::Rgb;

/// Qualitative palette for pie slices.
pub const SET3: [Rgb; 12] = [
    Rgb(141, 211, 199),
    Rgb(255, 255, 179),
    Rgb(190, 186, 218),
    Rgb(251, 128, 114),
    Rgb(128, 177, 211),
    Rgb(253, 180, 98),
    Rgb(179, 222, 105),
    Rgb(252, 205, 229),
    Rgb(217, 217, 217),
    Rgb(188, 128, 189),
    Rgb(204, 235, 197),
    Rgb(255, 237, 111),
];

/// Qualitative palette for stacked series.
pub const PASTEL: [Rgb; 11] = [
    Rgb(102, 197, 204),
    Rgb(246, 207, 113),
    Rgb(248, 156, 116),
    Rgb(220, 176, 242),
    Rgb(135, 197, 95),
    Rgb(158, 185, 243),
    Rgb(254, 136, 177),
    Rgb(201, 219, 116),
    Rgb(139, 224, 164),
    Rgb(180, 151, 231),
    Rgb(179, 179, 179),
];

const VIRIDIS: [Rgb; 10] = [
    Rgb(0x44, 0x01, 0x54),
    Rgb(0x48, 0x28, 0x78),
    Rgb(0x3e, 0x49, 0x89),
    Rgb(0x31, 0x68, 0x8e),
    Rgb(0x26, 0x82, 0x8e),
    Rgb(0x1f, 0x9e, 0x89),
    Rgb(0x35, 0xb7, 0x79),
    Rgb(0x6e, 0xce, 0x58),
    Rgb(0xb5, 0xde, 0x2b),
    Rgb(0xfd, 0xe7, 0x25),
];

pub fn cycle(palette: &[Rgb], index: usize) -> Rgb {
    palette[index % palette.len()]
}

/// Viridis color for `t` in `0.0..=1.0`, linearly interpolated between stops.
pub fn viridis(t: f64) -> Rgb {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (VIRIDIS.len() - 1) as f64;
    let lower = scaled.floor() as usize;
    let upper = (lower + 1).min(VIRIDIS.len() - 1);
    let frac = scaled - lower as f64;
    let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * frac).round() as u8;
    let (a, b) = (VIRIDIS[lower], VIRIDIS[upper]);
    Rgb(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}
