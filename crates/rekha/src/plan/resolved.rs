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

use crate::data::RowFilter;
use crate::error::ConfigError;
use crate::plan::ChartKind;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Parses `#rrggbb` (the leading `#` is optional).
    pub fn parse_hex(raw: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidColor {
            value: raw.to_string(),
        };
        let hex_digits = raw.trim().trim_start_matches('#');
        if hex_digits.len() != 6 {
            return Err(invalid());
        }
        let bytes = hex::decode(hex_digits).map_err(|_| invalid())?;
        Ok(Rgb(bytes[0], bytes[1], bytes[2]))
    }

    pub fn to_hex(&self) -> String {
        format!("#{}", hex::encode([self.0, self.1, self.2]))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum YAxis {
    Column(String),
    /// Plot a count of rows per x value instead of a y column.
    CountFallback,
    /// The chart kind does not use y.
    Discarded,
}

impl YAxis {
    pub fn column(&self) -> Option<&str> {
        match self {
            YAxis::Column(name) => Some(name),
            YAxis::CountFallback | YAxis::Discarded => None,
        }
    }

    /// Label used in prompts and captions; `count` when no column is plotted.
    pub fn describe(&self) -> &str {
        self.column().unwrap_or("count")
    }
}

/// A chart configuration that is safe to render.
///
/// `x` names an existing column, `chart_type` is a known kind and, for kinds
/// that need a numeric y, `y` is a numeric column or [`YAxis::CountFallback`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedChartConfig {
    pub chart_type: ChartKind,
    pub x: String,
    pub y: YAxis,
    pub color: Rgb,
    pub filters: RowFilter,
}

impl ResolvedChartConfig {
    pub fn title(&self) -> String {
        match &self.y {
            YAxis::Column(y) => format!("{}: {y} by {}", self.chart_type, self.x),
            YAxis::CountFallback | YAxis::Discarded => format!("{}: {}", self.chart_type, self.x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let color = Rgb::parse_hex("#1f77b4").unwrap();
        assert_eq!(color, Rgb(0x1f, 0x77, 0xb4));
        assert_eq!(color.to_hex(), "#1f77b4");
        assert_eq!(Rgb::parse_hex("FF0000").unwrap(), Rgb(255, 0, 0));
    }

    #[test]
    fn test_bad_hex_rejected() {
        assert!(Rgb::parse_hex("#12345").is_err());
        assert!(Rgb::parse_hex("#gggggg").is_err());
        assert!(Rgb::parse_hex("red").is_err());
    }
}
