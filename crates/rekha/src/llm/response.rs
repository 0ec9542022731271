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

//! Normalization of model replies before JSON parsing.

/// Strips a surrounding code fence and normalizes control characters.
///
/// Raw newlines inside JSON string literals become `\n` escapes, carriage
/// returns are dropped and tabs become spaces, so strict JSON parsing accepts
/// text that a model formatted for humans.
pub fn clean_response(raw: &str) -> String {
    let unfenced = strip_code_fence(raw.trim());
    normalize_control_chars(unfenced.trim())
}

fn strip_code_fence(text: &str) -> &str {
    if let Some(after_open) = text.strip_prefix("```") {
        let body = after_open.split_once('\n').map_or("", |(_, rest)| rest);
        let body = body.trim_end();
        return body.strip_suffix("```").unwrap_or(body);
    }
    match extract_code_blocks(text).into_iter().next() {
        Some((start, end)) => &text[start..end],
        None => text,
    }
}

/// Byte ranges of fenced block bodies, in order of appearance.
pub fn extract_code_blocks(text: &str) -> Vec<(usize, usize)> {
    let mut blocks = Vec::new();
    let mut cursor = 0;
    while let Some(open) = text[cursor..].find("```") {
        let fence_start = cursor + open + 3;
        let Some(newline) = text[fence_start..].find('\n') else {
            break;
        };
        let body_start = fence_start + newline + 1;
        let Some(close) = text[body_start..].find("```") else {
            break;
        };
        let body_end = body_start + close;
        blocks.push((body_start, body_end));
        cursor = body_end + 3;
    }
    blocks
}

fn normalize_control_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    for ch in text.chars() {
        match ch {
            '\r' => {}
            '\t' => out.push(' '),
            '\n' if in_string => out.push_str("\\n"),
            c if in_string && c.is_control() => {}
            '"' if !escaped => {
                in_string = !in_string;
                out.push(ch);
            }
            _ => out.push(ch),
        }
        escaped = in_string && ch == '\\' && !escaped;
    }
    out
}
