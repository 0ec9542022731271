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
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;
use tracing::debug;

/// US letter, in points.
const PAGE_WIDTH: u32 = 612;
const PAGE_HEIGHT: u32 = 792;
const IMAGE_X: u32 = 50;
const IMAGE_Y: u32 = 400;
const IMAGE_WIDTH: u32 = 500;
const IMAGE_HEIGHT: u32 = 250;
const TEXT_X: u32 = 50;
const TEXT_Y: u32 = 380;
const FONT_SIZE: u32 = 10;
const MAX_TEXT_CHARS: usize = 400;

const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const FONT_ID: usize = 3;
const FIRST_PAGE_ID: usize = 4;
/// Page, content stream and image per chart.
const OBJECTS_PER_PAGE: usize = 3;

/// Single-line caption: newlines flattened to spaces, cut to 400 characters.
pub fn caption_text(insight: &str) -> String {
    insight.replace('\n', " ").chars().take(MAX_TEXT_CHARS).collect()
}

/// Escapes a caption as a PDF literal string body in WinAnsi bytes.
fn pdf_string(text: &str) -> Vec<u8> {
    let (encoded, _, _) = encoding_rs::WINDOWS_1252.encode(text);
    let mut out = Vec::with_capacity(encoded.len() + 8);
    for byte in encoded.iter().copied() {
        match byte {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(byte);
            }
            b'\r' | b'\t' => out.push(b' '),
            _ => out.push(byte),
        }
    }
    out
}

struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new(object_count: usize) -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            buf,
            offsets: vec![0; object_count + 1],
        }
    }

    fn object(&mut self, id: usize, body: &[u8]) {
        self.offsets[id] = self.buf.len();
        self.buf.extend_from_slice(format!("{id} 0 obj\n").as_bytes());
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, id: usize, dictionary: &str, data: &[u8]) {
        let mut body = format!("<< {dictionary} /Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.object(id, &body);
    }

    fn finish(mut self) -> Vec<u8> {
        let xref_offset = self.buf.len();
        let count = self.offsets.len();
        self.buf
            .extend_from_slice(format!("xref\n0 {count}\n0000000000 65535 f \n").as_bytes());
        for offset in &self.offsets[1..] {
            self.buf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        self.buf.extend_from_slice(
            format!("trailer\n<< /Size {count} /Root {CATALOG_ID} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n")
                .as_bytes(),
        );
        self.buf
    }
}

/// Decodes the chart PNG to raw RGB and deflates it for an image XObject.
fn image_stream(chart: &RenderedChart) -> Result<(u32, u32, Vec<u8>), ExportError> {
    let image_error = |reason: String| ExportError::Image {
        index: chart.number(),
        reason,
    };
    let decoded = image::load_from_memory(&chart.png).map_err(|e| image_error(e.to_string()))?;
    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(rgb.as_raw())?;
    Ok((width, height, encoder.finish()?))
}

/// Builds a PDF with one letter-sized page per chart: the image with its caption below.
pub fn build_pdf(charts: &[RenderedChart]) -> Result<Vec<u8>, ExportError> {
    let page_ids: Vec<usize> = (0..charts.len())
        .map(|i| FIRST_PAGE_ID + i * OBJECTS_PER_PAGE)
        .collect();
    let mut pdf = PdfWriter::new(FIRST_PAGE_ID - 1 + charts.len() * OBJECTS_PER_PAGE);

    pdf.object(CATALOG_ID, format!("<< /Type /Catalog /Pages {PAGES_ID} 0 R >>").as_bytes());
    let kids: Vec<String> = page_ids.iter().map(|id| format!("{id} 0 R")).collect();
    pdf.object(
        PAGES_ID,
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            charts.len()
        )
        .as_bytes(),
    );
    pdf.object(
        FONT_ID,
        b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>",
    );

    for (chart, page_id) in charts.iter().zip(page_ids) {
        let content_id = page_id + 1;
        let image_id = page_id + 2;
        pdf.object(
            page_id,
            format!(
                "<< /Type /Page /Parent {PAGES_ID} 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 {FONT_ID} 0 R >> /XObject << /Im1 {image_id} 0 R >> >> \
                 /Contents {content_id} 0 R >>"
            )
            .as_bytes(),
        );

        let mut content = format!(
            "q {IMAGE_WIDTH} 0 0 {IMAGE_HEIGHT} {IMAGE_X} {IMAGE_Y} cm /Im1 Do Q\n\
             BT /F1 {FONT_SIZE} Tf {TEXT_X} {TEXT_Y} Td ("
        )
        .into_bytes();
        content.extend(pdf_string(&caption_text(&chart.insight_text)));
        content.extend_from_slice(b") Tj ET");
        pdf.stream(content_id, "", &content);

        let (width, height, pixels) = image_stream(chart)?;
        pdf.stream(
            image_id,
            &format!(
                "/Type /XObject /Subtype /Image /Width {width} /Height {height} \
                 /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode"
            ),
            &pixels,
        );
    }

    let bytes = pdf.finish();
    debug!(pages = charts.len(), bytes = bytes.len(), "pdf report assembled");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caption_flattens_and_truncates() {
        assert_eq!(caption_text("a\nb"), "a b");
        assert_eq!(caption_text(&"x".repeat(500)).len(), MAX_TEXT_CHARS);
    }

    #[test]
    fn test_pdf_string_escapes_delimiters() {
        assert_eq!(pdf_string("f(x) \\ y"), b"f\\(x\\) \\\\ y".to_vec());
        assert_eq!(pdf_string("café"), vec![b'c', b'a', b'f', 0xE9]);
    }

    #[test]
    fn test_empty_report_is_well_formed() {
        let bytes = build_pdf(&[]).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.contains("/Count 0"));
        assert!(text.trim_end().ends_with("%%EOF"));
    }
}
