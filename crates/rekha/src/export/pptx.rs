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

//! Slide deck export: one slide per rendered chart with the chart image above
//! its insight text.

use crate::error::ExportError;
use crate::render::RenderedChart;
use std::fmt::Write as FmtWrite;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const EMU_PER_INCH: i64 = 914_400;
/// 10" x 7.5"
const SLIDE_WIDTH: i64 = 10 * EMU_PER_INCH;
const SLIDE_HEIGHT: i64 = 7 * EMU_PER_INCH + EMU_PER_INCH / 2;
const PICTURE_LEFT: i64 = EMU_PER_INCH;
const PICTURE_TOP: i64 = EMU_PER_INCH / 2;
const PICTURE_HEIGHT: i64 = 4 * EMU_PER_INCH + EMU_PER_INCH / 2;
const TEXT_LEFT: i64 = EMU_PER_INCH / 2;
const TEXT_TOP: i64 = 5 * EMU_PER_INCH + EMU_PER_INCH / 5;
const TEXT_WIDTH: i64 = 8 * EMU_PER_INCH + EMU_PER_INCH / 2;
const TEXT_HEIGHT: i64 = 2 * EMU_PER_INCH + EMU_PER_INCH / 2;
/// Hundredths of a point.
const TEXT_SIZE: u32 = 1200;
const TEXT_COLOR: &str = "808080";

const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

pub(crate) fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Picture width in EMU for the fixed picture height, keeping the image aspect ratio.
fn picture_width(image_size: (u32, u32)) -> i64 {
    let (width, height) = image_size;
    if height == 0 {
        return PICTURE_HEIGHT;
    }
    PICTURE_HEIGHT * i64::from(width) / i64::from(height)
}

/// Assembles the `.pptx` package in memory.
pub fn build_deck(charts: &[RenderedChart]) -> Result<Vec<u8>, ExportError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut add = |path: &str, content: &[u8]| -> Result<(), ExportError> {
        zip.start_file(path, options)?;
        zip.write_all(content)?;
        Ok(())
    };

    add("[Content_Types].xml", content_types(charts.len())?.as_bytes())?;
    add("_rels/.rels", root_rels().as_bytes())?;
    add("ppt/presentation.xml", presentation_xml(charts.len())?.as_bytes())?;
    add("ppt/_rels/presentation.xml.rels", presentation_rels(charts.len()).as_bytes())?;
    add("ppt/slideMasters/slideMaster1.xml", slide_master().as_bytes())?;
    add(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        relationships(&[
            ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
            ("rId2", "theme", "../theme/theme1.xml"),
        ])
        .as_bytes(),
    )?;
    add("ppt/slideLayouts/slideLayout1.xml", slide_layout().as_bytes())?;
    add(
        "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
        relationships(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]).as_bytes(),
    )?;
    add("ppt/theme/theme1.xml", THEME_XML.as_bytes())?;

    for (i, chart) in charts.iter().enumerate() {
        let n = i + 1;
        add(&format!("ppt/media/image{n}.png"), &chart.png)?;
        add(&format!("ppt/slides/slide{n}.xml"), slide_xml(chart)?.as_bytes())?;
        let image_target = format!("../media/image{n}.png");
        add(
            &format!("ppt/slides/_rels/slide{n}.xml.rels"),
            relationships(&[
                ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
                ("rId2", "image", &image_target),
            ])
            .as_bytes(),
        )?;
    }

    let bytes = zip.finish()?.into_inner();
    debug!(slides = charts.len(), bytes = bytes.len(), "slide deck assembled");
    Ok(bytes)
}

fn content_types(slides: usize) -> Result<String, ExportError> {
    let mut xml = String::with_capacity(1024);
    xml.push_str(XML_DECL);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    xml.push_str(r#"<Default Extension="png" ContentType="image/png"/>"#);
    xml.push_str(r#"<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>"#);
    xml.push_str(r#"<Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>"#);
    xml.push_str(r#"<Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>"#);
    xml.push_str(r#"<Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>"#);
    for n in 1..=slides {
        write!(
            xml,
            r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
        )?;
    }
    xml.push_str("</Types>");
    Ok(xml)
}

fn relationships(entries: &[(&str, &str, &str)]) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#);
    for (id, kind, target) in entries {
        xml.push_str(&format!(
            r#"<Relationship Id="{id}" Type="{REL_BASE}/{kind}" Target="{target}"/>"#
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn root_rels() -> String {
    relationships(&[("rId1", "officeDocument", "ppt/presentation.xml")])
}

/// Slides use relationship ids `rId3..`; `rId1` is the master and `rId2` the theme.
fn presentation_rels(slides: usize) -> String {
    let targets: Vec<(String, String)> = (1..=slides)
        .map(|n| (format!("rId{}", n + 2), format!("slides/slide{n}.xml")))
        .collect();
    let mut entries = vec![
        ("rId1", "slideMaster", "slideMasters/slideMaster1.xml"),
        ("rId2", "theme", "theme/theme1.xml"),
    ];
    entries.extend(targets.iter().map(|(id, target)| (id.as_str(), "slide", target.as_str())));
    relationships(&entries)
}

fn presentation_xml(slides: usize) -> Result<String, ExportError> {
    let mut xml = String::with_capacity(1024);
    xml.push_str(XML_DECL);
    write!(xml, r#"<p:presentation xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}">"#)?;
    xml.push_str(r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#);
    if slides > 0 {
        xml.push_str("<p:sldIdLst>");
        for n in 1..=slides {
            write!(xml, r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 2)?;
        }
        xml.push_str("</p:sldIdLst>");
    }
    write!(xml, r#"<p:sldSz cx="{SLIDE_WIDTH}" cy="{SLIDE_HEIGHT}"/>"#)?;
    xml.push_str(r#"<p:notesSz cx="6858000" cy="9144000"/>"#);
    xml.push_str("</p:presentation>");
    Ok(xml)
}

const EMPTY_TREE: &str = r#"<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#;

fn slide_master() -> String {
    format!(
        r#"{XML_DECL}<p:sldMaster xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld>{EMPTY_TREE}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#
    )
}

fn slide_layout() -> String {
    format!(
        r#"{XML_DECL}<p:sldLayout xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}" type="blank" preserve="1"><p:cSld name="Blank">{EMPTY_TREE}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
    )
}

fn slide_xml(chart: &RenderedChart) -> Result<String, ExportError> {
    let mut xml = String::with_capacity(4096);
    xml.push_str(XML_DECL);
    write!(xml, r#"<p:sld xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:cSld>"#)?;
    xml.push_str(EMPTY_TREE);

    write!(
        xml,
        r#"<p:pic><p:nvPicPr><p:cNvPr id="2" name="Chart {number}" descr="{title}"/><p:cNvPicPr><a:picLocks noChangeAspect="1"/></p:cNvPicPr><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr><a:xfrm><a:off x="{PICTURE_LEFT}" y="{PICTURE_TOP}"/><a:ext cx="{width}" cy="{PICTURE_HEIGHT}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#,
        number = chart.number(),
        title = escape_xml(&chart.prepared.title),
        width = picture_width(chart.image_size),
    )?;

    write!(
        xml,
        r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="Insight {number}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{TEXT_LEFT}" y="{TEXT_TOP}"/><a:ext cx="{TEXT_WIDTH}" cy="{TEXT_HEIGHT}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:noFill/></p:spPr><p:txBody><a:bodyPr wrap="square" rtlCol="0"><a:noAutofit/></a:bodyPr><a:lstStyle/>"#,
        number = chart.number(),
    )?;
    for line in chart.insight_text.split('\n') {
        write!(
            xml,
            r#"<a:p><a:r><a:rPr lang="en-US" sz="{TEXT_SIZE}" dirty="0"><a:solidFill><a:srgbClr val="{TEXT_COLOR}"/></a:solidFill></a:rPr><a:t>{}</a:t></a:r></a:p>"#,
            escape_xml(line)
        )?;
    }
    xml.push_str("</p:txBody></p:sp>");

    xml.push_str("</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>");
    Ok(xml)
}

const THEME_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Rekha"><a:themeElements>"#,
    r#"<a:clrScheme name="Rekha">"#,
    r#"<a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1>"#,
    r#"<a:dk2><a:srgbClr val="1F2937"/></a:dk2><a:lt2><a:srgbClr val="F3F4F6"/></a:lt2>"#,
    r#"<a:accent1><a:srgbClr val="1F77B4"/></a:accent1><a:accent2><a:srgbClr val="FF7F0E"/></a:accent2>"#,
    r#"<a:accent3><a:srgbClr val="2CA02C"/></a:accent3><a:accent4><a:srgbClr val="D62728"/></a:accent4>"#,
    r#"<a:accent5><a:srgbClr val="9467BD"/></a:accent5><a:accent6><a:srgbClr val="8C564B"/></a:accent6>"#,
    r#"<a:hlink><a:srgbClr val="0563C1"/></a:hlink><a:folHlink><a:srgbClr val="954F72"/></a:folHlink>"#,
    r#"</a:clrScheme>"#,
    r#"<a:fontScheme name="Rekha"><a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#,
    r#"<a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme>"#,
    r#"<a:fmtScheme name="Rekha"><a:fillStyleLst>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"</a:fillStyleLst><a:lnStyleLst>"#,
    r#"<a:ln w="6350"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="12700"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="19050"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"</a:lnStyleLst><a:effectStyleLst>"#,
    r#"<a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle>"#,
    r#"</a:effectStyleLst><a:bgFillStyleLst>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"</a:bgFillStyleLst></a:fmtScheme>"#,
    r#"</a:themeElements><a:objectDefaults/><a:extraClrSchemeLst/></a:theme>"#,
);
