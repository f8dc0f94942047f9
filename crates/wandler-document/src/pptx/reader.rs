// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Presentation reader — parse a .pptx package into slides of tagged elements.
//
// Each direct child of a slide's shape tree is classified once, at parse time,
// as an image, a text box, or something unsupported (groups, tables, charts,
// connectors). Renderers match on the variant rather than probing shapes.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, instrument, warn};
use wandler_core::error::{Result, WandlerError};
use zip::ZipArchive;

use super::DEFAULT_SLIDE_EMU;
use crate::geometry::{PlacementRect, Size};
use crate::units::emu_to_points;

/// Font size used for runs that do not declare one.
pub const DEFAULT_FONT_SIZE_PT: f64 = 12.0;

/// A parsed presentation. A slide that fails to parse is kept as an error so
/// callers can substitute a placeholder and keep the slide count.
#[derive(Debug)]
pub struct Presentation {
    /// Slide canvas in points.
    pub slide_size: Size,
    pub slides: Vec<Result<Slide>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slide {
    pub elements: Vec<SlideElement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlideElement {
    /// Encoded image bytes, in whatever format the package stores.
    Image { bytes: Vec<u8>, rect: PlacementRect },
    /// Text with `\n` between paragraphs. Placeholders inherit their position
    /// from the layout, so `rect` may be absent.
    Text {
        text: String,
        rect: Option<PlacementRect>,
        style: TextStyle,
    },
    Unsupported { kind: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_size_pt: f64,
    pub bold: bool,
    pub color: Option<[u8; 3]>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size_pt: DEFAULT_FONT_SIZE_PT,
            bold: false,
            color: None,
        }
    }
}

/// Parse a .pptx package.
#[instrument(skip_all, fields(bytes_len = data.len()))]
pub fn read_presentation(data: &[u8]) -> Result<Presentation> {
    let mut archive = ZipArchive::new(Cursor::new(data)).map_err(|err| {
        WandlerError::Validation(format!("file is not a presentation package: {err}"))
    })?;

    let presentation_xml = read_text_part(&mut archive, "ppt/presentation.xml")?;
    let (slide_size, slide_rel_ids) = parse_presentation(&presentation_xml)?;
    let rels = read_relationships(&mut archive, "ppt/presentation.xml")?;

    let mut slides = Vec::with_capacity(slide_rel_ids.len());
    for (index, rel_id) in slide_rel_ids.iter().enumerate() {
        let slide = match rels.get(rel_id) {
            Some(path) => read_slide(&mut archive, path),
            None => Err(WandlerError::Presentation(format!(
                "slide {} references missing relationship {rel_id}",
                index + 1
            ))),
        };
        if let Err(err) = &slide {
            warn!(slide = index + 1, %err, "Slide could not be parsed");
        }
        slides.push(slide);
    }

    debug!(slides = slides.len(), ?slide_size, "Presentation parsed");
    Ok(Presentation { slide_size, slides })
}

// -- Package access -----------------------------------------------------------

type Archive<'a> = ZipArchive<Cursor<&'a [u8]>>;

fn read_part(archive: &mut Archive<'_>, name: &str) -> Result<Vec<u8>> {
    let mut file = archive
        .by_name(name)
        .map_err(|err| WandlerError::Presentation(format!("missing part {name}: {err}")))?;
    let mut content = Vec::new();
    file.read_to_end(&mut content)
        .map_err(|err| WandlerError::Presentation(format!("cannot read {name}: {err}")))?;
    Ok(content)
}

fn read_text_part(archive: &mut Archive<'_>, name: &str) -> Result<String> {
    String::from_utf8(read_part(archive, name)?)
        .map_err(|_| WandlerError::Presentation(format!("{name} is not UTF-8")))
}

/// Relationships of `part`, mapping id to the resolved part name of the
/// target. Parts without a relationships file have none.
fn read_relationships(archive: &mut Archive<'_>, part: &str) -> Result<HashMap<String, String>> {
    let (dir, file) = part.rsplit_once('/').unwrap_or(("", part));
    let rels_name = if dir.is_empty() {
        format!("_rels/{file}.rels")
    } else {
        format!("{dir}/_rels/{file}.rels")
    };
    if archive.index_for_name(&rels_name).is_none() {
        return Ok(HashMap::new());
    }

    let xml = read_text_part(archive, &rels_name)?;
    let mut reader = Reader::from_str(&xml);
    let mut map = HashMap::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == b"Relationship" => {
                let id = attribute(&e, b"Id", false);
                let target = attribute(&e, b"Target", false);
                let external = attribute(&e, b"TargetMode", false).as_deref() == Some("External");
                if let (Some(id), Some(target), false) = (id, target, external) {
                    map.insert(id, resolve_target(dir, &target));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(WandlerError::Presentation(format!(
                    "malformed {rels_name}: {err}"
                )));
            }
        }
    }
    Ok(map)
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return normalise(absolute.split('/').collect());
    }
    let mut segments: Vec<&str> = base_dir.split('/').collect();
    segments.extend(target.split('/'));
    normalise(segments)
}

fn normalise(segments: Vec<&str>) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in segments {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out.join("/")
}

fn attribute(element: &BytesStart<'_>, name: &[u8], prefixed: bool) -> Option<String> {
    element.attributes().flatten().find_map(|attr| {
        let key = attr.key;
        if key.local_name().as_ref() == name && key.prefix().is_some() == prefixed {
            attr.unescape_value().ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}

fn emu_attribute(element: &BytesStart<'_>, name: &[u8]) -> Option<i64> {
    attribute(element, name, false).and_then(|v| v.trim().parse().ok())
}

// -- presentation.xml ---------------------------------------------------------

fn parse_presentation(xml: &str) -> Result<(Size, Vec<String>)> {
    let mut reader = Reader::from_str(xml);
    let mut size = None;
    let mut slide_ids = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) => match e.local_name().as_ref() {
                b"sldSz" => {
                    size = emu_attribute(&e, b"cx").zip(emu_attribute(&e, b"cy"));
                }
                b"sldId" => {
                    if let Some(rel) = attribute(&e, b"id", true) {
                        slide_ids.push(rel);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(WandlerError::Presentation(format!(
                    "malformed presentation.xml: {err}"
                )));
            }
        }
    }

    let (cx, cy) = match size {
        Some((cx, cy)) if cx > 0 && cy > 0 => (cx, cy),
        _ => DEFAULT_SLIDE_EMU,
    };
    Ok((Size::new(emu_to_points(cx), emu_to_points(cy)), slide_ids))
}

// -- Slides -------------------------------------------------------------------

fn read_slide(archive: &mut Archive<'_>, path: &str) -> Result<Slide> {
    let xml = read_text_part(archive, path)?;
    let rels = read_relationships(archive, path)?;

    let mut elements = Vec::new();
    for shape in parse_shape_tree(&xml)? {
        elements.push(resolve_shape(archive, &rels, shape));
    }
    Ok(Slide { elements })
}

/// One direct child of `p:spTree`, as captured by the XML walk.
#[derive(Debug, Default)]
struct RawShape {
    kind: String,
    offset: Option<(i64, i64)>,
    extent: Option<(i64, i64)>,
    embed: Option<String>,
    paragraphs: Vec<String>,
    style: Option<TextStyle>,
}

impl RawShape {
    fn rect(&self) -> Option<PlacementRect> {
        let (x, y) = self.offset?;
        let (cx, cy) = self.extent?;
        Some(PlacementRect {
            left: emu_to_points(x),
            top: emu_to_points(y),
            width: emu_to_points(cx),
            height: emu_to_points(cy),
        })
    }

    fn text(&self) -> String {
        self.paragraphs.join("\n")
    }
}

/// Walk a slide, capturing every direct child of the shape tree.
fn parse_shape_tree(xml: &str) -> Result<Vec<RawShape>> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut shapes = Vec::new();

    // Shape under construction and the stack depth of its element.
    let mut current: Option<(RawShape, usize)> = None;
    let mut paragraph = String::new();
    let mut in_text = false;
    let mut run_props_depth: Option<usize> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|err| WandlerError::Presentation(format!("malformed slide XML: {err}")))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_start = matches!(event, Event::Start(_));
                let name = e.local_name().as_ref().to_vec();
                let parent = stack.last().map(Vec::as_slice);

                if current.is_none() && parent == Some(b"spTree".as_slice()) {
                    let is_header = matches!(name.as_slice(), b"nvGrpSpPr" | b"grpSpPr" | b"extLst");
                    if !is_header {
                        let shape = RawShape {
                            kind: String::from_utf8_lossy(&name).into_owned(),
                            ..RawShape::default()
                        };
                        if is_start {
                            current = Some((shape, stack.len()));
                        } else {
                            shapes.push(shape);
                        }
                    }
                } else if let Some((shape, _)) = current.as_mut() {
                    match name.as_slice() {
                        b"off" if parent == Some(b"xfrm".as_slice()) && shape.offset.is_none() => {
                            shape.offset = emu_attribute(e, b"x").zip(emu_attribute(e, b"y"));
                        }
                        b"ext" if parent == Some(b"xfrm".as_slice()) && shape.extent.is_none() => {
                            shape.extent = emu_attribute(e, b"cx").zip(emu_attribute(e, b"cy"));
                        }
                        b"blip" if shape.embed.is_none() => {
                            shape.embed = attribute(e, b"embed", true);
                        }
                        b"rPr" | b"endParaRPr" if shape.style.is_none() => {
                            let mut style = TextStyle::default();
                            if let Some(size) = emu_attribute(e, b"sz") {
                                style.font_size_pt = size as f64 / 100.0;
                            }
                            style.bold = matches!(
                                attribute(e, b"b", false).as_deref(),
                                Some("1" | "true")
                            );
                            shape.style = Some(style);
                            if is_start {
                                run_props_depth = Some(stack.len());
                            }
                        }
                        b"srgbClr" if run_props_depth.is_some() => {
                            if let (Some(style), Some(hex)) =
                                (shape.style.as_mut(), attribute(e, b"val", false))
                                && style.color.is_none()
                            {
                                style.color = parse_hex_color(&hex);
                            }
                        }
                        b"t" if is_start => in_text = true,
                        _ => {}
                    }
                }

                if is_start {
                    stack.push(name);
                }
            }
            Event::Text(text) if in_text => {
                let text = text.unescape().map_err(|err| {
                    WandlerError::Presentation(format!("bad text in slide XML: {err}"))
                })?;
                paragraph.push_str(&text);
            }
            Event::End(e) => {
                stack.pop();
                let depth = stack.len();
                match e.local_name().as_ref() {
                    b"t" => in_text = false,
                    b"p" => {
                        if let Some((shape, _)) = current.as_mut() {
                            shape.paragraphs.push(std::mem::take(&mut paragraph));
                        }
                    }
                    _ => {}
                }
                if run_props_depth == Some(depth) {
                    run_props_depth = None;
                }
                if matches!(current, Some((_, start)) if start == depth)
                    && let Some((shape, _)) = current.take()
                {
                    shapes.push(shape);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(shapes)
}

fn resolve_shape(
    archive: &mut Archive<'_>,
    rels: &HashMap<String, String>,
    mut shape: RawShape,
) -> SlideElement {
    let rect = shape.rect();
    let kind = std::mem::take(&mut shape.kind);
    match kind.as_str() {
        "pic" | "sp" if shape.embed.is_some() && rect.is_some() => {
            let rel_id = shape.embed.as_deref().unwrap_or_default();
            let image = rels
                .get(rel_id)
                .ok_or_else(|| {
                    WandlerError::Presentation(format!("image relationship {rel_id} missing"))
                })
                .and_then(|part| read_part(archive, part));
            match (image, rect) {
                (Ok(bytes), Some(rect)) => SlideElement::Image { bytes, rect },
                (Err(err), _) => {
                    warn!(%err, "Skipping image with unreadable data");
                    SlideElement::Unsupported { kind: kind.clone() }
                }
                (Ok(_), None) => SlideElement::Unsupported { kind: kind.clone() },
            }
        }
        "sp" if shape.paragraphs.iter().any(|p| !p.trim().is_empty()) => SlideElement::Text {
            text: shape.text(),
            rect,
            style: shape.style.unwrap_or_default(),
        },
        _ => SlideElement::Unsupported { kind: kind.clone() },
    }
}

fn parse_hex_color(hex: &str) -> Option<[u8; 3]> {
    let hex = hex.trim();
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE: &str = r#"<?xml version="1.0"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"
       xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"
       xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main">
  <p:cSld><p:spTree>
    <p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
    <p:grpSpPr/>
    <p:sp>
      <p:nvSpPr><p:cNvPr id="2" name="Title"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>
      <p:spPr><a:xfrm><a:off x="127000" y="254000"/><a:ext cx="1270000" cy="635000"/></a:xfrm></p:spPr>
      <p:txBody><a:bodyPr/>
        <a:p><a:r><a:rPr sz="2400" b="1"><a:solidFill><a:srgbClr val="FF0000"/></a:solidFill></a:rPr><a:t>Fish &amp; chips</a:t></a:r></a:p>
        <a:p><a:r><a:t>second line</a:t></a:r></a:p>
      </p:txBody>
    </p:sp>
    <p:grpSp><p:sp><p:txBody><a:p><a:r><a:t>nested</a:t></a:r></a:p></p:txBody></p:sp></p:grpSp>
    <p:graphicFrame><a:graphic/></p:graphicFrame>
    <p:cxnSp/>
    <p:sp><p:txBody><a:p><a:r><a:t>placeholder body</a:t></a:r></a:p></p:txBody></p:sp>
  </p:spTree></p:cSld>
</p:sld>"#;

    #[test]
    fn shape_tree_children_are_classified() {
        let shapes = parse_shape_tree(SLIDE).unwrap();
        let kinds: Vec<&str> = shapes.iter().map(|s| s.kind.as_str()).collect();
        assert_eq!(kinds, vec!["sp", "grpSp", "graphicFrame", "cxnSp", "sp"]);

        let title = &shapes[0];
        assert_eq!(title.text(), "Fish & chips\nsecond line");
        assert_eq!(
            title.rect(),
            Some(PlacementRect {
                left: 10.0,
                top: 20.0,
                width: 100.0,
                height: 50.0
            })
        );
        let style = title.style.clone().unwrap();
        assert_eq!(style.font_size_pt, 24.0);
        assert!(style.bold);
        assert_eq!(style.color, Some([255, 0, 0]));

        // Nested content stays inside its group.
        assert_eq!(shapes[1].kind, "grpSp");
        assert_eq!(shapes[4].rect(), None);
        assert_eq!(shapes[4].text(), "placeholder body");
    }

    #[test]
    fn targets_resolve_relative_to_source_part() {
        assert_eq!(resolve_target("ppt/slides", "../media/image1.png"), "ppt/media/image1.png");
        assert_eq!(resolve_target("ppt", "slides/slide3.xml"), "ppt/slides/slide3.xml");
        assert_eq!(resolve_target("ppt/slides", "/ppt/media/x.jpeg"), "ppt/media/x.jpeg");
    }

    #[test]
    fn presentation_defaults_slide_size() {
        let xml = r#"<p:presentation xmlns:p="p" xmlns:r="r"><p:sldIdLst><p:sldId id="256" r:id="rId7"/></p:sldIdLst></p:presentation>"#;
        let (size, ids) = parse_presentation(xml).unwrap();
        assert_eq!(size, Size::new(720.0, 540.0));
        assert_eq!(ids, vec!["rId7"]);
    }

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("404040"), Some([64, 64, 64]));
        assert_eq!(parse_hex_color("4040"), None);
        assert_eq!(parse_hex_color("GG0000"), None);
    }

    #[test]
    fn non_zip_input_is_rejected() {
        assert!(matches!(
            read_presentation(b"%PDF-1.7"),
            Err(WandlerError::Validation(_))
        ));
    }
}
