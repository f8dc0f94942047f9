// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OOXML package parts for generated presentations.
//
// A generated deck has one master, one blank layout, one theme, and one slide
// per page. Parts are serialised with the quick-xml event writer, which
// escapes every text node and attribute value. The theme and the three
// property parts never vary and are kept as literal templates.

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use wandler_core::error::{Result, WandlerError};

pub const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

const NS_PACKAGE_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const REL_CORE_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const CT_PML: &str = "application/vnd.openxmlformats-officedocument.presentationml";

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

type XmlWriter = Writer<Cursor<Vec<u8>>>;

// -- Event helpers ------------------------------------------------------------

/// Serialise one part: the XML declaration, then whatever `body` writes.
fn part(body: impl FnOnce(&mut XmlWriter) -> quick_xml::Result<()>) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .and_then(|()| body(&mut writer))
        .map_err(|err| WandlerError::Presentation(format!("cannot serialise part: {err}")))?;
    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|err| WandlerError::Presentation(format!("part is not UTF-8: {err}")))
}

fn element<'a>(name: &'a str, attributes: &[(&'a str, &'a str)]) -> BytesStart<'a> {
    BytesStart::new(name).with_attributes(attributes.iter().copied())
}

fn open(writer: &mut XmlWriter, name: &str, attributes: &[(&str, &str)]) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(element(name, attributes)))
}

fn close(writer: &mut XmlWriter, name: &str) -> quick_xml::Result<()> {
    writer.write_event(Event::End(BytesEnd::new(name)))
}

fn empty(writer: &mut XmlWriter, name: &str, attributes: &[(&str, &str)]) -> quick_xml::Result<()> {
    writer.write_event(Event::Empty(element(name, attributes)))
}

fn text(writer: &mut XmlWriter, name: &str, value: &str) -> quick_xml::Result<()> {
    open(writer, name, &[])?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    close(writer, name)
}

/// Open a PresentationML root with the three namespaces every part uses.
fn open_pml(writer: &mut XmlWriter, name: &str, extra: &[(&str, &str)]) -> quick_xml::Result<()> {
    let mut root = element(name, &[("xmlns:a", NS_A), ("xmlns:r", NS_R), ("xmlns:p", NS_P)]);
    root.extend_attributes(extra.iter().copied());
    writer.write_event(Event::Start(root))
}

/// `(id, type suffix, target)` triples as a relationships part.
fn relationships(entries: &[(String, String, String)]) -> Result<String> {
    part(|w| {
        open(w, "Relationships", &[("xmlns", NS_PACKAGE_RELS)])?;
        for (id, kind, target) in entries {
            empty(
                w,
                "Relationship",
                &[
                    ("Id", id.as_str()),
                    ("Type", kind.as_str()),
                    ("Target", target.as_str()),
                ],
            )?;
        }
        close(w, "Relationships")
    })
}

fn rel(id: &str, kind: &str, target: &str) -> (String, String, String) {
    (id.to_owned(), format!("{REL_BASE}/{kind}"), target.to_owned())
}

/// Group properties every shape tree starts with.
fn shape_tree_header(w: &mut XmlWriter) -> quick_xml::Result<()> {
    open(w, "p:nvGrpSpPr", &[])?;
    empty(w, "p:cNvPr", &[("id", "1"), ("name", "")])?;
    empty(w, "p:cNvGrpSpPr", &[])?;
    empty(w, "p:nvPr", &[])?;
    close(w, "p:nvGrpSpPr")?;

    open(w, "p:grpSpPr", &[])?;
    open(w, "a:xfrm", &[])?;
    empty(w, "a:off", &[("x", "0"), ("y", "0")])?;
    empty(w, "a:ext", &[("cx", "0"), ("cy", "0")])?;
    empty(w, "a:chOff", &[("x", "0"), ("y", "0")])?;
    empty(w, "a:chExt", &[("cx", "0"), ("cy", "0")])?;
    close(w, "a:xfrm")?;
    close(w, "p:grpSpPr")
}

fn master_colour_mapping(w: &mut XmlWriter) -> quick_xml::Result<()> {
    open(w, "p:clrMapOvr", &[])?;
    empty(w, "a:masterClrMapping", &[])?;
    close(w, "p:clrMapOvr")
}

// -- Package-level parts ------------------------------------------------------

pub fn content_types(slide_count: usize) -> Result<String> {
    let mut overrides = vec![
        ("/ppt/presentation.xml".to_owned(), format!("{CT_PML}.presentation.main+xml")),
        ("/ppt/slideMasters/slideMaster1.xml".to_owned(), format!("{CT_PML}.slideMaster+xml")),
        ("/ppt/slideLayouts/slideLayout1.xml".to_owned(), format!("{CT_PML}.slideLayout+xml")),
        ("/ppt/presProps.xml".to_owned(), format!("{CT_PML}.presProps+xml")),
        ("/ppt/viewProps.xml".to_owned(), format!("{CT_PML}.viewProps+xml")),
        ("/ppt/tableStyles.xml".to_owned(), format!("{CT_PML}.tableStyles+xml")),
        (
            "/ppt/theme/theme1.xml".to_owned(),
            "application/vnd.openxmlformats-officedocument.theme+xml".to_owned(),
        ),
        (
            "/docProps/core.xml".to_owned(),
            "application/vnd.openxmlformats-package.core-properties+xml".to_owned(),
        ),
        (
            "/docProps/app.xml".to_owned(),
            "application/vnd.openxmlformats-officedocument.extended-properties+xml".to_owned(),
        ),
    ];
    for n in 1..=slide_count {
        overrides.push((format!("/ppt/slides/slide{n}.xml"), format!("{CT_PML}.slide+xml")));
    }

    part(|w| {
        open(w, "Types", &[("xmlns", NS_CONTENT_TYPES)])?;
        for (extension, content_type) in [
            ("rels", "application/vnd.openxmlformats-package.relationships+xml"),
            ("xml", "application/xml"),
            ("png", "image/png"),
            ("jpeg", "image/jpeg"),
        ] {
            empty(w, "Default", &[("Extension", extension), ("ContentType", content_type)])?;
        }
        for (name, content_type) in &overrides {
            empty(
                w,
                "Override",
                &[("PartName", name.as_str()), ("ContentType", content_type.as_str())],
            )?;
        }
        close(w, "Types")
    })
}

pub fn root_relationships() -> Result<String> {
    relationships(&[
        rel("rId1", "officeDocument", "ppt/presentation.xml"),
        (
            "rId2".to_owned(),
            REL_CORE_PROPERTIES.to_owned(),
            "docProps/core.xml".to_owned(),
        ),
        rel("rId3", "extended-properties", "docProps/app.xml"),
    ])
}

pub fn core_properties(title: &str) -> Result<String> {
    part(|w| {
        open(
            w,
            "cp:coreProperties",
            &[
                (
                    "xmlns:cp",
                    "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
                ),
                ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
                ("xmlns:dcterms", "http://purl.org/dc/terms/"),
                ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
            ],
        )?;
        text(w, "dc:title", title)?;
        text(w, "dc:creator", "wandler")?;
        close(w, "cp:coreProperties")
    })
}

pub fn app_properties(slide_count: usize) -> Result<String> {
    part(|w| {
        open(
            w,
            "Properties",
            &[(
                "xmlns",
                "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties",
            )],
        )?;
        text(w, "Application", "wandler")?;
        text(w, "Slides", &slide_count.to_string())?;
        close(w, "Properties")
    })
}

// -- Presentation -------------------------------------------------------------

/// Relationship id of slide `n` (1-based) in `presentation.xml.rels`.
pub fn slide_relationship_id(n: usize) -> String {
    format!("rId{}", n + 1)
}

pub fn presentation(slide_count: usize, cx: i64, cy: i64) -> Result<String> {
    part(|w| {
        open_pml(w, "p:presentation", &[("saveSubsetFonts", "1")])?;

        open(w, "p:sldMasterIdLst", &[])?;
        empty(w, "p:sldMasterId", &[("id", "2147483648"), ("r:id", "rId1")])?;
        close(w, "p:sldMasterIdLst")?;

        open(w, "p:sldIdLst", &[])?;
        for n in 1..=slide_count {
            let id = (255 + n).to_string();
            let relationship_id = slide_relationship_id(n);
            empty(
                w,
                "p:sldId",
                &[("id", id.as_str()), ("r:id", relationship_id.as_str())],
            )?;
        }
        close(w, "p:sldIdLst")?;

        let (cx, cy) = (cx.to_string(), cy.to_string());
        empty(w, "p:sldSz", &[("cx", cx.as_str()), ("cy", cy.as_str())])?;
        empty(w, "p:notesSz", &[("cx", "6858000"), ("cy", "9144000")])?;
        close(w, "p:presentation")
    })
}

pub fn presentation_relationships(slide_count: usize) -> Result<String> {
    let mut entries = vec![rel("rId1", "slideMaster", "slideMasters/slideMaster1.xml")];
    for n in 1..=slide_count {
        entries.push(rel(
            &slide_relationship_id(n),
            "slide",
            &format!("slides/slide{n}.xml"),
        ));
    }
    let next = slide_count + 2;
    for (offset, (kind, target)) in [
        ("presProps", "presProps.xml"),
        ("viewProps", "viewProps.xml"),
        ("theme", "theme/theme1.xml"),
        ("tableStyles", "tableStyles.xml"),
    ]
    .into_iter()
    .enumerate()
    {
        entries.push(rel(&format!("rId{}", next + offset), kind, target));
    }
    relationships(&entries)
}

pub fn presentation_properties() -> String {
    format!(r#"{XML_DECL}<p:presentationPr xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"/>"#)
}

pub fn view_properties() -> String {
    format!(
        r#"{XML_DECL}<p:viewPr xmlns:a="{NS_A}" xmlns:r="{NS_R}" xmlns:p="{NS_P}"><p:gridSpacing cx="76200" cy="76200"/></p:viewPr>"#
    )
}

pub fn table_styles() -> String {
    format!(
        r#"{XML_DECL}<a:tblStyleLst xmlns:a="{NS_A}" def="{{5C22544A-7EE6-4342-B048-85BDC9FD1C3A}}"/>"#
    )
}

// -- Master, layout, theme ----------------------------------------------------

pub fn slide_master() -> Result<String> {
    part(|w| {
        open_pml(w, "p:sldMaster", &[])?;
        open(w, "p:cSld", &[])?;
        open(w, "p:bg", &[])?;
        open(w, "p:bgRef", &[("idx", "1001")])?;
        empty(w, "a:schemeClr", &[("val", "bg1")])?;
        close(w, "p:bgRef")?;
        close(w, "p:bg")?;
        open(w, "p:spTree", &[])?;
        shape_tree_header(w)?;
        close(w, "p:spTree")?;
        close(w, "p:cSld")?;

        empty(
            w,
            "p:clrMap",
            &[
                ("bg1", "lt1"),
                ("tx1", "dk1"),
                ("bg2", "lt2"),
                ("tx2", "dk2"),
                ("accent1", "accent1"),
                ("accent2", "accent2"),
                ("accent3", "accent3"),
                ("accent4", "accent4"),
                ("accent5", "accent5"),
                ("accent6", "accent6"),
                ("hlink", "hlink"),
                ("folHlink", "folHlink"),
            ],
        )?;

        open(w, "p:sldLayoutIdLst", &[])?;
        empty(w, "p:sldLayoutId", &[("id", "2147483649"), ("r:id", "rId1")])?;
        close(w, "p:sldLayoutIdLst")?;

        open(w, "p:txStyles", &[])?;
        empty(w, "p:titleStyle", &[])?;
        empty(w, "p:bodyStyle", &[])?;
        empty(w, "p:otherStyle", &[])?;
        close(w, "p:txStyles")?;
        close(w, "p:sldMaster")
    })
}

pub fn slide_master_relationships() -> Result<String> {
    relationships(&[
        rel("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
        rel("rId2", "theme", "../theme/theme1.xml"),
    ])
}

pub fn slide_layout() -> Result<String> {
    part(|w| {
        open_pml(w, "p:sldLayout", &[("type", "blank"), ("preserve", "1")])?;
        open(w, "p:cSld", &[("name", "Blank")])?;
        open(w, "p:spTree", &[])?;
        shape_tree_header(w)?;
        close(w, "p:spTree")?;
        close(w, "p:cSld")?;
        master_colour_mapping(w)?;
        close(w, "p:sldLayout")
    })
}

pub fn slide_layout_relationships() -> Result<String> {
    relationships(&[rel("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")])
}

pub fn theme() -> String {
    let solid = |color: &str| format!(r#"<a:solidFill><a:schemeClr val="{color}"/></a:solidFill>"#);
    let line = |width: u32| {
        format!(
            r#"<a:ln w="{width}" cap="flat" cmpd="sng" algn="ctr"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:prstDash val="solid"/></a:ln>"#
        )
    };
    let fills = solid("phClr").repeat(3);
    let lines = format!("{}{}{}", line(6350), line(12700), line(19050));
    let effects = "<a:effectStyle><a:effectLst/></a:effectStyle>".repeat(3);

    format!(
        concat!(
            "{decl}<a:theme xmlns:a=\"{ns_a}\" name=\"Wandler\"><a:themeElements>",
            r#"<a:clrScheme name="Wandler">"#,
            r#"<a:dk1><a:srgbClr val="000000"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1>"#,
            r#"<a:dk2><a:srgbClr val="44546A"/></a:dk2><a:lt2><a:srgbClr val="E7E6E6"/></a:lt2>"#,
            r#"<a:accent1><a:srgbClr val="4472C4"/></a:accent1><a:accent2><a:srgbClr val="ED7D31"/></a:accent2>"#,
            r#"<a:accent3><a:srgbClr val="A5A5A5"/></a:accent3><a:accent4><a:srgbClr val="FFC000"/></a:accent4>"#,
            r#"<a:accent5><a:srgbClr val="5B9BD5"/></a:accent5><a:accent6><a:srgbClr val="70AD47"/></a:accent6>"#,
            r#"<a:hlink><a:srgbClr val="0563C1"/></a:hlink><a:folHlink><a:srgbClr val="954F72"/></a:folHlink>"#,
            "</a:clrScheme>",
            r#"<a:fontScheme name="Wandler">"#,
            r#"<a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#,
            r#"<a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>"#,
            "</a:fontScheme>",
            r#"<a:fmtScheme name="Wandler">"#,
            "<a:fillStyleLst>{fills}</a:fillStyleLst>",
            "<a:lnStyleLst>{lines}</a:lnStyleLst>",
            "<a:effectStyleLst>{effects}</a:effectStyleLst>",
            "<a:bgFillStyleLst>{fills}</a:bgFillStyleLst>",
            "</a:fmtScheme></a:themeElements></a:theme>"
        ),
        decl = XML_DECL,
        ns_a = NS_A,
        fills = fills,
        lines = lines,
        effects = effects
    )
}

// -- Slides -------------------------------------------------------------------

/// Position and extent of a shape, in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmuRect {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

/// One drawable on a slide.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Picture {
        id: u32,
        relationship_id: String,
        rect: EmuRect,
    },
    /// Single-run paragraphs, one per line of `text`. `size` is in
    /// hundredths of a point, `color` an RGB hex string.
    TextBox {
        id: u32,
        text: String,
        rect: EmuRect,
        size: u32,
        color: String,
        centered: bool,
    },
}

pub fn slide(shapes: &[Shape]) -> Result<String> {
    part(|w| {
        open_pml(w, "p:sld", &[])?;
        open(w, "p:cSld", &[])?;
        open(w, "p:spTree", &[])?;
        shape_tree_header(w)?;
        for shape in shapes {
            match shape {
                Shape::Picture {
                    id,
                    relationship_id,
                    rect,
                } => picture(w, *id, relationship_id, *rect)?,
                Shape::TextBox {
                    id,
                    text,
                    rect,
                    size,
                    color,
                    centered,
                } => text_box(w, *id, text, *rect, *size, color, *centered)?,
            }
        }
        close(w, "p:spTree")?;
        close(w, "p:cSld")?;
        master_colour_mapping(w)?;
        close(w, "p:sld")
    })
}

/// Relationships of one slide: its layout first, then `images` as
/// `(relationship id, media file name)` pairs.
pub fn slide_relationships(images: &[(String, String)]) -> Result<String> {
    let mut entries = vec![rel("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml")];
    for (id, media) in images {
        entries.push(rel(id, "image", &format!("../media/{media}")));
    }
    relationships(&entries)
}

fn transform(w: &mut XmlWriter, rect: EmuRect) -> quick_xml::Result<()> {
    let [x, y, cx, cy] = [rect.x, rect.y, rect.cx, rect.cy].map(|v| v.to_string());
    open(w, "a:xfrm", &[])?;
    empty(w, "a:off", &[("x", x.as_str()), ("y", y.as_str())])?;
    empty(w, "a:ext", &[("cx", cx.as_str()), ("cy", cy.as_str())])?;
    close(w, "a:xfrm")
}

fn rectangle_geometry(w: &mut XmlWriter) -> quick_xml::Result<()> {
    open(w, "a:prstGeom", &[("prst", "rect")])?;
    empty(w, "a:avLst", &[])?;
    close(w, "a:prstGeom")
}

fn picture(
    w: &mut XmlWriter,
    id: u32,
    relationship_id: &str,
    rect: EmuRect,
) -> quick_xml::Result<()> {
    let shape_id = id.to_string();
    open(w, "p:pic", &[])?;

    open(w, "p:nvPicPr", &[])?;
    let name = format!("Picture {id}");
    empty(w, "p:cNvPr", &[("id", shape_id.as_str()), ("name", name.as_str())])?;
    open(w, "p:cNvPicPr", &[])?;
    empty(w, "a:picLocks", &[("noChangeAspect", "1")])?;
    close(w, "p:cNvPicPr")?;
    empty(w, "p:nvPr", &[])?;
    close(w, "p:nvPicPr")?;

    open(w, "p:blipFill", &[])?;
    empty(w, "a:blip", &[("r:embed", relationship_id)])?;
    open(w, "a:stretch", &[])?;
    empty(w, "a:fillRect", &[])?;
    close(w, "a:stretch")?;
    close(w, "p:blipFill")?;

    open(w, "p:spPr", &[])?;
    transform(w, rect)?;
    rectangle_geometry(w)?;
    close(w, "p:spPr")?;

    close(w, "p:pic")
}

fn text_box(
    w: &mut XmlWriter,
    id: u32,
    content: &str,
    rect: EmuRect,
    size: u32,
    color: &str,
    centered: bool,
) -> quick_xml::Result<()> {
    let shape_id = id.to_string();
    let size = size.to_string();
    open(w, "p:sp", &[])?;

    open(w, "p:nvSpPr", &[])?;
    let name = format!("TextBox {id}");
    empty(w, "p:cNvPr", &[("id", shape_id.as_str()), ("name", name.as_str())])?;
    empty(w, "p:cNvSpPr", &[("txBox", "1")])?;
    empty(w, "p:nvPr", &[])?;
    close(w, "p:nvSpPr")?;

    open(w, "p:spPr", &[])?;
    transform(w, rect)?;
    rectangle_geometry(w)?;
    empty(w, "a:noFill", &[])?;
    close(w, "p:spPr")?;

    open(w, "p:txBody", &[])?;
    open(w, "a:bodyPr", &[("wrap", "square"), ("rtlCol", "0")])?;
    empty(w, "a:spAutoFit", &[])?;
    close(w, "a:bodyPr")?;
    empty(w, "a:lstStyle", &[])?;
    for line in content.split('\n') {
        open(w, "a:p", &[])?;
        if centered {
            empty(w, "a:pPr", &[("algn", "ctr")])?;
        }
        open(w, "a:r", &[])?;
        open(w, "a:rPr", &[("lang", "en-US"), ("sz", size.as_str()), ("dirty", "0")])?;
        open(w, "a:solidFill", &[])?;
        empty(w, "a:srgbClr", &[("val", color)])?;
        close(w, "a:solidFill")?;
        close(w, "a:rPr")?;
        text(w, "a:t", line)?;
        close(w, "a:r")?;
        close(w, "a:p")?;
    }
    close(w, "p:txBody")?;

    close(w, "p:sp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::Reader;

    fn assert_well_formed(xml: &str) {
        let mut reader = Reader::from_str(xml);
        loop {
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => panic!("malformed XML: {err}\n{xml}"),
            }
        }
    }

    fn square() -> EmuRect {
        EmuRect {
            x: 0,
            y: 0,
            cx: 100,
            cy: 100,
        }
    }

    #[test]
    fn every_part_is_well_formed() {
        let shapes = [
            Shape::Picture {
                id: 2,
                relationship_id: "rId2".into(),
                rect: square(),
            },
            Shape::TextBox {
                id: 3,
                text: "one\ntwo".into(),
                rect: square(),
                size: 1000,
                color: "404040".into(),
                centered: false,
            },
        ];
        for xml in [
            content_types(3).unwrap(),
            root_relationships().unwrap(),
            core_properties("Q3 <draft> & notes").unwrap(),
            app_properties(3).unwrap(),
            presentation(3, 9_144_000, 6_858_000).unwrap(),
            presentation_relationships(3).unwrap(),
            presentation_properties(),
            view_properties(),
            table_styles(),
            slide_master().unwrap(),
            slide_master_relationships().unwrap(),
            slide_layout().unwrap(),
            slide_layout_relationships().unwrap(),
            theme(),
            slide(&shapes).unwrap(),
            slide_relationships(&[("rId2".into(), "image1.png".into())]).unwrap(),
        ] {
            assert!(xml.starts_with("<?xml"));
            assert_well_formed(&xml);
        }
    }

    #[test]
    fn slide_relationship_ids_do_not_collide() {
        let rels = presentation_relationships(2).unwrap();
        assert!(rels.contains(r#"Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide""#));
        assert!(rels.contains(r#"Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/presProps""#));
    }

    #[test]
    fn text_is_escaped() {
        let xml = slide(&[Shape::TextBox {
            id: 2,
            text: "a < b & c".into(),
            rect: square(),
            size: 1000,
            color: "404040".into(),
            centered: true,
        }])
        .unwrap();
        assert_well_formed(&xml);
        assert!(xml.contains("a &lt; b &amp; c"));
    }

    #[test]
    fn markup_in_titles_and_media_names_stays_data() {
        let core = core_properties(r#"</dc:title><evil attr="1"/>"#).unwrap();
        assert_well_formed(&core);
        assert!(!core.contains("<evil"));

        let rels = slide_relationships(&[("rId2".into(), r#"a"b.png"#.into())]).unwrap();
        assert_well_formed(&rels);
        assert!(!rels.contains(r#"a"b.png"#));
    }
}
