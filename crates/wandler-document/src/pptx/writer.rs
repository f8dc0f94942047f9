// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Presentation writer — builds an OOXML presentation (.pptx) slide by slide
// and zips the package with the `zip` crate.

use std::io::{Cursor, Write};

use image::DynamicImage;
use tracing::{debug, instrument};
use wandler_core::error::{Result, WandlerError};
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use super::parts::{self, EmuRect, Shape};
use super::{MAX_SLIDE_EMU, MIN_SLIDE_EMU};
use crate::geometry::{PlacementRect, Size};
use crate::image::ImageProcessor;
use crate::pdf::writer::TextColor;
use crate::units::{emu_to_points, points_to_emu};

/// Builds a presentation whose slides all share one canvas size.
pub struct PresentationComposer {
    title: String,
    slide_width: i64,
    slide_height: i64,
    slides: Vec<SlideDraft>,
    media: Vec<Vec<u8>>,
}

#[derive(Default)]
struct SlideDraft {
    shapes: Vec<Shape>,
    images: Vec<(String, String)>,
    next_shape_id: u32,
}

impl SlideDraft {
    fn shape_id(&mut self) -> u32 {
        // id 1 is the shape tree itself
        self.next_shape_id = self.next_shape_id.max(1) + 1;
        self.next_shape_id
    }
}

impl PresentationComposer {
    /// Slide canvas of `slide_size` points, clamped to the range the format
    /// allows (1 to 56 inches per side).
    pub fn new(title: &str, slide_size: Size) -> Self {
        let clamp = |points: f64| points_to_emu(points).clamp(MIN_SLIDE_EMU, MAX_SLIDE_EMU);
        Self {
            title: title.to_owned(),
            slide_width: clamp(slide_size.width),
            slide_height: clamp(slide_size.height),
            slides: Vec::new(),
            media: Vec::new(),
        }
    }

    /// Canvas size in points after clamping.
    pub fn slide_size(&self) -> Size {
        Size::new(emu_to_points(self.slide_width), emu_to_points(self.slide_height))
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    pub fn add_slide(&mut self) {
        self.slides.push(SlideDraft::default());
    }

    // -- Shapes ---------------------------------------------------------------

    /// Embed `image` as PNG on the current slide, covering `rect`.
    pub fn add_image(&mut self, image: &DynamicImage, rect: PlacementRect) -> Result<()> {
        let png = ImageProcessor::from_dynamic(image.clone()).to_png_bytes()?;
        self.media.push(png);
        let media_name = format!("image{}.png", self.media.len());

        let slide = self.current_slide()?;
        let relationship_id = format!("rId{}", slide.images.len() + 2);
        let shape_id = slide.shape_id();
        slide.shapes.push(Shape::Picture {
            id: shape_id,
            relationship_id: relationship_id.clone(),
            rect: emu_rect(rect),
        });
        slide.images.push((relationship_id, media_name));
        Ok(())
    }

    /// Add a text box to the current slide.
    pub fn add_text_box(
        &mut self,
        text: &str,
        rect: PlacementRect,
        font_size: f64,
        color: TextColor,
        centered: bool,
    ) -> Result<()> {
        let slide = self.current_slide()?;
        let shape_id = slide.shape_id();
        let size = (font_size * 100.0).round().clamp(100.0, 400_000.0) as u32;
        let [r, g, b] = color;
        slide.shapes.push(Shape::TextBox {
            id: shape_id,
            text: text.to_owned(),
            rect: emu_rect(rect),
            size,
            color: format!("{r:02X}{g:02X}{b:02X}"),
            centered,
        });
        Ok(())
    }

    fn current_slide(&mut self) -> Result<&mut SlideDraft> {
        self.slides
            .last_mut()
            .ok_or_else(|| WandlerError::Internal("no slide is open for drawing".to_string()))
    }

    // -- Output ---------------------------------------------------------------

    /// Zip every part into a .pptx package.
    #[instrument(skip_all, fields(slides = self.slides.len(), media = self.media.len()))]
    pub fn finish(self) -> Result<Vec<u8>> {
        if self.slides.is_empty() {
            return Err(WandlerError::Presentation(
                "presentation has no slides".to_string(),
            ));
        }
        let count = self.slides.len();

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        let mut put = |name: &str, data: &[u8], options: SimpleFileOptions| -> Result<()> {
            zip.start_file(name, options).map_err(|err| {
                WandlerError::Presentation(format!("cannot add {name} to package: {err}"))
            })?;
            zip.write_all(data).map_err(|err| {
                WandlerError::Presentation(format!("cannot write {name}: {err}"))
            })
        };

        put("[Content_Types].xml", parts::content_types(count)?.as_bytes(), deflated)?;
        put("_rels/.rels", parts::root_relationships()?.as_bytes(), deflated)?;
        put("docProps/core.xml", parts::core_properties(&self.title)?.as_bytes(), deflated)?;
        put("docProps/app.xml", parts::app_properties(count)?.as_bytes(), deflated)?;
        put(
            "ppt/presentation.xml",
            parts::presentation(count, self.slide_width, self.slide_height)?.as_bytes(),
            deflated,
        )?;
        put(
            "ppt/_rels/presentation.xml.rels",
            parts::presentation_relationships(count)?.as_bytes(),
            deflated,
        )?;
        put("ppt/presProps.xml", parts::presentation_properties().as_bytes(), deflated)?;
        put("ppt/viewProps.xml", parts::view_properties().as_bytes(), deflated)?;
        put("ppt/tableStyles.xml", parts::table_styles().as_bytes(), deflated)?;
        put(
            "ppt/slideMasters/slideMaster1.xml",
            parts::slide_master()?.as_bytes(),
            deflated,
        )?;
        put(
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            parts::slide_master_relationships()?.as_bytes(),
            deflated,
        )?;
        put(
            "ppt/slideLayouts/slideLayout1.xml",
            parts::slide_layout()?.as_bytes(),
            deflated,
        )?;
        put(
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            parts::slide_layout_relationships()?.as_bytes(),
            deflated,
        )?;
        put("ppt/theme/theme1.xml", parts::theme().as_bytes(), deflated)?;

        for (index, slide) in self.slides.iter().enumerate() {
            let n = index + 1;
            put(
                &format!("ppt/slides/slide{n}.xml"),
                parts::slide(&slide.shapes)?.as_bytes(),
                deflated,
            )?;
            put(
                &format!("ppt/slides/_rels/slide{n}.xml.rels"),
                parts::slide_relationships(&slide.images)?.as_bytes(),
                deflated,
            )?;
        }
        for (index, png) in self.media.iter().enumerate() {
            put(&format!("ppt/media/image{}.png", index + 1), png, stored)?;
        }

        let output = zip
            .finish()
            .map_err(|err| WandlerError::Presentation(format!("cannot finish package: {err}")))?
            .into_inner();
        debug!(bytes = output.len(), "Presentation serialised");
        Ok(output)
    }
}

fn emu_rect(rect: PlacementRect) -> EmuRect {
    EmuRect {
        x: points_to_emu(rect.left),
        y: points_to_emu(rect.top),
        cx: points_to_emu(rect.width),
        cy: points_to_emu(rect.height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pptx::reader::{SlideElement, read_presentation};
    use image::{Rgb, RgbImage};

    fn bitmap() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, Rgb([0, 128, 255])))
    }

    fn full(size: Size) -> PlacementRect {
        PlacementRect {
            left: 0.0,
            top: 0.0,
            width: size.width,
            height: size.height,
        }
    }

    #[test]
    fn slide_size_is_clamped() {
        let tiny = PresentationComposer::new("t", Size::new(10.0, 10.0));
        assert_eq!(tiny.slide_size(), Size::new(72.0, 72.0));
        let huge = PresentationComposer::new("t", Size::new(10_000.0, 500.0));
        assert_eq!(huge.slide_size(), Size::new(4032.0, 500.0));
    }

    #[test]
    fn drawing_before_first_slide_fails() {
        let mut deck = PresentationComposer::new("t", Size::new(720.0, 540.0));
        assert!(deck.add_image(&bitmap(), full(Size::new(1.0, 1.0))).is_err());
        assert!(matches!(deck.finish(), Err(WandlerError::Presentation(_))));
    }

    #[test]
    fn written_deck_reads_back() {
        let size = Size::new(612.0, 792.0);
        let mut deck = PresentationComposer::new("Report", size);
        deck.add_slide();
        deck.add_image(&bitmap(), full(size)).unwrap();
        deck.add_text_box(
            "Document: report.pdf",
            PlacementRect {
                left: 14.4,
                top: 7.2,
                width: 583.2,
                height: 28.8,
            },
            10.0,
            [64, 64, 64],
            true,
        )
        .unwrap();
        deck.add_slide();
        deck.add_image(&bitmap(), full(size)).unwrap();
        let bytes = deck.finish().unwrap();

        let presentation = read_presentation(&bytes).unwrap();
        assert_eq!(presentation.slide_size, size);
        assert_eq!(presentation.slides.len(), 2);

        let first = presentation.slides[0].as_ref().unwrap();
        assert_eq!(first.elements.len(), 2);
        match &first.elements[0] {
            SlideElement::Image { rect, bytes } => {
                assert_eq!(*rect, full(size));
                assert_eq!(&bytes[1..4], b"PNG");
            }
            other => panic!("expected image, got {other:?}"),
        }
        match &first.elements[1] {
            SlideElement::Text { text, style, .. } => {
                assert_eq!(text, "Document: report.pdf");
                assert_eq!(style.font_size_pt, 10.0);
                assert_eq!(style.color, Some([64, 64, 64]));
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn markup_in_text_reads_back_verbatim() {
        let size = Size::new(720.0, 540.0);
        let caption = r#"<b>"Q3" & 'notes'</b>"#;
        let mut deck = PresentationComposer::new("</dc:title>", size);
        deck.add_slide();
        deck.add_text_box(caption, full(size), 12.0, [0, 0, 0], false)
            .unwrap();
        let bytes = deck.finish().unwrap();

        let presentation = read_presentation(&bytes).unwrap();
        let slide = presentation.slides[0].as_ref().unwrap();
        match &slide.elements[..] {
            [SlideElement::Text { text, .. }] => assert_eq!(text, caption),
            other => panic!("expected one text box, got {other:?}"),
        }
    }
}
