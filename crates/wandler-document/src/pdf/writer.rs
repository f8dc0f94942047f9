// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — compose new PDF documents from placed images and text using
// `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`. printpdf leaves streams uncompressed, so the output is
// passed through lopdf once more to deflate them.

use image::DynamicImage;
use printpdf::{
    BuiltinFont, Color, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt,
    RawImage, RawImageData, RawImageFormat, Rgb, TextItem, XObjectTransform,
};
use tracing::{debug, instrument, warn};
use wandler_core::error::{Result, WandlerError};

use crate::geometry::{PlacementRect, Size};
use crate::pdf::reader::{load_document, save_document};
use crate::units::{Unit, from_points};

/// Images are embedded at 72 DPI so one pixel spans one point before scaling.
const IMAGE_DPI: f32 = 72.0;

/// Line advance as a multiple of the font size.
const LINE_SPACING: f64 = 1.2;

/// Text colour, 8-bit RGB.
pub type TextColor = [u8; 3];

/// Incrementally builds a PDF, one page at a time.
///
/// ```ignore
/// let mut composer = PdfComposer::new("merged");
/// composer.begin_page(A4);
/// composer.draw_image(&bitmap, rect)?;
/// let bytes = composer.finish()?;
/// ```
pub struct PdfComposer {
    doc: PdfDocument,
    pages: Vec<PdfPage>,
    current: Option<OpenPage>,
}

struct OpenPage {
    size: Size,
    ops: Vec<Op>,
}

impl PdfComposer {
    pub fn new(title: &str) -> Self {
        Self {
            doc: PdfDocument::new(title),
            pages: Vec::new(),
            current: None,
        }
    }

    /// Start a new page of `size` points, closing any page still open.
    pub fn begin_page(&mut self, size: Size) {
        self.finish_page();
        self.current = Some(OpenPage {
            size,
            ops: Vec::new(),
        });
    }

    /// Close the open page, if any.
    pub fn finish_page(&mut self) {
        if let Some(page) = self.current.take() {
            let width = Mm(from_points(page.size.width, Unit::Millimeter, 1.0) as f32);
            let height = Mm(from_points(page.size.height, Unit::Millimeter, 1.0) as f32);
            self.pages.push(PdfPage::new(width, height, page.ops));
        }
    }

    /// Pages finished or in progress.
    pub fn page_count(&self) -> usize {
        self.pages.len() + usize::from(self.current.is_some())
    }

    // -- Drawing --------------------------------------------------------------

    /// Place `image` on the open page so it exactly covers `rect`.
    pub fn draw_image(&mut self, image: &DynamicImage, rect: PlacementRect) -> Result<()> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(WandlerError::Image("cannot place an empty bitmap".to_string()));
        }

        let rgb = image.to_rgb8();
        let raw = RawImage {
            pixels: RawImageData::U8(rgb.into_raw()),
            width: width as usize,
            height: height as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };
        let xobject_id = self.doc.add_image(&raw);

        let page = self.open_page()?;
        let canvas_height = page.size.height;
        page.ops.push(Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(rect.left as f32)),
                translate_y: Some(Pt(rect.bottom_offset(canvas_height) as f32)),
                scale_x: Some((rect.width / f64::from(width)) as f32),
                scale_y: Some((rect.height / f64::from(height)) as f32),
                dpi: Some(IMAGE_DPI),
                rotate: None,
            },
        });
        Ok(())
    }

    /// Write `text` in Helvetica inside `rect`, wrapping to its width.
    ///
    /// Lines that would fall below the rect are dropped. With `centered` each
    /// line is centred using an estimated glyph width.
    pub fn draw_text(
        &mut self,
        text: &str,
        rect: PlacementRect,
        font_size: f64,
        color: TextColor,
        centered: bool,
    ) -> Result<()> {
        let page = self.open_page()?;
        let canvas_height = page.size.height;
        let char_width = estimated_char_width(font_size);
        let max_chars = ((rect.width / char_width).floor() as usize).max(1);
        let line_height = font_size * LINE_SPACING;

        let [r, g, b] = color;
        page.ops.push(Op::SetFillColor {
            col: Color::Rgb(Rgb {
                r: f32::from(r) / 255.0,
                g: f32::from(g) / 255.0,
                b: f32::from(b) / 255.0,
                icc_profile: None,
            }),
        });

        for (index, line) in wrap_text(text, max_chars).into_iter().enumerate() {
            // Baseline of line n, measured from the rect's top edge.
            let baseline = font_size + index as f64 * line_height;
            if index > 0 && baseline > rect.height {
                debug!(dropped_from = index, "Text overflows its box");
                break;
            }
            let indent = if centered {
                ((rect.width - line.chars().count() as f64 * char_width) / 2.0).max(0.0)
            } else {
                0.0
            };

            page.ops.push(Op::StartTextSection);
            page.ops.push(Op::SetTextCursor {
                pos: Point {
                    x: Pt((rect.left + indent) as f32),
                    y: Pt((canvas_height - rect.top - baseline) as f32),
                },
            });
            page.ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(font_size as f32),
                font: BuiltinFont::Helvetica,
            });
            page.ops.push(Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(line)],
                font: BuiltinFont::Helvetica,
            });
            page.ops.push(Op::EndTextSection);
        }
        Ok(())
    }

    // -- Output ---------------------------------------------------------------

    /// Serialise the document with deflated streams.
    #[instrument(skip_all, fields(pages = self.page_count()))]
    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.finish_page();
        if self.pages.is_empty() {
            return Err(WandlerError::Pdf("document has no pages".to_string()));
        }
        self.doc.with_pages(self.pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let raw = self.doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "printpdf reported warnings while saving");
        }

        let mut document = load_document(&raw)?;
        document.compress();
        let output = save_document(&mut document)?;
        debug!(raw = raw.len(), compressed = output.len(), "PDF serialised");
        Ok(output)
    }

    fn open_page(&mut self) -> Result<&mut OpenPage> {
        self.current
            .as_mut()
            .ok_or_else(|| WandlerError::Internal("no page is open for drawing".to_string()))
    }
}

/// Average Helvetica glyph width is roughly half the font size.
fn estimated_char_width(font_size: f64) -> f64 {
    0.5 * font_size
}

// -- Text wrapping helper -----------------------------------------------------

/// Wrap a multi-line string so that no line exceeds `max_width` characters.
///
/// Splits on existing newlines first, then performs simple word-wrap within each
/// paragraph. Words longer than `max_width` are force-broken.
pub(crate) fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut result = Vec::new();

    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            result.push(String::new());
            continue;
        }

        let mut current_line = String::new();
        let mut current_len = 0usize;

        for word in words {
            let word_len = word.chars().count();
            if word_len > max_width {
                if !current_line.is_empty() {
                    result.push(std::mem::take(&mut current_line));
                }
                let chars: Vec<char> = word.chars().collect();
                let mut chunks = chars.chunks(max_width).peekable();
                while let Some(chunk) = chunks.next() {
                    if chunks.peek().is_some() {
                        result.push(chunk.iter().collect());
                    } else {
                        current_line = chunk.iter().collect();
                        current_len = chunk.len();
                    }
                }
            } else if current_line.is_empty() {
                current_line.push_str(word);
                current_len = word_len;
            } else if current_len + 1 + word_len <= max_width {
                current_line.push(' ');
                current_line.push_str(word);
                current_len += 1 + word_len;
            } else {
                result.push(std::mem::replace(&mut current_line, word.to_owned()));
                current_len = word_len;
            }
        }

        if !current_line.is_empty() {
            result.push(current_line);
        }
    }

    result
}
