// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Conversion orchestrators — one entry point per supported conversion.
//
// Every conversion works on whole-page images: PDF pages are rasterised and
// placed onto slides or JPEGs, images are placed onto PDF pages, and slides
// are redrawn element by element onto PDF pages.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use wandler_core::config::AppConfig;
use wandler_core::error::{Result, WandlerError};
use wandler_core::types::{ArtifactKind, FitPolicy, MarginPolicy, Orientation, PageSizePolicy};

use crate::assemble::{
    AssemblyOptions, CanvasMode, Caption, ImageSet, PdfPages, add_placeholder, assemble,
};
use crate::geometry::PlacementRect;
use crate::image::ImageProcessor;
use crate::pdf::{PdfComposer, SourceDocument};
use crate::pptx::{PresentationComposer, Slide, SlideElement, read_presentation};
use crate::raster::PageRasterizer;

/// Inset used for slide text that has no position of its own.
const UNPLACED_TEXT_INSET: f64 = 36.0;

/// Tunables shared by every conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionSettings {
    pub render_scale: f32,
    pub caption_render_scale: f32,
    pub jpeg_quality: u8,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            render_scale: 2.0,
            caption_render_scale: 3.0,
            jpeg_quality: 95,
        }
    }
}

impl From<&AppConfig> for ConversionSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            render_scale: config.render_scale,
            caption_render_scale: config.caption_render_scale,
            jpeg_quality: config.jpeg_quality,
        }
    }
}

/// A finished conversion, ready to be stored as an artifact.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub bytes: Vec<u8>,
    pub kind: ArtifactKind,
    pub filename: String,
    pub page_count: usize,
    /// 1-based pages or slides replaced by error placeholders.
    pub degraded_pages: Vec<usize>,
}

/// Layout choices for images to PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImageLayout {
    pub page_size: PageSizePolicy,
    pub orientation: Orientation,
    pub margin: MarginPolicy,
    pub merge_all: bool,
}

/// Runs conversions against one rasterisation backend.
#[derive(Clone)]
pub struct Converter {
    rasterizer: Arc<dyn PageRasterizer>,
    settings: ConversionSettings,
}

impl Converter {
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, settings: ConversionSettings) -> Self {
        Self {
            rasterizer,
            settings,
        }
    }

    pub fn rasterizer_name(&self) -> &'static str {
        self.rasterizer.name()
    }

    pub fn settings(&self) -> &ConversionSettings {
        &self.settings
    }

    // -- PDF to presentation --------------------------------------------------

    /// One slide per page, each page stretched over a slide the size of the
    /// first page.
    #[instrument(skip_all, fields(name = %name, bytes_len = data.len()))]
    pub fn pdf_to_presentation(&self, data: &[u8], name: &str) -> Result<ConversionOutput> {
        let filename = format!("converted_{}.pptx", file_stem(name));
        self.render_deck(
            data,
            name,
            filename,
            self.settings.render_scale,
            AssemblyOptions::full_page(),
        )
    }

    /// Like `pdf_to_presentation`, rendered at the caption scale with the
    /// document name overlaid on the first slide.
    #[instrument(skip_all, fields(name = %name, bytes_len = data.len()))]
    pub fn pdf_to_presentation_captioned(
        &self,
        data: &[u8],
        name: &str,
        output_name: Option<&str>,
    ) -> Result<ConversionOutput> {
        let filename = match output_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(requested) => with_extension(requested, "pptx"),
            None => format!("converted_{}.pptx", file_stem(name)),
        };
        let options = AssemblyOptions::full_page().with_caption(Caption::document_name(name));
        self.render_deck(
            data,
            name,
            filename,
            self.settings.caption_render_scale,
            options,
        )
    }

    fn render_deck(
        &self,
        data: &[u8],
        name: &str,
        filename: String,
        scale: f32,
        options: AssemblyOptions,
    ) -> Result<ConversionOutput> {
        let source = SourceDocument::open(data, name)?;
        let first_page = source.page_size(0)?;
        let mut deck = PresentationComposer::new(&file_stem(name), first_page);

        let mut report = None;
        self.rasterizer.with_document(&source, &mut |render| {
            let pages = PdfPages::new(&source, render, scale);
            report = Some(assemble(&pages, &mut deck, &options)?);
            Ok(())
        })?;
        let report = report
            .ok_or_else(|| WandlerError::Internal("rasterizer session never ran".to_string()))?;
        let bytes = deck.finish()?;

        info!(slides = report.pages, degraded = report.degraded.len(), "PDF converted to presentation");
        Ok(ConversionOutput {
            bytes,
            kind: ArtifactKind::Pptx,
            filename,
            page_count: report.pages,
            degraded_pages: report.degraded,
        })
    }

    // -- Presentation to PDF --------------------------------------------------

    /// Redraw every slide as a PDF page the size of the slide.
    #[instrument(skip_all, fields(name = %name, bytes_len = data.len()))]
    pub fn presentation_to_pdf(&self, data: &[u8], name: &str) -> Result<ConversionOutput> {
        let presentation = read_presentation(data)?;
        if presentation.slides.is_empty() {
            return Err(WandlerError::Validation(format!("{name} contains no slides")));
        }

        let canvas = presentation.slide_size;
        let mut composer = PdfComposer::new(&file_stem(name));
        let mut degraded = Vec::new();

        for (index, slide) in presentation.slides.iter().enumerate() {
            let number = index + 1;
            match slide {
                Ok(slide) => {
                    composer.begin_page(canvas);
                    draw_slide(&mut composer, slide, canvas.width, canvas.height);
                    debug!(slide = number, elements = slide.elements.len(), "Slide drawn");
                }
                Err(err) => {
                    warn!(slide = number, %err, "Slide replaced by placeholder");
                    add_placeholder(&mut composer, canvas, true, number, err)?;
                    degraded.push(number);
                }
            }
        }

        let page_count = composer.page_count();
        let bytes = composer.finish()?;
        info!(pages = page_count, degraded = degraded.len(), "Presentation converted to PDF");
        Ok(ConversionOutput {
            bytes,
            kind: ArtifactKind::Pdf,
            filename: format!("converted_{}.pdf", file_stem(name)),
            page_count,
            degraded_pages: degraded,
        })
    }

    // -- Images to PDF --------------------------------------------------------

    /// Place each image on its own page. With `merge_all` and more than one
    /// image the pages form one PDF; otherwise each image gets its own PDF.
    #[instrument(skip_all, fields(images = files.len(), merge = layout.merge_all))]
    pub fn images_to_pdf(
        &self,
        files: &[(String, Vec<u8>)],
        layout: ImageLayout,
    ) -> Result<Vec<ConversionOutput>> {
        if files.is_empty() {
            return Err(WandlerError::Validation("no images were provided".to_string()));
        }
        let options = AssemblyOptions {
            page_size: layout.page_size,
            orientation: Some(layout.orientation),
            margin: layout.margin,
            fit: FitPolicy::Contain,
            mode: CanvasMode::PerSource,
            caption: None,
        };

        if layout.merge_all && files.len() > 1 {
            let filename = format!("merged_{}_images.pdf", files.len());
            let bytes: Vec<&[u8]> = files.iter().map(|(_, data)| data.as_slice()).collect();
            let images = ImageSet::decode(&filename, &bytes);
            return Ok(vec![self.place_images(&images, &options, filename)?]);
        }

        files
            .iter()
            .map(|(name, data)| {
                let images = ImageSet::decode(name, std::slice::from_ref(data));
                self.place_images(&images, &options, format!("converted_{}.pdf", file_stem(name)))
            })
            .collect()
    }

    fn place_images(
        &self,
        images: &ImageSet,
        options: &AssemblyOptions,
        filename: String,
    ) -> Result<ConversionOutput> {
        let mut composer = PdfComposer::new(&file_stem(&filename));
        let report = assemble(images, &mut composer, options)?;
        let bytes = composer.finish()?;
        Ok(ConversionOutput {
            bytes,
            kind: ArtifactKind::Pdf,
            filename,
            page_count: report.pages,
            degraded_pages: report.degraded,
        })
    }

    // -- PDF to image ---------------------------------------------------------

    /// Render one page (1-based) to JPEG.
    #[instrument(skip_all, fields(name = %name, page_number))]
    pub fn pdf_to_image(&self, data: &[u8], name: &str, page_number: u32) -> Result<ConversionOutput> {
        let source = SourceDocument::open(data, name)?;
        let count = source.page_count();
        let index = usize::try_from(page_number).unwrap_or(usize::MAX);
        if index == 0 || index > count {
            return Err(WandlerError::Validation(format!(
                "page_number must be between 1 and {count}, got {page_number}"
            )));
        }

        let page = self
            .rasterizer
            .render(&source, index - 1, self.settings.render_scale)?;
        let bytes = ImageProcessor::from_dynamic(page).to_jpeg_bytes(self.settings.jpeg_quality)?;

        info!(page = page_number, bytes = bytes.len(), "Page rendered to JPEG");
        Ok(ConversionOutput {
            bytes,
            kind: ArtifactKind::Jpg,
            filename: format!("converted_page_{page_number}_{}.jpg", file_stem(name)),
            page_count: 1,
            degraded_pages: Vec::new(),
        })
    }
}

/// Draw the supported elements of `slide` onto the open page. An element
/// that cannot be drawn is skipped.
fn draw_slide(composer: &mut PdfComposer, slide: &Slide, width: f64, height: f64) {
    for element in &slide.elements {
        let drawn = match element {
            SlideElement::Image { bytes, rect } => ImageProcessor::from_bytes(bytes)
                .and_then(|image| composer.draw_image(image.as_dynamic(), *rect)),
            SlideElement::Text { text, rect, style } => {
                let rect = rect.unwrap_or(PlacementRect {
                    left: UNPLACED_TEXT_INSET,
                    top: UNPLACED_TEXT_INSET,
                    width: (width - 2.0 * UNPLACED_TEXT_INSET).max(1.0),
                    height: (height - 2.0 * UNPLACED_TEXT_INSET).max(1.0),
                });
                composer.draw_text(
                    text,
                    rect,
                    style.font_size_pt,
                    style.color.unwrap_or([0, 0, 0]),
                    false,
                )
            }
            SlideElement::Unsupported { kind } => {
                debug!(%kind, "Skipping unsupported slide element");
                Ok(())
            }
        };
        if let Err(err) = drawn {
            warn!(%err, "Slide element skipped");
        }
    }
}

/// File name without directories or extension, falling back to "document".
pub fn file_stem(name: &str) -> String {
    Path::new(name.trim())
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("document")
        .to_owned()
}

/// `name` with `ext` appended unless it already ends in `.ext`.
pub fn with_extension(name: &str, ext: &str) -> String {
    let has_ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext));
    if has_ext {
        name.to_owned()
    } else {
        format!("{name}.{ext}")
    }
}
