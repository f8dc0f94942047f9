// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Container assembler — turns an ordered run of page images into pages or
// slides of a target container.
//
// Items are processed strictly in source order. An item that fails to render
// or insert is replaced by a placeholder page carrying the error, so the
// output always has exactly one page per source item.

use image::DynamicImage;
use tracing::{debug, info, instrument, warn};
use wandler_core::error::{Result, WandlerError};
use wandler_core::types::{FitPolicy, MarginPolicy, Orientation, PageSizePolicy};

use crate::geometry::{A4, PlacementRect, Size, US_LETTER, compute_canvas, compute_placement};
use crate::image::ImageProcessor;
use crate::pdf::{PdfComposer, SourceDocument};
use crate::pdf::writer::TextColor;
use crate::pptx::PresentationComposer;
use crate::raster::RenderPage;

const PLACEHOLDER_FONT_SIZE: f64 = 14.0;
const PLACEHOLDER_COLOR: TextColor = [192, 0, 0];
const PLACEHOLDER_INSET: f64 = 36.0;

// -- Sources ------------------------------------------------------------------

/// An ordered sequence of items that can each be drawn as one page.
pub trait PageSource {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Natural size of item `index` in points.
    fn item_size(&self, index: usize) -> Result<Size>;

    fn render(&self, index: usize) -> Result<DynamicImage>;

    /// Display name of the whole source, used in captions.
    fn name(&self) -> &str;
}

/// Pages of a PDF, rendered at a fixed scale by a rasterizer session
/// (see [`PageRasterizer::with_document`](crate::raster::PageRasterizer::with_document)).
pub struct PdfPages<'a> {
    source: &'a SourceDocument,
    render: &'a RenderPage<'a>,
    scale: f32,
}

impl<'a> PdfPages<'a> {
    pub fn new(source: &'a SourceDocument, render: &'a RenderPage<'a>, scale: f32) -> Self {
        Self {
            source,
            render,
            scale,
        }
    }
}

impl PageSource for PdfPages<'_> {
    fn len(&self) -> usize {
        self.source.page_count()
    }

    fn item_size(&self, index: usize) -> Result<Size> {
        self.source.page_size(index)
    }

    fn render(&self, index: usize) -> Result<DynamicImage> {
        (self.render)(index, self.scale)
    }

    fn name(&self) -> &str {
        self.source.name()
    }
}

/// Uploaded images, decoded up front. One pixel counts as one point.
pub struct ImageSet {
    name: String,
    images: Vec<Result<ImageProcessor>>,
}

impl ImageSet {
    pub fn decode<B: AsRef<[u8]>>(name: &str, files: &[B]) -> Self {
        let images = files
            .iter()
            .enumerate()
            .map(|(index, data)| {
                ImageProcessor::from_bytes(data.as_ref()).inspect_err(|err| {
                    warn!(image = index + 1, %err, "Image could not be decoded");
                })
            })
            .collect();
        Self {
            name: name.to_owned(),
            images,
        }
    }

    fn get(&self, index: usize) -> Result<&ImageProcessor> {
        match self.images.get(index) {
            Some(Ok(image)) => Ok(image),
            Some(Err(err)) => Err(WandlerError::Image(err.to_string())),
            None => Err(WandlerError::Internal(format!("image index {index} out of range"))),
        }
    }
}

impl PageSource for ImageSet {
    fn len(&self) -> usize {
        self.images.len()
    }

    fn item_size(&self, index: usize) -> Result<Size> {
        self.get(index).map(ImageProcessor::size)
    }

    fn render(&self, index: usize) -> Result<DynamicImage> {
        self.get(index).map(|image| image.as_dynamic().clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// -- Sinks --------------------------------------------------------------------

/// A container that grows one page (or slide) at a time.
pub trait ContainerSink {
    /// Start a new page. Returns the canvas actually used, which may differ
    /// from `canvas` when the container fixes or clamps its page size.
    fn begin(&mut self, canvas: Size) -> Result<Size>;

    fn place_image(&mut self, image: &DynamicImage, rect: PlacementRect) -> Result<()>;

    fn place_text(
        &mut self,
        text: &str,
        rect: PlacementRect,
        font_size: f64,
        color: TextColor,
        centered: bool,
    ) -> Result<()>;

    fn page_count(&self) -> usize;
}

impl ContainerSink for PdfComposer {
    fn begin(&mut self, canvas: Size) -> Result<Size> {
        self.begin_page(canvas);
        Ok(canvas)
    }

    fn place_image(&mut self, image: &DynamicImage, rect: PlacementRect) -> Result<()> {
        self.draw_image(image, rect)
    }

    fn place_text(
        &mut self,
        text: &str,
        rect: PlacementRect,
        font_size: f64,
        color: TextColor,
        centered: bool,
    ) -> Result<()> {
        self.draw_text(text, rect, font_size, color, centered)
    }

    fn page_count(&self) -> usize {
        PdfComposer::page_count(self)
    }
}

impl ContainerSink for PresentationComposer {
    fn begin(&mut self, _canvas: Size) -> Result<Size> {
        self.add_slide();
        Ok(self.slide_size())
    }

    fn place_image(&mut self, image: &DynamicImage, rect: PlacementRect) -> Result<()> {
        self.add_image(image, rect)
    }

    fn place_text(
        &mut self,
        text: &str,
        rect: PlacementRect,
        font_size: f64,
        color: TextColor,
        centered: bool,
    ) -> Result<()> {
        self.add_text_box(text, rect, font_size, color, centered)
    }

    fn page_count(&self) -> usize {
        self.slide_count()
    }
}

// -- Options ------------------------------------------------------------------

/// How the canvas is chosen across a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanvasMode {
    /// Computed once, from the first item, and reused for every page.
    #[default]
    Uniform,
    /// Computed for every item from its own size.
    PerSource,
}

/// A label drawn over the first page only.
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub text: String,
    pub font_size: f64,
    pub color: TextColor,
}

impl Caption {
    /// `Document: {name}` in 10pt dark grey.
    pub fn document_name(name: &str) -> Self {
        Self {
            text: format!("Document: {name}"),
            font_size: 10.0,
            color: [64, 64, 64],
        }
    }

    /// A strip 0.1in below the top edge, inset 0.2in on both sides.
    pub fn rect(canvas: Size) -> PlacementRect {
        PlacementRect {
            left: 14.4,
            top: 7.2,
            width: (canvas.width - 28.8).max(1.0),
            height: 28.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyOptions {
    pub page_size: PageSizePolicy,
    /// `None` keeps each item's natural orientation.
    pub orientation: Option<Orientation>,
    pub margin: MarginPolicy,
    pub fit: FitPolicy,
    pub mode: CanvasMode,
    pub caption: Option<Caption>,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            page_size: PageSizePolicy::A4,
            orientation: None,
            margin: MarginPolicy::Small,
            fit: FitPolicy::Contain,
            mode: CanvasMode::Uniform,
            caption: None,
        }
    }
}

impl AssemblyOptions {
    /// Every page replicated edge to edge on a canvas the size of the first
    /// source page.
    pub fn full_page() -> Self {
        Self {
            page_size: PageSizePolicy::FitToSource,
            orientation: None,
            margin: MarginPolicy::None,
            fit: FitPolicy::Fill,
            mode: CanvasMode::Uniform,
            caption: None,
        }
    }

    pub fn with_caption(mut self, caption: Caption) -> Self {
        self.caption = Some(caption);
        self
    }

    fn canvas_for(&self, source: Size) -> Result<Size> {
        let orientation = self.orientation.unwrap_or_else(|| source.orientation());
        compute_canvas(self.page_size, orientation, self.margin, source)
    }

    /// Canvas for an item whose size is unknown.
    fn fallback_canvas(&self) -> Size {
        let base = match self.page_size {
            PageSizePolicy::UsLetter => US_LETTER,
            _ => A4,
        };
        base.oriented(self.orientation.unwrap_or_default())
    }
}

/// Outcome of one assembly run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    pub pages: usize,
    /// 1-based numbers of items replaced by placeholders.
    pub degraded: Vec<usize>,
}

// -- Assembly -----------------------------------------------------------------

/// Draw every item of `source` onto its own page of `sink`.
///
/// Fails only when the sink itself cannot take a page; per-item failures
/// become placeholders.
#[instrument(skip_all, fields(source = %source.name(), items = source.len(), mode = ?options.mode))]
pub fn assemble(
    source: &dyn PageSource,
    sink: &mut dyn ContainerSink,
    options: &AssemblyOptions,
) -> Result<AssemblyReport> {
    if source.is_empty() {
        return Err(WandlerError::Validation(format!(
            "{} has nothing to convert",
            source.name()
        )));
    }

    let mut report = AssemblyReport::default();
    let mut uniform: Option<Size> = None;

    for index in 0..source.len() {
        let size = source.item_size(index);
        let canvas = match (options.mode, uniform, &size) {
            (CanvasMode::Uniform, Some(fixed), _) => Ok(fixed),
            (_, _, Ok(size)) => options.canvas_for(*size),
            (_, _, Err(err)) => Err(WandlerError::Render(err.to_string())),
        };
        let planned = canvas.as_ref().ok().copied();
        if options.mode == CanvasMode::Uniform && uniform.is_none() {
            uniform = planned;
        }

        let before = sink.page_count();
        let outcome = canvas.and_then(|canvas| {
            let size = size?;
            place_item(source, sink, options, index, canvas, size)
        });

        match outcome {
            Ok(()) => debug!(item = index + 1, "Item placed"),
            Err(err) => {
                warn!(item = index + 1, %err, "Item replaced by placeholder");
                let canvas = planned.unwrap_or_else(|| options.fallback_canvas());
                let started = sink.page_count() > before;
                add_placeholder(sink, canvas, !started, index + 1, &err)?;
                report.degraded.push(index + 1);
            }
        }
        report.pages += 1;
    }

    if sink.page_count() != source.len() {
        return Err(WandlerError::Internal(format!(
            "assembled {} pages from {} items",
            sink.page_count(),
            source.len()
        )));
    }
    info!(
        pages = report.pages,
        degraded = report.degraded.len(),
        "Assembly complete"
    );
    Ok(report)
}

fn place_item(
    source: &dyn PageSource,
    sink: &mut dyn ContainerSink,
    options: &AssemblyOptions,
    index: usize,
    canvas: Size,
    size: Size,
) -> Result<()> {
    let image = source.render(index)?;
    let canvas = sink.begin(canvas)?;
    let rect = compute_placement(canvas, size, options.margin, options.fit)?;
    sink.place_image(&image, rect)?;

    if index == 0
        && let Some(caption) = &options.caption
    {
        sink.place_text(
            &caption.text,
            Caption::rect(canvas),
            caption.font_size,
            caption.color,
            true,
        )?;
    }
    Ok(())
}

/// Put an error notice for item `number` on `canvas`, starting a new page
/// for it unless one is already open.
pub fn add_placeholder(
    sink: &mut dyn ContainerSink,
    canvas: Size,
    new_page: bool,
    number: usize,
    err: &WandlerError,
) -> Result<()> {
    let canvas = if new_page { sink.begin(canvas)? } else { canvas };
    let inset = PLACEHOLDER_INSET.min(canvas.width / 4.0).min(canvas.height / 4.0);
    let rect = PlacementRect {
        left: inset,
        top: inset,
        width: canvas.width - 2.0 * inset,
        height: canvas.height - 2.0 * inset,
    };
    sink.place_text(
        &format!("Page {number} could not be converted.\n{err}"),
        rect,
        PLACEHOLDER_FONT_SIZE,
        PLACEHOLDER_COLOR,
        true,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::PageRasterizer;
    use crate::testing::{FailingRasterizer, jpeg_fixture, pdf_fixture};

    /// Records what an assembly run draws.
    #[derive(Default)]
    struct RecordingSink {
        pages: Vec<Page>,
    }

    #[derive(Debug)]
    struct Page {
        canvas: Size,
        images: Vec<PlacementRect>,
        texts: Vec<String>,
    }

    impl ContainerSink for RecordingSink {
        fn begin(&mut self, canvas: Size) -> Result<Size> {
            self.pages.push(Page {
                canvas,
                images: Vec::new(),
                texts: Vec::new(),
            });
            Ok(canvas)
        }

        fn place_image(&mut self, _image: &DynamicImage, rect: PlacementRect) -> Result<()> {
            self.pages.last_mut().unwrap().images.push(rect);
            Ok(())
        }

        fn place_text(
            &mut self,
            text: &str,
            _rect: PlacementRect,
            _font_size: f64,
            _color: TextColor,
            _centered: bool,
        ) -> Result<()> {
            self.pages.last_mut().unwrap().texts.push(text.to_owned());
            Ok(())
        }

        fn page_count(&self) -> usize {
            self.pages.len()
        }
    }

    #[test]
    fn page_count_survives_injected_failures() {
        for n in [1usize, 5, 50] {
            let sizes = vec![(100.0, 140.0); n];
            let bytes = pdf_fixture(&sizes);
            let source = SourceDocument::open(&bytes, "many.pdf").unwrap();
            let rasterizer = FailingRasterizer::failing((0..n).step_by(3));
            let render = |index, scale| rasterizer.render(&source, index, scale);
            let pages = PdfPages::new(&source, &render, 1.0);

            let mut composer = PdfComposer::new("many");
            let report = assemble(&pages, &mut composer, &AssemblyOptions::full_page()).unwrap();
            assert_eq!(report.pages, n);
            assert_eq!(report.degraded, (0..n).step_by(3).map(|i| i + 1).collect::<Vec<_>>());

            let output = composer.finish().unwrap();
            let reopened = SourceDocument::open(&output, "out.pdf").unwrap();
            assert_eq!(reopened.page_count(), n, "n = {n}");
        }
    }

    #[test]
    fn every_page_failing_still_yields_a_deck() {
        let bytes = pdf_fixture(&[(612.0, 792.0), (612.0, 792.0)]);
        let source = SourceDocument::open(&bytes, "broken.pdf").unwrap();
        let rasterizer = FailingRasterizer::failing([0, 1]);
        let render = |index, scale| rasterizer.render(&source, index, scale);
        let pages = PdfPages::new(&source, &render, 1.0);

        let mut sink = RecordingSink::default();
        let report = assemble(&pages, &mut sink, &AssemblyOptions::full_page()).unwrap();
        assert_eq!(report.degraded, vec![1, 2]);
        assert_eq!(sink.pages.len(), 2);
        assert!(sink.pages[1].texts[0].starts_with("Page 2 could not be converted."));
        assert_eq!(sink.pages[0].canvas, Size::new(612.0, 792.0));
    }

    #[test]
    fn uniform_canvas_comes_from_first_page() {
        let bytes = pdf_fixture(&[(400.0, 300.0), (300.0, 400.0)]);
        let source = SourceDocument::open(&bytes, "mixed.pdf").unwrap();
        let rasterizer = FailingRasterizer::default();
        let render = |index, scale| rasterizer.render(&source, index, scale);
        let pages = PdfPages::new(&source, &render, 1.0);

        let mut sink = RecordingSink::default();
        assemble(&pages, &mut sink, &AssemblyOptions::full_page()).unwrap();
        for page in &sink.pages {
            assert_eq!(page.canvas, Size::new(400.0, 300.0));
            assert_eq!(page.images[0].width, 400.0);
            assert_eq!(page.images[0].height, 300.0);
        }
    }

    #[test]
    fn caption_only_on_first_page() {
        let bytes = pdf_fixture(&[(612.0, 792.0); 3]);
        let source = SourceDocument::open(&bytes, "report.pdf").unwrap();
        let rasterizer = FailingRasterizer::default();
        let render = |index, scale| rasterizer.render(&source, index, scale);
        let pages = PdfPages::new(&source, &render, 1.0);
        let options = AssemblyOptions::full_page().with_caption(Caption::document_name("report.pdf"));

        let mut sink = RecordingSink::default();
        assemble(&pages, &mut sink, &options).unwrap();
        assert_eq!(sink.pages[0].texts, vec!["Document: report.pdf".to_string()]);
        assert!(sink.pages[1].texts.is_empty());
        assert!(sink.pages[2].texts.is_empty());
    }

    #[test]
    fn images_keep_aspect_inside_margins() {
        let files = vec![jpeg_fixture(600, 800), jpeg_fixture(800, 600)];
        let images = ImageSet::decode("photos", &files);
        let options = AssemblyOptions {
            page_size: PageSizePolicy::A4,
            orientation: Some(Orientation::Portrait),
            margin: MarginPolicy::Small,
            fit: FitPolicy::Contain,
            mode: CanvasMode::PerSource,
            caption: None,
        };

        let mut sink = RecordingSink::default();
        let report = assemble(&images, &mut sink, &options).unwrap();
        assert!(report.degraded.is_empty());
        assert_eq!(sink.pages.len(), 2);

        for (page, (w, h)) in sink.pages.iter().zip([(600.0, 800.0), (800.0, 600.0)]) {
            assert_eq!(page.canvas, A4);
            let rect = page.images[0];
            assert!(rect.left >= 20.0 - 1e-9 && rect.top >= 20.0 - 1e-9);
            assert!(rect.right() <= A4.width - 20.0 + 1e-9);
            assert!(rect.bottom() <= A4.height - 20.0 + 1e-9);
            assert!((rect.width / rect.height - w / h).abs() < 1e-9);
        }
    }

    #[test]
    fn undecodable_image_becomes_placeholder() {
        let files = vec![jpeg_fixture(10, 10), b"not an image".to_vec()];
        let images = ImageSet::decode("photos", &files);
        let options = AssemblyOptions {
            page_size: PageSizePolicy::FitToSource,
            orientation: Some(Orientation::Landscape),
            mode: CanvasMode::PerSource,
            ..AssemblyOptions::default()
        };

        let mut sink = RecordingSink::default();
        let report = assemble(&images, &mut sink, &options).unwrap();
        assert_eq!(report.degraded, vec![2]);
        assert_eq!(sink.pages[1].canvas, A4.oriented(Orientation::Landscape));
    }

    #[test]
    fn empty_source_is_rejected() {
        let images = ImageSet::decode("none", &Vec::<Vec<u8>>::new());
        let mut sink = RecordingSink::default();
        assert!(matches!(
            assemble(&images, &mut sink, &AssemblyOptions::default()),
            Err(WandlerError::Validation(_))
        ));
    }
}
