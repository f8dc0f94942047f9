// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rasterizer adapter — renders one page of a source PDF to a bitmap.
//
// Bitmaps stay in memory for the whole page step, so no temporary files are
// involved and nothing outlives the caller's use of the returned image.

#[cfg(feature = "pdfium")]
pub mod pdfium;

use image::DynamicImage;
use tracing::warn;
use wandler_core::error::{Result, WandlerError};

use crate::pdf::SourceDocument;
use crate::units::points_to_pixels;

#[cfg(feature = "pdfium")]
pub use self::pdfium::PdfiumRasterizer;

/// A rasterised page. Consumed by the assembler right after rendering.
pub type PageImage = DynamicImage;

/// Renders pages of one opened document: `(page_index, scale)`.
pub type RenderPage<'r> = dyn Fn(usize, f32) -> Result<PageImage> + 'r;

/// Renders PDF pages to bitmaps.
///
/// `scale` is pixels per point: 1.0 renders at 72 DPI, 2.0 at 144 DPI.
pub trait PageRasterizer: Send + Sync {
    fn render(&self, source: &SourceDocument, page_index: usize, scale: f32) -> Result<PageImage>;

    /// Open `source` once and let `work` render any number of its pages.
    ///
    /// Backends with a costly open step override this so a whole document
    /// is loaded a single time.
    fn with_document(
        &self,
        source: &SourceDocument,
        work: &mut dyn FnMut(&RenderPage<'_>) -> Result<()>,
    ) -> Result<()> {
        work(&|page_index, scale| self.render(source, page_index, scale))
    }

    /// Short backend name for logs and the service info endpoint.
    fn name(&self) -> &'static str;
}

/// Pixel dimensions of page `page_index` at `scale`, validating the index.
pub fn target_dimensions(
    source: &SourceDocument,
    page_index: usize,
    scale: f32,
) -> Result<(u32, u32)> {
    if page_index >= source.page_count() {
        return Err(WandlerError::Render(format!(
            "page index {page_index} out of range (document has {} pages)",
            source.page_count()
        )));
    }
    if !(scale.is_finite() && scale > 0.0) {
        return Err(WandlerError::Render(format!("invalid render scale {scale}")));
    }
    let size = source.page_size(page_index)?;
    let scale = f64::from(scale);
    Ok((
        points_to_pixels(size.width, scale),
        points_to_pixels(size.height, scale),
    ))
}

/// Stands in when no rendering backend could be loaded. Every render fails,
/// so conversions show error placeholders instead of blank pages.
#[derive(Debug, Clone)]
pub struct UnavailableRasterizer {
    reason: String,
}

impl UnavailableRasterizer {
    pub fn new(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        warn!(%reason, "No page rasterizer; PDF pages cannot be rendered");
        Self { reason }
    }
}

impl PageRasterizer for UnavailableRasterizer {
    fn render(&self, source: &SourceDocument, page_index: usize, scale: f32) -> Result<PageImage> {
        target_dimensions(source, page_index, scale)?;
        Err(WandlerError::Render(format!(
            "no rasterization backend available ({})",
            self.reason
        )))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingRasterizer, pdf_fixture};

    #[test]
    fn rendered_pages_match_page_size_at_scale() {
        let bytes = pdf_fixture(&[(612.0, 792.0), (300.0, 150.0)]);
        let source = SourceDocument::open(&bytes, "a.pdf").unwrap();
        let rasterizer = FailingRasterizer::default();

        let first = rasterizer.render(&source, 0, 2.0).unwrap();
        assert_eq!((first.width(), first.height()), (1224, 1584));
        let second = rasterizer.render(&source, 1, 1.0).unwrap();
        assert_eq!((second.width(), second.height()), (300, 150));
    }

    #[test]
    fn out_of_range_page_is_a_render_error() {
        let bytes = pdf_fixture(&[(612.0, 792.0)]);
        let source = SourceDocument::open(&bytes, "a.pdf").unwrap();
        assert!(matches!(
            target_dimensions(&source, 1, 2.0),
            Err(WandlerError::Render(_))
        ));
        assert!(matches!(
            target_dimensions(&source, 0, 0.0),
            Err(WandlerError::Render(_))
        ));
    }

    #[test]
    fn missing_backend_never_produces_a_page() {
        let bytes = pdf_fixture(&[(612.0, 792.0)]);
        let source = SourceDocument::open(&bytes, "a.pdf").unwrap();
        let rasterizer = UnavailableRasterizer::new("pdfium not found");

        let err = rasterizer.render(&source, 0, 2.0).unwrap_err();
        assert!(err.to_string().contains("pdfium not found"));
        assert!(matches!(err, WandlerError::Render(_)));
        assert_eq!(rasterizer.name(), "unavailable");
    }

    #[test]
    fn default_session_renders_through_render() {
        let bytes = pdf_fixture(&[(100.0, 100.0), (100.0, 100.0), (100.0, 100.0)]);
        let source = SourceDocument::open(&bytes, "a.pdf").unwrap();
        let rasterizer = FailingRasterizer::failing([1]);

        let mut outcomes = Vec::new();
        rasterizer
            .with_document(&source, &mut |render| {
                outcomes = (0..3).map(|index| render(index, 1.0).is_ok()).collect();
                Ok(())
            })
            .unwrap();
        assert_eq!(outcomes, vec![true, false, true]);
    }
}
