// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pdfium rasterisation backend (feature-gated behind "pdfium").
//
// pdfium is not re-entrant, so the library is bound under one process-wide
// lock and every pdfium handle is released before the lock is. A document
// session binds and parses the PDF once, then renders each page from it.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use image::{DynamicImage, RgbaImage};
use pdfium_render::prelude::*;
use tracing::{debug, info, instrument};
use wandler_core::error::{Result, WandlerError};

use super::{PageImage, PageRasterizer, RenderPage, target_dimensions};
use crate::pdf::SourceDocument;

static PDFIUM_LOCK: Mutex<()> = Mutex::new(());

/// Renders pages through the pdfium shared library.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    library_dir: Option<PathBuf>,
}

impl PdfiumRasterizer {
    /// Locate pdfium in `library_dir`, or in the working directory and then
    /// the system library path. Fails if the library cannot be loaded.
    pub fn new(library_dir: Option<PathBuf>) -> Result<Self> {
        let rasterizer = Self { library_dir };
        {
            let _guard = lock()?;
            rasterizer.bind()?;
        }
        info!(dir = ?rasterizer.library_dir, "pdfium rasterizer ready");
        Ok(rasterizer)
    }

    fn bind(&self) -> Result<Pdfium> {
        let bindings = match &self.library_dir {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|err| WandlerError::Render(format!("failed to load pdfium: {err}")))?;
        Ok(Pdfium::new(bindings))
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn render(&self, source: &SourceDocument, page_index: usize, scale: f32) -> Result<PageImage> {
        let mut page = None;
        self.with_document(source, &mut |render| {
            page = Some(render(page_index, scale)?);
            Ok(())
        })?;
        page.ok_or_else(|| WandlerError::Internal("pdfium session rendered nothing".into()))
    }

    #[instrument(skip_all, fields(name = %source.name(), pages = source.page_count()))]
    fn with_document(
        &self,
        source: &SourceDocument,
        work: &mut dyn FnMut(&RenderPage<'_>) -> Result<()>,
    ) -> Result<()> {
        let _guard = lock()?;
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(source.bytes(), None)
            .map_err(|err| WandlerError::Render(format!("pdfium cannot open document: {err}")))?;
        debug!("pdfium document opened");

        work(&|page_index, scale| render_page(&document, source, page_index, scale))
    }

    fn name(&self) -> &'static str {
        "pdfium"
    }
}

#[instrument(skip_all, fields(page = page_index, scale))]
fn render_page(
    document: &PdfDocument<'_>,
    source: &SourceDocument,
    page_index: usize,
    scale: f32,
) -> Result<PageImage> {
    let (width, height) = target_dimensions(source, page_index, scale)?;
    let index = u16::try_from(page_index)
        .map_err(|_| WandlerError::Render(format!("page index {page_index} too large")))?;

    let page = document
        .pages()
        .get(index)
        .map_err(|err| WandlerError::Render(format!("pdfium cannot load page: {err}")))?;

    let config = PdfRenderConfig::new()
        .set_target_width(width as i32)
        .set_target_height(height as i32);
    let bitmap = page
        .render_with_config(&config)
        .map_err(|err| WandlerError::Render(format!("pdfium render failed: {err}")))?;

    let (out_width, out_height) = (bitmap.width() as u32, bitmap.height() as u32);
    let pixels = RgbaImage::from_raw(out_width, out_height, bitmap.as_rgba_bytes())
        .ok_or_else(|| WandlerError::Render("pdfium returned a truncated bitmap".into()))?;

    debug!(width = out_width, height = out_height, "Page rendered");
    Ok(DynamicImage::ImageRgba8(pixels))
}

fn lock() -> Result<MutexGuard<'static, ()>> {
    PDFIUM_LOCK
        .lock()
        .map_err(|_| WandlerError::Internal("pdfium lock poisoned".to_string()))
}
