// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fixtures for tests: small PDFs built with lopdf, JPEGs built with image,
// and a rasterizer that fails on chosen pages.

use std::collections::HashSet;

use image::{DynamicImage, Rgb, RgbImage};
use lopdf::{Document, Object, Stream, dictionary};
use wandler_core::error::{Result, WandlerError};

use crate::image::ImageProcessor;
use crate::pdf::SourceDocument;
use crate::raster::{PageImage, PageRasterizer, target_dimensions};

/// A PDF with one page per entry of `sizes` (width, height in points). Every
/// page draws its own number so its content stream is never empty.
pub fn pdf_document(sizes: &[(f64, f64)]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::with_capacity(sizes.len());
    for (index, &(width, height)) in sizes.iter().enumerate() {
        let content = format!("BT /F1 12 Tf 10 10 Td (Page {}) Tj ET", index + 1);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(width as f32), Object::Real(height as f32)],
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

pub fn pdf_fixture(sizes: &[(f64, f64)]) -> Vec<u8> {
    save(pdf_document(sizes))
}

/// One page whose MediaBox and Resources live on the page tree root, with
/// `rotate` set on the page itself.
pub fn pdf_with_inherited_box(width: f64, height: f64, rotate: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        b"0 0 m 10 10 l S".to_vec(),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Rotate" => rotate,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => 1_i64,
            "Kids" => vec![Object::Reference(page_id)],
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(width as f32), Object::Real(height as f32)],
            "Resources" => dictionary! {},
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    save(doc)
}

fn save(mut doc: Document) -> Vec<u8> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("fixture PDF serialises");
    bytes
}

/// A solid-colour baseline JPEG of `width` x `height` pixels.
pub fn jpeg_fixture(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 40, 40])));
    ImageProcessor::from_dynamic(image)
        .to_jpeg_bytes(90)
        .expect("fixture JPEG encodes")
}

/// Renders solid grey pages, except for the zero-based indices in `fail_on`,
/// which fail with a render error.
#[derive(Debug, Default, Clone)]
pub struct FailingRasterizer {
    pub fail_on: HashSet<usize>,
}

impl FailingRasterizer {
    pub fn failing(pages: impl IntoIterator<Item = usize>) -> Self {
        Self {
            fail_on: pages.into_iter().collect(),
        }
    }
}

impl PageRasterizer for FailingRasterizer {
    fn render(&self, source: &SourceDocument, page_index: usize, scale: f32) -> Result<PageImage> {
        if self.fail_on.contains(&page_index) {
            return Err(WandlerError::Render(format!(
                "injected failure on page {}",
                page_index + 1
            )));
        }
        let (width, height) = target_dimensions(source, page_index, scale)?;
        Ok(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            Rgb([128, 128, 128]),
        )))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}
