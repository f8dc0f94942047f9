// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// wandler-document — Page-image document conversion for the Wandler service.
//
// Provides the geometry engine and unit conversions, PDF and PPTX readers and
// writers, page rasterisation (pdfium behind the "pdfium" feature), the
// container assembler, PDF lock/unlock/compress, and the conversion
// orchestrators built on top of them.

pub mod assemble;
pub mod compress;
pub mod convert;
pub mod geometry;
pub mod image;
pub mod pdf;
pub mod pptx;
pub mod raster;
pub mod security;
pub mod units;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export the primary entry points so callers can use `wandler_document::Converter` etc.
pub use compress::{CompressionOutcome, compress_pdf};
pub use convert::{ConversionOutput, ConversionSettings, Converter, ImageLayout};
pub use image::processor::ImageProcessor;
pub use pdf::{PdfComposer, SourceDocument};
pub use pptx::PresentationComposer;
pub use raster::{PageRasterizer, UnavailableRasterizer};
pub use security::{ProtectionState, SecuredOutput, SecurityOperator};

#[cfg(feature = "pdfium")]
pub use raster::PdfiumRasterizer;
