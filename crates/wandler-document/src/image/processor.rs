// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decode uploaded images and encode page bitmaps for the
// container writers (PNG for slides, JPEG for page exports).

use image::{DynamicImage, ImageFormat};
use tracing::{debug, instrument};
use wandler_core::error::WandlerError;

use crate::geometry::Size;

/// A single in-memory image.
///
/// ```ignore
/// let jpeg = ImageProcessor::from_bytes(&upload)?.to_jpeg_bytes(95)?;
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, WandlerError> {
        let img = image::load_from_memory(data)
            .map_err(|err| WandlerError::Image(format!("failed to decode image: {err}")))?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Decode bytes that must be in `format`.
    pub fn from_bytes_as(data: &[u8], format: ImageFormat) -> Result<Self, WandlerError> {
        let img = image::load_from_memory_with_format(data, format).map_err(|err| {
            WandlerError::Image(format!("failed to decode {format:?} image: {err}"))
        })?;
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Natural size, one point per pixel.
    pub fn size(&self) -> Size {
        Size::new(f64::from(self.width()), f64::from(self.height()))
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, WandlerError> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode the current image as baseline JPEG with the given quality (1-100).
    /// Any alpha channel is dropped.
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, WandlerError> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        rgb.write_with_encoder(encoder)
            .map_err(|err| WandlerError::Image(format!("JPEG encoding failed: {err}")))?;
        Ok(buffer)
    }
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, WandlerError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| WandlerError::Image(format!("image encoding failed: {err}")))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn sample(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 40, 40])))
    }

    #[test]
    fn jpeg_round_trip_keeps_dimensions() {
        let jpeg = ImageProcessor::from_dynamic(sample(60, 80))
            .to_jpeg_bytes(90)
            .unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let decoded = ImageProcessor::from_bytes_as(&jpeg, ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (60, 80));
        assert_eq!(decoded.size(), Size::new(60.0, 80.0));
    }

    #[test]
    fn png_output_has_signature() {
        let png = ImageProcessor::from_dynamic(sample(4, 4)).to_png_bytes().unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn garbage_is_an_image_error() {
        assert!(matches!(
            ImageProcessor::from_bytes(b"not an image"),
            Err(WandlerError::Image(_))
        ));
    }
}
