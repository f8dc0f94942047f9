// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF compression — best-effort size reduction at three levels.
//
//   low    : Flate-compress every stream that allows it
//   medium : low, plus pruning unreferenced objects and empty streams, then
//            renumbering
//   high   : medium, plus re-encoding baseline JPEG images at a lower quality
//            wherever that makes them smaller
//
// Output that ends up no smaller than the input is still returned; only a
// structural failure is an error.

use image::ImageFormat;
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, info, instrument};
use wandler_core::error::{Result, WandlerError};
use wandler_core::types::CompressionLevel;
use wandler_security::{decrypt_document, is_encrypted};

use crate::image::ImageProcessor;
use crate::pdf::reader::{load_document, save_document};

/// JPEG quality used when re-encoding images at the `high` level.
const HIGH_IMAGE_QUALITY: u8 = 60;

#[derive(Debug, Clone)]
pub struct CompressionOutcome {
    pub bytes: Vec<u8>,
    pub original_size: usize,
    pub compressed_size: usize,
    /// Negative when the output grew.
    pub reduction_percent: f64,
}

#[instrument(skip_all, fields(bytes_len = data.len(), level = level.as_str()))]
pub fn compress_pdf(data: &[u8], level: CompressionLevel) -> Result<CompressionOutcome> {
    let mut document = load_document(data)?;
    if is_encrypted(&document) && !decrypt_document(&mut document, "")? {
        return Err(WandlerError::Validation(
            "document is password protected; unlock it first".to_string(),
        ));
    }

    if matches!(level, CompressionLevel::Medium | CompressionLevel::High) {
        let pruned = document.prune_objects();
        let emptied = document.delete_zero_length_streams();
        document.renumber_objects();
        debug!(pruned = pruned.len(), emptied = emptied.len(), "Object graph tidied");
    }
    if level == CompressionLevel::High {
        let recoded = recode_jpeg_images(&mut document, HIGH_IMAGE_QUALITY);
        debug!(recoded, "JPEG images re-encoded");
    }
    document.compress();

    let bytes = save_document(&mut document)?;
    let outcome = CompressionOutcome {
        original_size: data.len(),
        compressed_size: bytes.len(),
        reduction_percent: reduction_percent(data.len(), bytes.len()),
        bytes,
    };
    info!(
        original = outcome.original_size,
        compressed = outcome.compressed_size,
        reduction = outcome.reduction_percent,
        "PDF compressed"
    );
    Ok(outcome)
}

/// Percentage saved, rounded to two decimals.
pub fn reduction_percent(original: usize, compressed: usize) -> f64 {
    if original == 0 {
        return 0.0;
    }
    let saved = (original as f64 - compressed as f64) / original as f64 * 100.0;
    (saved * 100.0).round() / 100.0
}

/// Re-encode 8-bit RGB DCTDecode image XObjects, keeping each new encoding
/// only if it is smaller. Returns how many images were replaced.
fn recode_jpeg_images(document: &mut Document, quality: u8) -> usize {
    let candidates: Vec<ObjectId> = document
        .objects
        .iter()
        .filter_map(|(id, object)| match object {
            Object::Stream(stream) if is_plain_rgb_jpeg(&stream.dict) => Some(*id),
            _ => None,
        })
        .collect();

    let mut replaced = 0;
    for id in candidates {
        let Some(Object::Stream(stream)) = document.objects.get_mut(&id) else {
            continue;
        };
        let decoded = match ImageProcessor::from_bytes_as(&stream.content, ImageFormat::Jpeg) {
            Ok(image) => image,
            Err(err) => {
                debug!(?id, %err, "Skipping undecodable image");
                continue;
            }
        };
        let same_size = dimension(&stream.dict, b"Width") == Some(decoded.width())
            && dimension(&stream.dict, b"Height") == Some(decoded.height());
        if !same_size {
            continue;
        }
        match decoded.to_jpeg_bytes(quality) {
            Ok(recoded) if recoded.len() < stream.content.len() => {
                stream.set_content(recoded);
                replaced += 1;
            }
            Ok(_) => {}
            Err(err) => debug!(?id, %err, "Re-encoding failed; keeping original"),
        }
    }
    replaced
}

fn is_plain_rgb_jpeg(dict: &lopdf::Dictionary) -> bool {
    let name_is = |key: &[u8], expected: &[u8]| {
        dict.get(key).and_then(Object::as_name).ok() == Some(expected)
    };
    name_is(b"Subtype", b"Image")
        && name_is(b"Filter", b"DCTDecode")
        && name_is(b"ColorSpace", b"DeviceRGB")
        && dict.get(b"BitsPerComponent").and_then(Object::as_i64).ok() == Some(8)
        && !dict.has(b"Decode")
}

fn dimension(dict: &lopdf::Dictionary, key: &[u8]) -> Option<u32> {
    dict.get(key)
        .and_then(Object::as_i64)
        .ok()
        .and_then(|value| u32::try_from(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::SourceDocument;
    use crate::testing::pdf_document;
    use image::{DynamicImage, Rgb, RgbImage};
    use lopdf::{Stream, dictionary};

    fn save(mut doc: Document) -> Vec<u8> {
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    /// Two pages with long, uncompressed content streams.
    fn verbose_pdf() -> Document {
        let mut doc = pdf_document(&[(612.0, 792.0), (612.0, 792.0)]);
        let body: String = (0..400)
            .map(|i| format!("BT /F1 10 Tf 20 {} Td (line {i}) Tj ET\n", 20 + i % 700))
            .collect();
        // change_page_content would deflate the stream, so swap in a plain one.
        for page_id in doc.get_pages().into_values().collect::<Vec<_>>() {
            let content = doc.add_object(
                Stream::new(dictionary! {}, body.clone().into_bytes()).with_compression(false),
            );
            doc.get_dictionary_mut(page_id).unwrap().set("Contents", content);
        }
        doc
    }

    fn noisy_jpeg(quality: u8) -> (Vec<u8>, u32, u32) {
        let (w, h) = (160, 120);
        let image = RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) * 5 % 256) as u8])
        });
        let bytes = ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(image))
            .to_jpeg_bytes(quality)
            .unwrap();
        (bytes, w, h)
    }

    #[test]
    fn low_level_deflates_streams() {
        let doc = verbose_pdf();
        let page = doc.get_pages()[&1];
        let content = doc.get_page_contents(page)[0];
        assert!(doc.get_object(content).unwrap().as_stream().unwrap().filters().is_err());
        let original = save(doc);
        let outcome = compress_pdf(&original, CompressionLevel::Low).unwrap();
        assert_eq!(outcome.original_size, original.len());
        assert!(outcome.compressed_size < outcome.original_size);
        assert!(outcome.reduction_percent > 0.0);
        assert_eq!(SourceDocument::open(&outcome.bytes, "c.pdf").unwrap().page_count(), 2);
    }

    #[test]
    fn medium_level_drops_unreferenced_objects() {
        let mut doc = verbose_pdf();
        doc.add_object(Stream::new(dictionary! {}, vec![b'x'; 4096]));
        let original = save(doc);

        let low = compress_pdf(&original, CompressionLevel::Low).unwrap();
        let medium = compress_pdf(&original, CompressionLevel::Medium).unwrap();
        assert!(medium.compressed_size < low.compressed_size);
        assert_eq!(SourceDocument::open(&medium.bytes, "c.pdf").unwrap().page_count(), 2);
    }

    #[test]
    fn high_level_recodes_large_jpegs() {
        let mut doc = verbose_pdf();
        let (jpeg, w, h) = noisy_jpeg(100);
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(w),
                "Height" => i64::from(h),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            jpeg.clone(),
        ));
        // Keep it reachable so pruning leaves it alone.
        let catalog = doc.catalog_mut().unwrap();
        catalog.set("Thumb", image_id);
        let original = save(doc);

        let medium = compress_pdf(&original, CompressionLevel::Medium).unwrap();
        let high = compress_pdf(&original, CompressionLevel::High).unwrap();
        assert!(high.compressed_size < medium.compressed_size);
    }

    #[test]
    fn already_small_output_is_not_an_error() {
        let original = save(pdf_document(&[(100.0, 100.0)]));
        let outcome = compress_pdf(&original, CompressionLevel::High).unwrap();
        assert_eq!(outcome.original_size, original.len());
        assert!(outcome.compressed_size > 0);
    }

    #[test]
    fn non_pdf_is_a_validation_error() {
        assert!(matches!(
            compress_pdf(b"definitely not a pdf", CompressionLevel::Low),
            Err(WandlerError::Validation(_))
        ));
    }

    #[test]
    fn reduction_rounds_to_hundredths() {
        assert_eq!(reduction_percent(3, 2), 33.33);
        assert_eq!(reduction_percent(100, 150), -50.0);
        assert_eq!(reduction_percent(0, 10), 0.0);
    }
}
