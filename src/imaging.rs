//! Image normalization before recognition.

use crate::error::{OcrError, Result};
use crate::schema::ImageMeta;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

const JPEG_QUALITY: u8 = 85;

/// A decoded, flattened, size-bounded image re-encoded as JPEG.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub jpeg: Vec<u8>,
    pub meta: ImageMeta,
}

/// Decode `bytes`, flatten to a plain color format, downscale so neither side
/// exceeds `max_dimension`, and re-encode as JPEG.
pub fn normalize(bytes: &[u8], max_dimension: u32) -> Result<NormalizedImage> {
    let img = image::load_from_memory(bytes).map_err(|e| OcrError::decode("image", e))?;

    let (original_width, original_height) = img.dimensions();
    let original_color = format!("{:?}", img.color());

    let img = flatten(img);
    let downscaled = original_width > max_dimension || original_height > max_dimension;
    // resize() keeps the aspect ratio and fits within the bounds
    let img = if downscaled {
        img.resize(max_dimension, max_dimension, FilterType::Lanczos3)
    } else {
        img
    };
    let (width, height) = img.dimensions();

    let jpeg = encode_jpeg(&img).map_err(|e| OcrError::decode("image", e))?;

    Ok(NormalizedImage {
        jpeg,
        meta: ImageMeta {
            original_width,
            original_height,
            original_color,
            width,
            height,
            downscaled,
        },
    })
}

/// Convert anything JPEG cannot hold (alpha, palette, 16-bit, float) to RGB8.
pub fn flatten(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => img,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

pub fn encode_jpeg(img: &DynamicImage) -> image::ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    img.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_transparent_image_is_flattened_and_downscaled() {
        let rgba = RgbaImage::from_pixel(400, 100, Rgba([10, 20, 30, 128]));
        let bytes = png_bytes(DynamicImage::ImageRgba8(rgba));

        let normalized = normalize(&bytes, 100).unwrap();
        assert_eq!(normalized.meta.original_width, 400);
        assert_eq!(normalized.meta.original_height, 100);
        assert_eq!(normalized.meta.original_color, "Rgba8");
        assert!(normalized.meta.downscaled);
        assert_eq!((normalized.meta.width, normalized.meta.height), (100, 25));

        let decoded = image::load_from_memory(&normalized.jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (100, 25));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn test_small_image_keeps_size() {
        let rgba = RgbaImage::from_pixel(64, 32, Rgba([255, 255, 255, 255]));
        let bytes = png_bytes(DynamicImage::ImageRgba8(rgba));

        let normalized = normalize(&bytes, 2048).unwrap();
        assert!(!normalized.meta.downscaled);
        assert_eq!((normalized.meta.width, normalized.meta.height), (64, 32));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = normalize(b"definitely not an image", 2048).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
