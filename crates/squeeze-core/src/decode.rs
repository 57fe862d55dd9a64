//! Source decoding with EXIF orientation handling.
//!
//! Produces the [`SourceImage`] the engine consumes: RGBA pixels, the detected
//! source format, and the original bytes for the anti-inflation fallback.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::format::SourceFormat;
use crate::types::{PixelBuffer, SourceImage};
use crate::CompressError;

/// EXIF orientation values (1-8).
/// See: https://exiftool.org/TagNames/EXIF.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Orientation {
    #[default]
    Normal = 1,
    FlipHorizontal = 2,
    Rotate180 = 3,
    FlipVertical = 4,
    /// Flip horizontal + rotate 270 CW.
    Transpose = 5,
    Rotate90CW = 6,
    /// Flip horizontal + rotate 90 CW.
    Transverse = 7,
    Rotate270CW = 8,
}

impl From<u32> for Orientation {
    fn from(value: u32) -> Self {
        match value {
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Transpose,
            6 => Orientation::Rotate90CW,
            7 => Orientation::Transverse,
            8 => Orientation::Rotate270CW,
            _ => Orientation::Normal,
        }
    }
}

/// Decode an encoded file into a [`SourceImage`].
///
/// The format is detected from the bytes, falling back to `file_name` and
/// `mime`. JPEG orientation is applied so the pixels are upright.
///
/// # Errors
///
/// `UnsupportedSourceFormat` for containers the runtime cannot rasterize,
/// `DecodeFailure` for bytes that do not decode.
pub fn decode_source(bytes: &[u8], file_name: &str, mime: &str) -> Result<SourceImage, CompressError> {
    let format = SourceFormat::detect(bytes, file_name, mime);
    format.ensure_rasterizable()?;

    let image_format = image_format(format)?;
    let reader = image::ImageReader::with_format(Cursor::new(bytes), image_format);
    let img = reader
        .decode()
        .map_err(|e| CompressError::DecodeFailure(e.to_string()))?;

    let img = if format == SourceFormat::Jpeg {
        apply_orientation(img, extract_orientation(bytes))
    } else {
        img
    };

    let pixels = PixelBuffer::from_rgba_image(img.into_rgba8());
    debug!(
        ?format,
        width = pixels.width,
        height = pixels.height,
        bytes = bytes.len(),
        "decoded source"
    );
    Ok(SourceImage::new(pixels, bytes.len(), format).with_original(bytes.to_vec()))
}

fn image_format(format: SourceFormat) -> Result<ImageFormat, CompressError> {
    match format {
        SourceFormat::Jpeg => Ok(ImageFormat::Jpeg),
        SourceFormat::Png => Ok(ImageFormat::Png),
        SourceFormat::WebP => Ok(ImageFormat::WebP),
        SourceFormat::Gif => Ok(ImageFormat::Gif),
        SourceFormat::Bmp => Ok(ImageFormat::Bmp),
        SourceFormat::Tiff => Ok(ImageFormat::Tiff),
        // the image crate writes AVIF but cannot read it without a native dav1d
        SourceFormat::Avif => Err(CompressError::UnsupportedSourceFormat(
            "AVIF decoding is not available in this build".to_string(),
        )),
        other => Err(CompressError::UnsupportedSourceFormat(format!("{other:?}"))),
    }
}

/// Read the EXIF orientation of a JPEG, `Normal` when absent or unreadable.
pub fn extract_orientation(bytes: &[u8]) -> Orientation {
    let mut cursor = Cursor::new(bytes);
    Reader::new()
        .read_from_container(&mut cursor)
        .ok()
        .and_then(|exif| {
            exif.get_field(Tag::Orientation, In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
        })
        .map(Orientation::from)
        .unwrap_or_default()
}

fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => img,
        Orientation::FlipHorizontal => img.fliph(),
        Orientation::Rotate180 => img.rotate180(),
        Orientation::FlipVertical => img.flipv(),
        Orientation::Transpose => img.rotate90().fliph(),
        Orientation::Rotate90CW => img.rotate90(),
        Orientation::Transverse => img.rotate270().fliph(),
        Orientation::Rotate270CW => img.rotate270(),
    }
}
