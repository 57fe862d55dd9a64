//! Core data types: pixel buffers, source images, attempts and results.

use crate::format::{Codec, SourceFormat};
use crate::CompressError;

/// An RGBA8 pixel buffer in row-major order (4 bytes per pixel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// RGBA pixel data. Length should be width * height * 4.
    pub pixels: Vec<u8>,
}

impl PixelBuffer {
    /// Create a new PixelBuffer with the given dimensions and pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            (width as usize) * (height as usize) * 4,
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Create a PixelBuffer, validating dimensions and buffer length.
    pub fn try_new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, CompressError> {
        if width == 0 || height == 0 {
            return Err(CompressError::InvalidDimensions { width, height });
        }
        let expected = (width as usize) * (height as usize) * 4;
        if pixels.len() != expected {
            return Err(CompressError::InvalidPixelData {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Create a PixelBuffer from an image::RgbaImage.
    pub fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.into_raw(),
        }
    }

    /// Convert to an image::RgbaImage (copies the pixel data).
    pub fn to_rgba_image(&self) -> Option<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    /// Borrow the pixels as an image::ImageBuffer without copying.
    pub fn as_view(&self) -> Option<image::ImageBuffer<image::Rgba<u8>, &[u8]>> {
        image::ImageBuffer::from_raw(self.width, self.height, self.pixels.as_slice())
    }

    /// Get the total number of pixels.
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Check the buffer is consistent with its dimensions.
    pub fn validate(&self) -> Result<(), CompressError> {
        if self.width == 0 || self.height == 0 {
            return Err(CompressError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let expected = (self.width as usize) * (self.height as usize) * 4;
        if self.pixels.len() != expected {
            return Err(CompressError::InvalidPixelData {
                expected,
                actual: self.pixels.len(),
            });
        }
        Ok(())
    }

    /// Whether any pixel is not fully opaque.
    pub fn has_transparency(&self) -> bool {
        self.pixels.chunks_exact(4).any(|px| px[3] != 255)
    }
}

/// A decoded input image, borrowed by the engine for one request.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub pixels: PixelBuffer,
    /// Size of the encoded file the pixels came from.
    pub byte_len: usize,
    pub format: SourceFormat,
    /// The encoded file itself, when the caller still has it.
    pub original: Option<Vec<u8>>,
}

impl SourceImage {
    pub fn new(pixels: PixelBuffer, byte_len: usize, format: SourceFormat) -> Self {
        Self {
            pixels,
            byte_len,
            format,
            original: None,
        }
    }

    /// Attach the original encoded bytes; `byte_len` follows their length.
    pub fn with_original(mut self, bytes: Vec<u8>) -> Self {
        self.byte_len = bytes.len();
        self.original = Some(bytes);
        self
    }

    pub fn width(&self) -> u32 {
        self.pixels.width
    }

    pub fn height(&self) -> u32 {
        self.pixels.height
    }
}

/// One (resolution, quality) trial.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeAttempt {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// `None` for codecs without a quality knob or lossless encodes.
    pub quality: Option<f32>,
}

impl EncodeAttempt {
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn fits(&self, budget: usize) -> bool {
        self.bytes.len() <= budget
    }

    /// Keep whichever of `current` and `candidate` is smaller (ties keep `current`).
    pub fn smaller(current: Option<Self>, candidate: Self) -> Self {
        match current {
            Some(current) if current.byte_len() <= candidate.byte_len() => current,
            _ => candidate,
        }
    }
}

/// The engine's final answer for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressionResult {
    pub bytes: Vec<u8>,
    pub codec: Codec,
    pub width: u32,
    pub height: u32,
    pub quality: Option<f32>,
    /// True when the untouched source bytes were handed back.
    pub is_original: bool,
}

impl CompressionResult {
    pub(crate) fn from_attempt(attempt: EncodeAttempt, codec: Codec) -> Self {
        Self {
            bytes: attempt.bytes,
            codec,
            width: attempt.width,
            height: attempt.height,
            quality: attempt.quality,
            is_original: false,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn mime_type(&self) -> &'static str {
        self.codec.mime_type()
    }

    pub fn extension(&self) -> &'static str {
        self.codec.extension()
    }

    /// Whether the result met a byte budget.
    pub fn fits(&self, target_bytes: usize) -> bool {
        self.bytes.len() <= target_bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(len: usize) -> EncodeAttempt {
        EncodeAttempt {
            bytes: vec![0; len],
            width: 10,
            height: 10,
            quality: Some(0.5),
        }
    }

    #[test]
    fn test_pixel_buffer_creation() {
        let buf = PixelBuffer::new(100, 50, vec![0u8; 100 * 50 * 4]);
        assert_eq!(buf.dimensions(), (100, 50));
        assert_eq!(buf.pixel_count(), 5000);
        assert!(buf.validate().is_ok());
    }

    #[test]
    fn test_pixel_buffer_try_new_errors() {
        assert!(matches!(
            PixelBuffer::try_new(0, 10, vec![]),
            Err(CompressError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            PixelBuffer::try_new(10, 10, vec![0; 10]),
            Err(CompressError::InvalidPixelData {
                expected: 400,
                actual: 10
            })
        ));
    }

    #[test]
    fn test_pixel_buffer_transparency() {
        let opaque = PixelBuffer::new(1, 2, vec![1, 2, 3, 255, 4, 5, 6, 255]);
        assert!(!opaque.has_transparency());
        let clear = PixelBuffer::new(1, 2, vec![1, 2, 3, 255, 4, 5, 6, 0]);
        assert!(clear.has_transparency());
    }

    #[test]
    fn test_rgba_image_roundtrip_dimensions() {
        let buf = PixelBuffer::new(3, 2, vec![7u8; 3 * 2 * 4]);
        let img = buf.to_rgba_image().unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(PixelBuffer::from_rgba_image(img), buf);
    }

    #[test]
    fn test_source_with_original_tracks_len() {
        let source = SourceImage::new(PixelBuffer::new(1, 1, vec![0; 4]), 0, SourceFormat::Png)
            .with_original(vec![1, 2, 3]);
        assert_eq!(source.byte_len, 3);
        assert_eq!(source.width(), 1);
    }

    #[test]
    fn test_attempt_smaller_keeps_current_on_tie() {
        let kept = EncodeAttempt::smaller(Some(attempt(10)), attempt(10));
        assert_eq!(kept.byte_len(), 10);
        let kept = EncodeAttempt::smaller(Some(attempt(10)), attempt(5));
        assert_eq!(kept.byte_len(), 5);
        let kept = EncodeAttempt::smaller(None, attempt(7));
        assert_eq!(kept.byte_len(), 7);
        assert!(kept.fits(7));
        assert!(!kept.fits(6));
    }
}
