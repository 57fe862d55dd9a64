//! Production encoder on top of the `image` crate.
//!
//! JPEG and PNG always work. WebP is written losslessly by `image`; lossy
//! WebP needs the `lossy-webp` feature (libwebp). AVIF needs the `avif`
//! feature (rav1e). A disabled codec fails with `EncodeFailure`.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder};

use super::Encoder;
use crate::format::Codec;
use crate::types::PixelBuffer;
use crate::CompressError;

/// Encoder backed by the `image` crate (and optionally libwebp).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterEncoder {
    /// Colour transparent pixels are composited onto for JPEG.
    pub background: [u8; 3],
    /// rav1e speed preset for AVIF (1 = slowest/best, 10 = fastest).
    pub avif_speed: u8,
}

impl Default for RasterEncoder {
    fn default() -> Self {
        Self {
            background: [255, 255, 255],
            avif_speed: 8,
        }
    }
}

impl RasterEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_background(mut self, background: [u8; 3]) -> Self {
        self.background = background;
        self
    }

    pub fn with_avif_speed(mut self, speed: u8) -> Self {
        self.avif_speed = speed.clamp(1, 10);
        self
    }

    fn encode_jpeg(&self, pixels: &PixelBuffer, quality: Option<f32>) -> Result<Vec<u8>, CompressError> {
        let rgb = flatten_alpha(&pixels.pixels, self.background);
        let mut buffer = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality_percent(quality));
        encoder
            .write_image(&rgb, pixels.width, pixels.height, ExtendedColorType::Rgb8)
            .map_err(|e| CompressError::encode_failed(Codec::Jpeg, e))?;
        Ok(buffer.into_inner())
    }

    fn encode_png(&self, pixels: &PixelBuffer) -> Result<Vec<u8>, CompressError> {
        let mut buffer = Cursor::new(Vec::new());
        let encoder = PngEncoder::new_with_quality(
            &mut buffer,
            CompressionType::Best,
            PngFilterType::Adaptive,
        );
        // drop the alpha channel when it carries nothing
        let result = if pixels.has_transparency() {
            encoder.write_image(
                &pixels.pixels,
                pixels.width,
                pixels.height,
                ExtendedColorType::Rgba8,
            )
        } else {
            let rgb = strip_alpha(&pixels.pixels);
            encoder.write_image(&rgb, pixels.width, pixels.height, ExtendedColorType::Rgb8)
        };
        result.map_err(|e| CompressError::encode_failed(Codec::Png, e))?;
        Ok(buffer.into_inner())
    }

    fn encode_webp(&self, pixels: &PixelBuffer, quality: Option<f32>) -> Result<Vec<u8>, CompressError> {
        #[cfg(feature = "lossy-webp")]
        if let Some(quality) = quality {
            let encoder = webp::Encoder::from_rgba(&pixels.pixels, pixels.width, pixels.height);
            let encoded = encoder.encode(f32::from(quality_percent(Some(quality))));
            return Ok(encoded.to_vec());
        }
        #[cfg(not(feature = "lossy-webp"))]
        let _ = quality;

        let mut buffer = Cursor::new(Vec::new());
        WebPEncoder::new_lossless(&mut buffer)
            .write_image(
                &pixels.pixels,
                pixels.width,
                pixels.height,
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| CompressError::encode_failed(Codec::WebP, e))?;
        Ok(buffer.into_inner())
    }

    #[cfg(feature = "avif")]
    fn encode_avif(&self, pixels: &PixelBuffer, quality: Option<f32>) -> Result<Vec<u8>, CompressError> {
        use image::codecs::avif::AvifEncoder;

        let mut buffer = Cursor::new(Vec::new());
        let encoder =
            AvifEncoder::new_with_speed_quality(&mut buffer, self.avif_speed, quality_percent(quality));
        encoder
            .write_image(
                &pixels.pixels,
                pixels.width,
                pixels.height,
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| CompressError::encode_failed(Codec::Avif, e))?;
        Ok(buffer.into_inner())
    }

    #[cfg(not(feature = "avif"))]
    fn encode_avif(&self, _pixels: &PixelBuffer, _quality: Option<f32>) -> Result<Vec<u8>, CompressError> {
        Err(CompressError::encode_failed(
            Codec::Avif,
            "AVIF encoding is not enabled in this build",
        ))
    }
}

impl Encoder for RasterEncoder {
    fn encode(
        &self,
        pixels: &PixelBuffer,
        codec: Codec,
        quality: Option<f32>,
    ) -> Result<Vec<u8>, CompressError> {
        pixels.validate()?;
        match codec {
            Codec::Jpeg => self.encode_jpeg(pixels, quality),
            Codec::Png => self.encode_png(pixels),
            Codec::WebP => self.encode_webp(pixels, quality),
            Codec::Avif => self.encode_avif(pixels, quality),
        }
    }

    fn supports_quality(&self, codec: Codec) -> bool {
        match codec {
            Codec::Jpeg => true,
            Codec::Png => false,
            Codec::WebP => cfg!(feature = "lossy-webp"),
            Codec::Avif => cfg!(feature = "avif"),
        }
    }
}

/// Map 0-1 quality to the 1-100 scale codecs expect; `None` is maximum.
fn quality_percent(quality: Option<f32>) -> u8 {
    match quality {
        Some(q) if q.is_finite() => (q * 100.0).round().clamp(1.0, 100.0) as u8,
        _ => 100,
    }
}

/// Composite RGBA over an opaque background, producing RGB.
fn flatten_alpha(rgba: &[u8], background: [u8; 3]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        let alpha = u32::from(px[3]);
        for channel in 0..3 {
            let fg = u32::from(px[channel]);
            let bg = u32::from(background[channel]);
            rgb.push(((fg * alpha + bg * (255 - alpha) + 127) / 255) as u8);
        }
    }
    rgb
}

fn strip_alpha(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect()
}


// ============================================================================
// Property-Based Tests
// ============================================================================
