//! Deterministic encoder mock for exercising the search without real codecs.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use crate::encode::Encoder;
use crate::format::Codec;
use crate::types::PixelBuffer;
use crate::CompressError;

/// Bytes produced per pixel at a given quality.
pub(crate) type BytesPerPixel = fn(f32) -> f64;

/// Header bytes every mock encoding carries.
pub(crate) const HEADER: usize = 100;

/// Encoder whose output length is a pure function of pixel count and quality.
///
/// Quality-less codecs (PNG) are sized by the number of distinct colours, so
/// channel quantization shrinks them the way it shrinks a real palette encoder.
pub(crate) struct SizeModelEncoder {
    bytes_per_pixel: BytesPerPixel,
    fail_on: Option<Codec>,
    calls: Cell<usize>,
    sizes: RefCell<Vec<usize>>,
    dimensions: RefCell<Vec<(u32, u32)>>,
}

impl SizeModelEncoder {
    pub(crate) fn new(bytes_per_pixel: BytesPerPixel) -> Self {
        Self {
            bytes_per_pixel,
            fail_on: None,
            calls: Cell::new(0),
            sizes: RefCell::new(Vec::new()),
            dimensions: RefCell::new(Vec::new()),
        }
    }

    /// 0.1 bytes/pixel at quality 0 rising linearly to 2.1 at quality 1.
    pub(crate) fn linear() -> Self {
        Self::new(|q| 0.1 + 2.0 * f64::from(q))
    }

    pub(crate) fn failing_on(mut self, codec: Codec) -> Self {
        self.fail_on = Some(codec);
        self
    }

    /// Output length for a quality-bearing codec.
    pub(crate) fn size_for(&self, pixel_count: u64, quality: Option<f32>) -> usize {
        let q = quality.unwrap_or(1.0);
        HEADER + (pixel_count as f64 * (self.bytes_per_pixel)(q)).floor() as usize
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.get()
    }

    pub(crate) fn sizes(&self) -> Vec<usize> {
        self.sizes.borrow().clone()
    }

    pub(crate) fn dimensions(&self) -> Vec<(u32, u32)> {
        self.dimensions.borrow().clone()
    }
}

impl Encoder for SizeModelEncoder {
    fn encode(
        &self,
        pixels: &PixelBuffer,
        codec: Codec,
        quality: Option<f32>,
    ) -> Result<Vec<u8>, CompressError> {
        self.calls.set(self.calls.get() + 1);
        if self.fail_on == Some(codec) {
            return Err(CompressError::encode_failed(codec, "mock failure"));
        }

        let len = if codec.supports_quality() {
            self.size_for(pixels.pixel_count(), quality)
        } else {
            let colours: HashSet<&[u8]> = pixels.pixels.chunks_exact(4).collect();
            HEADER + colours.len() * 4 + (pixels.pixel_count() / 2) as usize
        };

        self.sizes.borrow_mut().push(len);
        self.dimensions.borrow_mut().push(pixels.dimensions());
        Ok(vec![0u8; len])
    }
}

/// A noisy gradient with many distinct colours.
pub(crate) fn gradient(width: u32, height: u32) -> PixelBuffer {
    let mut pixels = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.push(((x * 255) / width.max(1)) as u8);
            pixels.push(((y * 255) / height.max(1)) as u8);
            pixels.push(((x * 7 + y * 13) % 256) as u8);
            pixels.push(255);
        }
    }
    PixelBuffer::new(width, height, pixels)
}
