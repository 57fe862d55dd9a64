//! Encoder adapter.
//!
//! The search never talks to a codec directly: it goes through the [`Encoder`]
//! trait, so the whole engine above this layer is deterministic and can be
//! driven by a mock in tests. [`RasterEncoder`] is the production
//! implementation on top of the `image` crate.
//!
//! # Examples
//!
//! ```ignore
//! use squeeze_core::{encode::{Encoder, RasterEncoder}, Codec, PixelBuffer};
//!
//! let pixels = PixelBuffer::new(100, 100, vec![128u8; 100 * 100 * 4]);
//! let jpeg = RasterEncoder::new().encode(&pixels, Codec::Jpeg, Some(0.8)).unwrap();
//! println!("Encoded {} bytes", jpeg.len());
//! ```

mod quantize;
mod raster;

use tracing::trace;

pub use quantize::{bucket_step, encode_quantized, quantize_channels};
pub use raster::RasterEncoder;

use crate::format::Codec;
use crate::types::{EncodeAttempt, PixelBuffer};
use crate::CompressError;

/// The opaque "encode at quality Q" primitive.
pub trait Encoder {
    /// Encode RGBA pixels.
    ///
    /// `quality` is on a 0-1 scale. `None` requests the codec's lossless mode,
    /// or its highest fidelity when it has no lossless mode. Codecs without a
    /// quality parameter ignore the value.
    fn encode(
        &self,
        pixels: &PixelBuffer,
        codec: Codec,
        quality: Option<f32>,
    ) -> Result<Vec<u8>, CompressError>;

    /// Whether `codec` honours a continuous quality parameter in this encoder.
    fn supports_quality(&self, codec: Codec) -> bool {
        codec.supports_quality()
    }
}

impl<E: Encoder + ?Sized> Encoder for &E {
    fn encode(
        &self,
        pixels: &PixelBuffer,
        codec: Codec,
        quality: Option<f32>,
    ) -> Result<Vec<u8>, CompressError> {
        (**self).encode(pixels, codec, quality)
    }

    fn supports_quality(&self, codec: Codec) -> bool {
        (**self).supports_quality(codec)
    }
}

/// Run one encode and wrap it as an [`EncodeAttempt`].
pub fn attempt<E: Encoder + ?Sized>(
    encoder: &E,
    pixels: &PixelBuffer,
    codec: Codec,
    quality: Option<f32>,
) -> Result<EncodeAttempt, CompressError> {
    let bytes = encoder.encode(pixels, codec, quality)?;
    trace!(
        %codec,
        width = pixels.width,
        height = pixels.height,
        quality = ?quality,
        bytes = bytes.len(),
        "encode attempt"
    );
    Ok(EncodeAttempt {
        bytes,
        width: pixels.width,
        height: pixels.height,
        quality,
    })
}
