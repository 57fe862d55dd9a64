//! Channel-bucketing quantizer for codecs without a quality parameter.
//!
//! Each RGB channel is snapped to the nearest multiple of a step size derived
//! from the requested quality: lower quality means a larger step, fewer
//! distinct colours and a smaller palette-friendly encoding. Alpha is left
//! untouched so transparent edges keep their shape.

use super::{attempt, Encoder};
use crate::format::Codec;
use crate::types::{EncodeAttempt, PixelBuffer};
use crate::CompressError;

/// Bucket size for a 0-1 quality. Quality 1.0 maps to 1 (no quantization).
pub fn bucket_step(quality: f32, max_step: u8) -> u8 {
    let quality = if quality.is_finite() {
        quality.clamp(0.0, 1.0)
    } else {
        1.0
    };
    ((1.0 - quality) * f32::from(max_step)).round().max(1.0) as u8
}

/// Snap every colour channel to the nearest multiple of `step`.
pub fn quantize_channels(image: &PixelBuffer, step: u8) -> PixelBuffer {
    if step <= 1 {
        return image.clone();
    }
    let lut = bucket_lut(step);
    let pixels = image
        .pixels
        .chunks_exact(4)
        .flat_map(|px| {
            [
                lut[px[0] as usize],
                lut[px[1] as usize],
                lut[px[2] as usize],
                px[3],
            ]
        })
        .collect();
    PixelBuffer::new(image.width, image.height, pixels)
}

/// Encode with the quality-less codec, quantized to approximate `quality`.
///
/// The unquantized baseline is encoded first; the quantized version is only
/// returned when it is strictly smaller.
pub fn encode_quantized<E: Encoder + ?Sized>(
    encoder: &E,
    image: &PixelBuffer,
    codec: Codec,
    quality: f32,
    max_step: u8,
) -> Result<EncodeAttempt, CompressError> {
    let baseline = attempt(encoder, image, codec, None)?;

    let step = bucket_step(quality, max_step);
    if step <= 1 {
        return Ok(baseline);
    }

    let quantized = quantize_channels(image, step);
    let mut candidate = attempt(encoder, &quantized, codec, None)?;
    if candidate.byte_len() < baseline.byte_len() {
        candidate.quality = Some(quality);
        Ok(candidate)
    } else {
        Ok(baseline)
    }
}

fn bucket_lut(step: u8) -> [u8; 256] {
    let step = u16::from(step);
    let mut lut = [0u8; 256];
    for (value, slot) in lut.iter_mut().enumerate() {
        let value = value as u16;
        let snapped = (value + step / 2) / step * step;
        *slot = snapped.min(255) as u8;
    }
    lut
}
