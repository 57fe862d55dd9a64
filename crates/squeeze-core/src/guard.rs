//! Anti-inflation guard.
//!
//! A plain quality encode can come out larger than the file it was decoded
//! from (re-encoding an already well-compressed JPEG at quality 0.9, say).
//! Unless the caller asked for lossless output, the engine walks quality down
//! until the result is smaller than the source, and hands back the original
//! bytes when nothing beats them.

use tracing::debug;

use crate::config::SearchConfig;
use crate::encode::{attempt, Encoder};
use crate::format::{Codec, SourceFormat};
use crate::types::{EncodeAttempt, PixelBuffer, SourceImage};
use crate::CompressError;

/// Re-encode at decreasing quality while `first` is larger than `source_len`.
///
/// Steps by `guard_coarse_step` while quality is above `guard_fine_below`,
/// then by `guard_fine_step`, never below `guard_floor`. Stops at the first
/// result smaller than the source and returns the smallest attempt made.
pub fn guard_inflation<E: Encoder + ?Sized>(
    encoder: &E,
    image: &PixelBuffer,
    codec: Codec,
    first: EncodeAttempt,
    source_len: usize,
    config: &SearchConfig,
) -> Result<EncodeAttempt, CompressError> {
    if first.byte_len() <= source_len || !encoder.supports_quality(codec) {
        return Ok(first);
    }
    let Some(mut quality) = first.quality else {
        return Ok(first);
    };

    debug!(
        %codec,
        bytes = first.byte_len(),
        source_len,
        "output larger than source, lowering quality"
    );

    let mut best = first;
    while quality > config.guard_floor {
        let step = if quality > config.guard_fine_below {
            config.guard_coarse_step
        } else {
            config.guard_fine_step
        };
        quality = (quality - step).max(config.guard_floor);
        let candidate = attempt(encoder, image, codec, Some(quality))?;
        best = EncodeAttempt::smaller(Some(best), candidate);
        if best.byte_len() < source_len {
            break;
        }
    }
    Ok(best)
}

/// Whether the untouched original should be returned instead of `result`.
///
/// Only possible when the caller supplied the original bytes, the output codec
/// is the source's own codec, the resolution is unchanged, and `result` is not
/// smaller.
pub fn prefer_original(source: &SourceImage, codec: Codec, result: &EncodeAttempt) -> bool {
    source.original.is_some()
        && same_codec(source.format, codec)
        && (result.width, result.height) == source.pixels.dimensions()
        && result.byte_len() >= source.byte_len
}

fn same_codec(format: SourceFormat, codec: Codec) -> bool {
    matches!(
        (format, codec),
        (SourceFormat::Jpeg, Codec::Jpeg)
            | (SourceFormat::Png, Codec::Png)
            | (SourceFormat::WebP, Codec::WebP)
            | (SourceFormat::Avif, Codec::Avif)
    )
}
