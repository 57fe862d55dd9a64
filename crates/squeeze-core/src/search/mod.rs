//! Size search: quality bisection at one resolution, then resolution stepping.
//!
//! A [`Strategy`] decides what "try this resolution" means for a request:
//! bisect the quality knob, quantize a palette codec, or encode losslessly.
//! The resolution stepper only ever talks to the strategy.

mod quality;
mod resolution;

pub use quality::{encode_floor, search_quality, SearchOutcome};
pub use resolution::step_resolution;

use crate::config::{Mode, SearchConfig};
use crate::encode::{attempt, bucket_step, encode_quantized, Encoder};
use crate::format::Codec;
use crate::types::{EncodeAttempt, PixelBuffer};
use crate::CompressError;

/// How a single resolution is encoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    /// Bisect the codec's quality parameter, starting at `start` (0-1).
    Search { start: f32 },
    /// Quality-less codec in lossy mode: channel quantization stands in for quality.
    Quantize { quality: f32 },
    /// One lossless encode per resolution.
    Lossless,
}

impl Strategy {
    /// Pick the strategy for a codec, mode and 0-1 quality.
    pub fn select<E: Encoder + ?Sized>(encoder: &E, codec: Codec, mode: Mode, quality: f32) -> Self {
        match mode {
            Mode::Lossless => Strategy::Lossless,
            Mode::Lossy if encoder.supports_quality(codec) => Strategy::Search { start: quality },
            Mode::Lossy => Strategy::Quantize { quality },
        }
    }

    /// Best encoding of `image` against `budget`.
    pub fn run<E: Encoder + ?Sized>(
        &self,
        encoder: &E,
        image: &PixelBuffer,
        codec: Codec,
        budget: usize,
        config: &SearchConfig,
    ) -> Result<SearchOutcome, CompressError> {
        match *self {
            Strategy::Search { start } => {
                search_quality(encoder, image, codec, budget, start, config)
            }
            Strategy::Quantize { quality } => {
                let result = encode_quantized(encoder, image, codec, quality, config.quantize_max_step)?;
                Ok(outcome(result, budget, quantize_encodes(quality, config)))
            }
            Strategy::Lossless => {
                let result = attempt(encoder, image, codec, None)?;
                Ok(outcome(result, budget, 1))
            }
        }
    }

    /// The most aggressive encoding this strategy allows at `image`'s resolution.
    pub fn floor<E: Encoder + ?Sized>(
        &self,
        encoder: &E,
        image: &PixelBuffer,
        codec: Codec,
        budget: usize,
        config: &SearchConfig,
    ) -> Result<SearchOutcome, CompressError> {
        match *self {
            Strategy::Search { .. } => {
                let result = encode_floor(encoder, image, codec, config)?;
                Ok(outcome(result, budget, 1))
            }
            Strategy::Quantize { .. } => Strategy::Quantize { quality: 0.0 }.run(
                encoder, image, codec, budget, config,
            ),
            Strategy::Lossless => self.run(encoder, image, codec, budget, config),
        }
    }
}

fn outcome(attempt: EncodeAttempt, budget: usize, encodes: usize) -> SearchOutcome {
    SearchOutcome {
        fits: attempt.fits(budget),
        attempt,
        encodes,
    }
}

fn quantize_encodes(quality: f32, config: &SearchConfig) -> usize {
    if bucket_step(quality, config.quantize_max_step) > 1 {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{gradient, SizeModelEncoder};

    #[test]
    fn test_select_strategy() {
        let encoder = SizeModelEncoder::linear();
        assert_eq!(
            Strategy::select(&encoder, Codec::Jpeg, Mode::Lossy, 0.7),
            Strategy::Search { start: 0.7 }
        );
        assert_eq!(
            Strategy::select(&encoder, Codec::Png, Mode::Lossy, 0.7),
            Strategy::Quantize { quality: 0.7 }
        );
        assert_eq!(
            Strategy::select(&encoder, Codec::WebP, Mode::Lossless, 0.7),
            Strategy::Lossless
        );
    }

    #[test]
    fn test_quantize_counts_encodes() {
        let encoder = SizeModelEncoder::linear();
        let config = SearchConfig::default();
        let outcome = Strategy::Quantize { quality: 0.5 }
            .run(&encoder, &gradient(16, 16), Codec::Png, 10_000, &config)
            .unwrap();
        assert_eq!(outcome.encodes, encoder.calls());
        assert!(outcome.fits);
    }

    #[test]
    fn test_lossless_encodes_without_quality() {
        let encoder = SizeModelEncoder::linear();
        let config = SearchConfig::default();
        let outcome = Strategy::Lossless
            .run(&encoder, &gradient(10, 10), Codec::WebP, 1, &config)
            .unwrap();
        assert_eq!(outcome.attempt.quality, None);
        assert!(!outcome.fits);
        assert_eq!(outcome.encodes, 1);
    }

    #[test]
    fn test_floor_per_strategy() {
        let encoder = SizeModelEncoder::linear();
        let config = SearchConfig::default();
        let image = gradient(32, 32);

        let search = Strategy::Search { start: 0.8 }
            .floor(&encoder, &image, Codec::Jpeg, 1, &config)
            .unwrap();
        assert_eq!(search.attempt.quality, Some(config.min_quality));

        let quantize = Strategy::Quantize { quality: 0.9 }
            .floor(&encoder, &image, Codec::Png, 1, &config)
            .unwrap();
        let gentle = Strategy::Quantize { quality: 0.9 }
            .run(&encoder, &image, Codec::Png, 1, &config)
            .unwrap();
        assert!(quantize.attempt.byte_len() <= gentle.attempt.byte_len());
    }
}
