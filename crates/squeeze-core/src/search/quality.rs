//! Quality binary search at a fixed resolution.

use tracing::debug;

use crate::config::SearchConfig;
use crate::encode::{attempt, Encoder};
use crate::format::Codec;
use crate::types::{EncodeAttempt, PixelBuffer};
use crate::CompressError;

/// Result of searching one resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    /// Highest-quality fitting attempt, or the smallest attempt when nothing fit.
    pub attempt: EncodeAttempt,
    pub fits: bool,
    /// Encoder invocations spent.
    pub encodes: usize,
}

/// Find the highest quality whose encoding stays within `budget`.
///
/// Starts at `start` (0-1). A fitting start searches upward, an over-budget
/// start searches downward to `min_quality`. When even `min_quality` is over
/// budget the smallest encoding seen is returned with `fits == false`; this
/// function never changes resolution.
///
/// Codecs without a quality parameter get a single encode.
pub fn search_quality<E: Encoder + ?Sized>(
    encoder: &E,
    image: &PixelBuffer,
    codec: Codec,
    budget: usize,
    start: f32,
    config: &SearchConfig,
) -> Result<SearchOutcome, CompressError> {
    if !encoder.supports_quality(codec) {
        let only = attempt(encoder, image, codec, None)?;
        return Ok(SearchOutcome {
            fits: only.fits(budget),
            attempt: only,
            encodes: 1,
        });
    }

    let start = start.clamp(config.min_quality, config.max_quality);
    let first = attempt(encoder, image, codec, Some(start))?;
    let outcome = if first.fits(budget) {
        search_upward(encoder, image, codec, budget, first, config)?
    } else {
        search_downward(encoder, image, codec, budget, first, config)?
    };

    debug!(
        %codec,
        width = image.width,
        height = image.height,
        budget,
        bytes = outcome.attempt.byte_len(),
        quality = ?outcome.attempt.quality,
        fits = outcome.fits,
        encodes = outcome.encodes,
        "quality search finished"
    );
    Ok(outcome)
}

/// Smallest fitting size that ends the search early.
fn acceptance_threshold(budget: usize, config: &SearchConfig) -> usize {
    (budget as f64 * f64::from(config.accept_ratio)).ceil() as usize
}

fn search_upward<E: Encoder + ?Sized>(
    encoder: &E,
    image: &PixelBuffer,
    codec: Codec,
    budget: usize,
    first: EncodeAttempt,
    config: &SearchConfig,
) -> Result<SearchOutcome, CompressError> {
    let accept = acceptance_threshold(budget, config);
    let mut encodes = 1;
    let mut lo = first.quality.unwrap_or(config.max_quality);
    let mut hi = config.max_quality;
    let mut best = first;

    for _ in 0..config.upward_iterations {
        if best.byte_len() >= accept || hi - lo < config.min_bracket {
            break;
        }
        let mid = (lo + hi) / 2.0;
        let candidate = attempt(encoder, image, codec, Some(mid))?;
        encodes += 1;
        if candidate.fits(budget) {
            lo = mid;
            best = candidate;
        } else {
            hi = mid;
        }
    }

    Ok(SearchOutcome {
        attempt: best,
        fits: true,
        encodes,
    })
}

fn search_downward<E: Encoder + ?Sized>(
    encoder: &E,
    image: &PixelBuffer,
    codec: Codec,
    budget: usize,
    first: EncodeAttempt,
    config: &SearchConfig,
) -> Result<SearchOutcome, CompressError> {
    let accept = acceptance_threshold(budget, config);
    let mut encodes = 1;
    let mut lo = config.min_quality;
    let mut hi = first.quality.unwrap_or(config.max_quality);
    let mut floor_tried = hi <= lo;
    let mut smallest = first;
    let mut best_fit: Option<EncodeAttempt> = None;

    for _ in 0..config.downward_iterations {
        if hi - lo < config.min_bracket {
            break;
        }
        let mid = (lo + hi) / 2.0;
        let candidate = attempt(encoder, image, codec, Some(mid))?;
        encodes += 1;
        if candidate.fits(budget) {
            lo = mid;
            let done = candidate.byte_len() >= accept;
            if best_fit
                .as_ref()
                .map_or(true, |best| candidate.byte_len() > best.byte_len())
            {
                best_fit = Some(candidate);
            }
            if done {
                break;
            }
        } else {
            hi = mid;
            smallest = EncodeAttempt::smaller(Some(smallest), candidate);
        }
    }

    if let Some(best) = best_fit {
        return Ok(SearchOutcome {
            attempt: best,
            fits: true,
            encodes,
        });
    }

    // nothing fit inside the bracket: the floor itself is the last resort
    if !floor_tried {
        let floor = attempt(encoder, image, codec, Some(config.min_quality))?;
        encodes += 1;
        floor_tried = true;
        if floor.fits(budget) {
            return Ok(SearchOutcome {
                attempt: floor,
                fits: true,
                encodes,
            });
        }
        smallest = EncodeAttempt::smaller(Some(smallest), floor);
    }
    debug_assert!(floor_tried);

    Ok(SearchOutcome {
        attempt: smallest,
        fits: false,
        encodes,
    })
}

/// Encode once at the minimum quality (or once, for quality-less codecs).
pub fn encode_floor<E: Encoder + ?Sized>(
    encoder: &E,
    image: &PixelBuffer,
    codec: Codec,
    config: &SearchConfig,
) -> Result<EncodeAttempt, CompressError> {
    let quality = encoder
        .supports_quality(codec)
        .then_some(config.min_quality);
    attempt(encoder, image, codec, quality)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{gradient, SizeModelEncoder};
    use crate::RasterEncoder;

    fn flat(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::new(width, height, vec![50u8; (width * height * 4) as usize])
    }

    #[test]
    fn test_fitting_start_searches_upward() {
        // 100x100 with the linear model: size(q) = 100 + 10000 * (0.1 + 2q)
        let encoder = SizeModelEncoder::linear();
        let image = flat(100, 100);
        let config = SearchConfig::default();
        let budget = 20_000;

        let outcome = search_quality(&encoder, &image, Codec::Jpeg, budget, 0.5, &config).unwrap();

        assert!(outcome.fits);
        assert!(outcome.attempt.byte_len() <= budget);
        assert!(outcome.attempt.quality.unwrap() > 0.5);
        assert!(outcome.encodes <= 1 + config.upward_iterations as usize);
        assert_eq!(outcome.encodes, encoder.calls());
    }

    #[test]
    fn test_start_within_accept_ratio_stops_immediately() {
        let encoder = SizeModelEncoder::linear();
        let image = flat(100, 100);
        let config = SearchConfig::default();
        // size(0.8) = 17100
        let outcome = search_quality(&encoder, &image, Codec::Jpeg, 18_000, 0.8, &config).unwrap();
        assert!(outcome.fits);
        assert_eq!(outcome.encodes, 1);
        assert_eq!(outcome.attempt.quality, Some(0.8));
    }

    #[test]
    fn test_over_budget_start_searches_downward() {
        let encoder = SizeModelEncoder::linear();
        let image = flat(100, 100);
        let config = SearchConfig::default();
        let budget = 5_000;

        let outcome = search_quality(&encoder, &image, Codec::Jpeg, budget, 0.8, &config).unwrap();

        assert!(outcome.fits);
        assert!(outcome.attempt.byte_len() <= budget);
        assert!(outcome.attempt.byte_len() >= (budget as f64 * 0.9) as usize);
        assert!(outcome.encodes <= 2 + config.downward_iterations as usize);
    }

    #[test]
    fn test_unreachable_budget_returns_floor() {
        let encoder = SizeModelEncoder::linear();
        let image = flat(100, 100);
        let config = SearchConfig::default();

        let outcome = search_quality(&encoder, &image, Codec::Jpeg, 500, 0.8, &config).unwrap();

        assert!(!outcome.fits);
        assert_eq!(outcome.attempt.quality, Some(config.min_quality));
        let smallest = encoder.sizes().into_iter().min().unwrap();
        assert_eq!(outcome.attempt.byte_len(), smallest);
        assert!(outcome.encodes <= 2 + config.downward_iterations as usize);
    }

    #[test]
    fn test_start_at_floor_does_not_reencode() {
        let encoder = SizeModelEncoder::linear();
        let image = flat(10, 10);
        let config = SearchConfig::default();

        let outcome = search_quality(&encoder, &image, Codec::Jpeg, 1, 0.0, &config).unwrap();
        assert!(!outcome.fits);
        assert_eq!(encoder.calls(), 1);
    }

    #[test]
    fn test_quality_less_codec_single_encode() {
        let encoder = SizeModelEncoder::linear();
        let image = flat(10, 10);
        let config = SearchConfig::default();

        let outcome = search_quality(&encoder, &image, Codec::Png, 1, 0.8, &config).unwrap();
        assert_eq!(outcome.encodes, 1);
        assert_eq!(outcome.attempt.quality, None);
        assert!(!outcome.fits);
    }

    #[test]
    fn test_encode_failure_propagates() {
        let encoder = SizeModelEncoder::linear().failing_on(Codec::WebP);
        let image = flat(10, 10);
        let result = search_quality(&encoder, &image, Codec::WebP, 100, 0.8, &SearchConfig::default());
        assert!(matches!(result, Err(CompressError::EncodeFailure { .. })));
    }

    #[test]
    fn test_encode_floor() {
        let encoder = SizeModelEncoder::linear();
        let config = SearchConfig::default();
        let floor = encode_floor(&encoder, &flat(10, 10), Codec::Jpeg, &config).unwrap();
        assert_eq!(floor.quality, Some(config.min_quality));
        let floor = encode_floor(&encoder, &flat(10, 10), Codec::Png, &config).unwrap();
        assert_eq!(floor.quality, None);
    }

    #[test]
    fn test_real_jpeg_meets_budget() {
        let encoder = RasterEncoder::new();
        let image = gradient(128, 128);
        let config = SearchConfig::default();
        let full = encoder.encode(&image, Codec::Jpeg, Some(0.8)).unwrap();
        let budget = full.len() / 2;

        let outcome = search_quality(&encoder, &image, Codec::Jpeg, budget, 0.8, &config).unwrap();
        assert!(outcome.fits);
        assert!(outcome.attempt.byte_len() <= budget);
        assert!(outcome.attempt.quality.unwrap() < 0.8);
    }
}
