//! Resolution stepping for budgets quality alone cannot meet.

use tracing::{debug, warn};

use super::{SearchOutcome, Strategy};
use crate::config::SearchConfig;
use crate::encode::Encoder;
use crate::format::Codec;
use crate::resize::{clamp_dimension, rescale, scaled_dimensions};
use crate::types::{EncodeAttempt, PixelBuffer};
use crate::CompressError;

/// Shrink resolution along the configured schedule until the budget is met.
///
/// `native` is the outcome already obtained at full resolution; it is returned
/// untouched when it fits. Each schedule step rescales `image` and runs the
/// strategy; the first fitting step wins. When the schedule runs out, one
/// extra step is extrapolated from `sqrt(budget / best)` and encoded at the
/// strategy's floor. The smallest attempt is returned when nothing fits, so an
/// unreachable budget is never an error.
///
/// `progress` receives 0-100 across the schedule.
#[allow(clippy::too_many_arguments)]
pub fn step_resolution<E: Encoder + ?Sized>(
    encoder: &E,
    image: &PixelBuffer,
    codec: Codec,
    budget: usize,
    strategy: Strategy,
    native: SearchOutcome,
    config: &SearchConfig,
    progress: &mut dyn FnMut(u8),
) -> Result<SearchOutcome, CompressError> {
    if native.fits {
        progress(100);
        return Ok(native);
    }

    let mut encodes = native.encodes;
    let mut best = native.attempt;
    let mut previous = image.dimensions();
    let steps = config.scale_schedule.len();

    for (index, &scale) in config.scale_schedule.iter().enumerate() {
        let dims = scaled_dimensions(image.dimensions(), f64::from(scale));
        if dims != previous {
            previous = dims;
            let scaled = rescale(image, dims.0, dims.1, config.filter)?;
            let outcome = strategy.run(encoder, &scaled, codec, budget, config)?;
            encodes += outcome.encodes;
            debug!(
                scale,
                width = dims.0,
                height = dims.1,
                bytes = outcome.attempt.byte_len(),
                fits = outcome.fits,
                "resolution step"
            );
            if outcome.fits {
                progress(100);
                return Ok(SearchOutcome {
                    attempt: outcome.attempt,
                    fits: true,
                    encodes,
                });
            }
            best = EncodeAttempt::smaller(Some(best), outcome.attempt);
        }
        progress(((index + 1) * 100 / steps.max(1)) as u8);
    }

    if let Some(dims) = extrapolated_dimensions(&best, image, budget, config) {
        let scaled = rescale(image, dims.0, dims.1, config.filter)?;
        let last = strategy.floor(encoder, &scaled, codec, budget, config)?;
        encodes += last.encodes;
        debug!(
            width = dims.0,
            height = dims.1,
            bytes = last.attempt.byte_len(),
            fits = last.fits,
            "extrapolated step"
        );
        if last.fits {
            progress(100);
            return Ok(SearchOutcome {
                attempt: last.attempt,
                fits: true,
                encodes,
            });
        }
        best = EncodeAttempt::smaller(Some(best), last.attempt);
    }

    warn!(
        budget,
        bytes = best.byte_len(),
        width = best.width,
        height = best.height,
        encodes,
        "byte budget unreachable, returning smallest attempt"
    );
    progress(100);
    Ok(SearchOutcome {
        attempt: best,
        fits: false,
        encodes,
    })
}

/// Dimensions for the final extrapolated attempt, if they are smaller than `best`.
///
/// Byte count scales roughly with pixel area, so the linear factor is the
/// square root of the size ratio, with the configured safety margin.
fn extrapolated_dimensions(
    best: &EncodeAttempt,
    image: &PixelBuffer,
    budget: usize,
    config: &SearchConfig,
) -> Option<(u32, u32)> {
    if best.byte_len() == 0 {
        return None;
    }
    let factor =
        (budget as f64 / best.byte_len() as f64).sqrt() * f64::from(config.extrapolation_margin);
    let width = clamp_dimension((f64::from(best.width) * factor).round() as u32, image.width);
    let height = clamp_dimension((f64::from(best.height) * factor).round() as u32, image.height);
    (width < best.width || height < best.height).then_some((width, height))
}
