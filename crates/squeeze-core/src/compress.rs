//! The compression pipeline.
//!
//! resolve → validate → fit to max dimensions → either one encode (quantized
//! for palette codecs, guarded against inflation) or a budgeted search across
//! quality and resolution.

use tracing::{debug, info};

use crate::config::{Mode, OutputContract, SearchConfig};
use crate::decode::decode_source;
use crate::encode::{attempt, encode_quantized, Encoder};
use crate::format::{resolve_output, Codec};
use crate::guard::{guard_inflation, prefer_original};
use crate::progress::{Phase, Progress};
use crate::resize::{fit_within, rescale};
use crate::search::{step_resolution, Strategy};
use crate::types::{CompressionResult, EncodeAttempt, PixelBuffer, SourceImage};
use crate::CompressError;

/// Compress a decoded source according to `contract`.
///
/// An unreachable byte budget is not an error: the smallest attempt is
/// returned and [`CompressionResult::fits`] reports the miss.
pub fn compress<E, P>(
    source: &SourceImage,
    contract: &OutputContract,
    encoder: &E,
    config: &SearchConfig,
    progress: &mut P,
) -> Result<CompressionResult, CompressError>
where
    E: Encoder + ?Sized,
    P: Progress + ?Sized,
{
    let codec = resolve_output(source.format, contract.output_format)?;
    config.validate()?;
    source.pixels.validate()?;
    progress.report(Phase::Compress, 0);

    let fitted = fit_within(
        &source.pixels,
        contract.max_width,
        contract.max_height,
        config.filter,
    )?;
    let image = fitted.as_ref().unwrap_or(&source.pixels);

    let quality = contract.normalized_quality(config);
    let strategy = Strategy::select(encoder, codec, contract.mode, quality);
    debug!(
        %codec,
        ?strategy,
        width = image.width,
        height = image.height,
        budget = ?contract.budget(),
        "compressing"
    );

    let encoded = match contract.budget() {
        None => encode_once(encoder, source, image, codec, strategy, config)?,
        Some(budget) => {
            let best = encode_to_budget(encoder, image, codec, budget, strategy, config, progress)?;
            match strategy {
                Strategy::Search { .. } => {
                    guard_at_resolution(encoder, image, codec, best, source.byte_len, config)?
                }
                _ => best,
            }
        }
    };

    let result = if contract.mode == Mode::Lossy && prefer_original(source, codec, &encoded) {
        debug!(bytes = encoded.byte_len(), "re-encode not smaller, keeping original");
        original_result(source, codec)
    } else {
        CompressionResult::from_attempt(encoded, codec)
    };

    progress.report(Phase::Compress, 100);
    progress.report(Phase::Output, 100);
    info!(
        %codec,
        source_bytes = source.byte_len,
        bytes = result.byte_len(),
        width = result.width,
        height = result.height,
        quality = ?result.quality,
        original = result.is_original,
        "compressed"
    );
    Ok(result)
}

/// Decode `bytes` and compress them, reporting the decode phase too.
pub fn compress_file<E, P>(
    bytes: &[u8],
    file_name: &str,
    mime: &str,
    contract: &OutputContract,
    encoder: &E,
    config: &SearchConfig,
    progress: &mut P,
) -> Result<CompressionResult, CompressError>
where
    E: Encoder + ?Sized,
    P: Progress + ?Sized,
{
    progress.report(Phase::Decode, 0);
    let source = decode_source(bytes, file_name, mime)?;
    progress.report(Phase::Decode, 100);
    compress(&source, contract, encoder, config, progress)
}

fn encode_once<E: Encoder + ?Sized>(
    encoder: &E,
    source: &SourceImage,
    image: &PixelBuffer,
    codec: Codec,
    strategy: Strategy,
    config: &SearchConfig,
) -> Result<EncodeAttempt, CompressError> {
    // Search is only selected in lossy mode, so it is always guarded.
    match strategy {
        Strategy::Search { start } => {
            let first = attempt(encoder, image, codec, Some(start))?;
            guard_inflation(encoder, image, codec, first, source.byte_len, config)
        }
        Strategy::Quantize { quality } => {
            encode_quantized(encoder, image, codec, quality, config.quantize_max_step)
        }
        Strategy::Lossless => attempt(encoder, image, codec, None),
    }
}

fn encode_to_budget<E, P>(
    encoder: &E,
    image: &PixelBuffer,
    codec: Codec,
    budget: usize,
    strategy: Strategy,
    config: &SearchConfig,
    progress: &mut P,
) -> Result<EncodeAttempt, CompressError>
where
    E: Encoder + ?Sized,
    P: Progress + ?Sized,
{
    let native = strategy.run(encoder, image, codec, budget, config)?;
    progress.report(Phase::Compress, 10);

    // schedule progress maps onto 10-95 of the compress phase
    let outcome = step_resolution(
        encoder,
        image,
        codec,
        budget,
        strategy,
        native,
        config,
        &mut |percent| {
            let scaled = 10 + u16::from(percent.min(100)) * 85 / 100;
            progress.report(Phase::Compress, scaled as u8);
        },
    )?;
    debug!(encodes = outcome.encodes, fits = outcome.fits, "budget search finished");
    Ok(outcome.attempt)
}

/// Run the inflation guard on a budgeted result at the resolution it was
/// encoded at.
fn guard_at_resolution<E: Encoder + ?Sized>(
    encoder: &E,
    image: &PixelBuffer,
    codec: Codec,
    best: EncodeAttempt,
    source_len: usize,
    config: &SearchConfig,
) -> Result<EncodeAttempt, CompressError> {
    if best.byte_len() <= source_len {
        return Ok(best);
    }
    let scaled;
    let at = if (best.width, best.height) == image.dimensions() {
        image
    } else {
        scaled = rescale(image, best.width, best.height, config.filter)?;
        &scaled
    };
    guard_inflation(encoder, at, codec, best, source_len, config)
}

fn original_result(source: &SourceImage, codec: Codec) -> CompressionResult {
    CompressionResult {
        bytes: source.original.clone().unwrap_or_default(),
        codec,
        width: source.width(),
        height: source.height(),
        quality: None,
        is_original: true,
    }
}
