//! High-quality rescaling for the size search.
//!
//! Large reductions are done in stages: each stage shrinks a dimension by at
//! most 2×, and the last stage lands exactly on the requested size. A single
//! resample over a large ratio aliases (moiré on fine textures), the staged
//! version does not. At most one intermediate stage is kept between steps.

use serde::{Deserialize, Serialize};

use crate::types::PixelBuffer;
use crate::CompressError;

/// [`rescale`] never produces a dimension smaller than this (unless the source
/// itself is smaller). Explicit bounds passed to [`fit_within`] are exempt.
pub const MIN_DIMENSION: u32 = 8;

/// Filter type for image resizing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterType {
    /// Nearest neighbor interpolation (fastest, lowest quality).
    Nearest,
    /// Bilinear interpolation (fast, acceptable quality).
    Bilinear,
    /// Catmull-Rom cubic interpolation (sharp, good default for halving stages).
    #[default]
    CatmullRom,
    /// Lanczos3 interpolation (slower, highest quality).
    Lanczos3,
}

impl FilterType {
    /// Convert to the image crate's FilterType.
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Bilinear => image::imageops::FilterType::Triangle,
            FilterType::CatmullRom => image::imageops::FilterType::CatmullRom,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// Clamp a requested dimension to the minimum, without exceeding a source
/// that is already smaller than the minimum.
pub fn clamp_dimension(requested: u32, source: u32) -> u32 {
    requested.max(MIN_DIMENSION.min(source)).max(1)
}

/// Rescale to exact dimensions, halving in stages for reductions above 2×.
///
/// Target dimensions are clamped to [`MIN_DIMENSION`].
///
/// # Errors
///
/// Returns `InvalidPixelData`/`InvalidDimensions` if the source buffer is inconsistent.
pub fn rescale(
    image: &PixelBuffer,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<PixelBuffer, CompressError> {
    image.validate()?;
    let target = (
        clamp_dimension(width, image.width),
        clamp_dimension(height, image.height),
    );
    resample_staged(image, target, filter)
}

/// Shrink to fit a bounding box, preserving aspect ratio. Never upscales.
///
/// Either bound may be absent. Returns `None` when the image already fits.
/// The caller's bounds are honoured exactly: [`MIN_DIMENSION`] does not apply
/// here, only a floor of 1 pixel.
pub fn fit_within(
    image: &PixelBuffer,
    max_width: Option<u32>,
    max_height: Option<u32>,
    filter: FilterType,
) -> Result<Option<PixelBuffer>, CompressError> {
    image.validate()?;
    match fit_dimensions(image.dimensions(), max_width, max_height) {
        Some(target) => resample_staged(image, target, filter).map(Some),
        None => Ok(None),
    }
}

/// Scale dimensions by a factor, clamped to [`MIN_DIMENSION`].
pub fn scaled_dimensions((width, height): (u32, u32), scale: f64) -> (u32, u32) {
    let w = (f64::from(width) * scale).round() as u32;
    let h = (f64::from(height) * scale).round() as u32;
    (clamp_dimension(w, width), clamp_dimension(h, height))
}

/// Resample a validated image to `target`, halving in stages.
fn resample_staged(
    image: &PixelBuffer,
    target: (u32, u32),
    filter: FilterType,
) -> Result<PixelBuffer, CompressError> {
    // Fast path: if dimensions match, just clone
    if image.dimensions() == target {
        return Ok(image.clone());
    }

    let mut current: Option<PixelBuffer> = None;
    loop {
        let source = current.as_ref().unwrap_or(image);
        let next = next_stage(source.dimensions(), target);
        let resized = resample(source, next, filter)?;
        if next == target {
            return Ok(resized);
        }
        // replacing drops the previous stage
        current = Some(resized);
    }
}

/// Calculate dimensions to fit within the bounds while preserving aspect ratio.
fn fit_dimensions(
    (width, height): (u32, u32),
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> Option<(u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }

    let ratio_w = max_width
        .filter(|&m| m > 0)
        .map_or(1.0, |m| f64::from(m) / f64::from(width));
    let ratio_h = max_height
        .filter(|&m| m > 0)
        .map_or(1.0, |m| f64::from(m) / f64::from(height));
    let ratio = ratio_w.min(ratio_h);

    if ratio >= 1.0 {
        return None;
    }

    let new_width = ((f64::from(width) * ratio).round() as u32).max(1);
    let new_height = ((f64::from(height) * ratio).round() as u32).max(1);
    Some((new_width, new_height))
}

/// Dimensions of the next stage: halve any dimension still more than 2× its target.
fn next_stage((width, height): (u32, u32), (target_w, target_h): (u32, u32)) -> (u32, u32) {
    let step = |current: u32, target: u32| {
        if current > target.saturating_mul(2) {
            current.div_ceil(2)
        } else {
            target
        }
    };
    (step(width, target_w), step(height, target_h))
}

fn resample(
    image: &PixelBuffer,
    (width, height): (u32, u32),
    filter: FilterType,
) -> Result<PixelBuffer, CompressError> {
    let view = image.as_view().ok_or(CompressError::InvalidPixelData {
        expected: (image.width as usize) * (image.height as usize) * 4,
        actual: image.pixels.len(),
    })?;
    let resized = image::imageops::resize(&view, width, height, filter.to_image_filter());
    Ok(PixelBuffer::from_rgba_image(resized))
}
