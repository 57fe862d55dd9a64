//! Decoding, format resolution and rescaling bindings.
//!
//! # Functions
//!
//! - [`decode_image`] - Decode an image file, rejecting unsupported containers
//! - [`detect_format`] - Sniff the source format of a file
//! - [`resolve_format`] - Pick the output codec for a file name / MIME type
//! - [`rescale`] - Resize a pixel buffer to exact dimensions
//! - [`fit_within`] - Resize a pixel buffer to fit a bounding box
//!
//! # Example
//!
//! ```typescript
//! import { decode_image, resolve_format } from '@squeeze/wasm';
//!
//! const resolved = resolve_format(file.name, file.type, 'auto');
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const source = decode_image(bytes, file.name, file.type);
//! console.log(`${source.format} ${source.width}x${source.height}, codec ${resolved.codec}`);
//! ```

use crate::types::{filter_from_u8, to_js_error, JsPixelBuffer, JsSourceImage};
use squeeze_core::{decode_source, resize, CompressError, OutputFormat, RasterEncoder, SourceFormat};
use wasm_bindgen::prelude::*;

/// Decode an image file into a source image.
///
/// The format is sniffed from the bytes, falling back to `file_name` and
/// `mime`. JPEG EXIF orientation is applied.
///
/// # Errors
///
/// Throws for unsupported containers (SVG, HEIC, live photos, PDF) and for
/// corrupted data; the two messages are distinct.
#[wasm_bindgen]
pub fn decode_image(bytes: &[u8], file_name: &str, mime: &str) -> Result<JsSourceImage, JsValue> {
    decode_source(bytes, file_name, mime)
        .map(JsSourceImage::from_source)
        .map_err(to_js_error)
}

/// Sniff the format of a file ("jpeg", "png", "heic", "unknown", ...).
#[wasm_bindgen]
pub fn detect_format(bytes: &[u8], file_name: &str, mime: &str) -> String {
    format!("{:?}", SourceFormat::detect(bytes, file_name, mime)).to_ascii_lowercase()
}

/// Resolve the output codec for a file.
///
/// `output_format` is `"auto"`, a format name or a MIME type. Returns
/// `{ source, codec, supportsQuality }`.
#[wasm_bindgen]
pub fn resolve_format(file_name: &str, mime: &str, output_format: &str) -> Result<JsValue, JsValue> {
    let output: OutputFormat = output_format.parse().map_err(to_js_error)?;
    let resolved =
        squeeze_core::resolve(file_name, mime, output, &RasterEncoder::new()).map_err(to_js_error)?;
    serde_wasm_bindgen::to_value(&resolved).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Resize an image to exact dimensions.
///
/// Large reductions are done in halving stages; no side drops below 8 pixels
/// unless the source itself is smaller.
///
/// # Arguments
///
/// * `filter` - 0 = Nearest, 1 = Bilinear, 2 = CatmullRom, 3 = Lanczos3
#[wasm_bindgen]
pub fn rescale(image: &JsPixelBuffer, width: u32, height: u32, filter: u8) -> Result<JsPixelBuffer, JsValue> {
    rescale_buffer(image, width, height, filter).map_err(to_js_error)
}

/// Resize an image to fit within `max_width` x `max_height`, preserving aspect ratio.
///
/// Never upscales; a bound of 0 means unbounded.
#[wasm_bindgen]
pub fn fit_within(
    image: &JsPixelBuffer,
    max_width: u32,
    max_height: u32,
    filter: u8,
) -> Result<JsPixelBuffer, JsValue> {
    fit_buffer(image, max_width, max_height, filter).map_err(to_js_error)
}

fn rescale_buffer(
    image: &JsPixelBuffer,
    width: u32,
    height: u32,
    filter: u8,
) -> Result<JsPixelBuffer, CompressError> {
    let buffer = image.to_buffer()?;
    resize::rescale(&buffer, width, height, filter_from_u8(filter)).map(JsPixelBuffer::from_buffer)
}

fn fit_buffer(
    image: &JsPixelBuffer,
    max_width: u32,
    max_height: u32,
    filter: u8,
) -> Result<JsPixelBuffer, CompressError> {
    let buffer = image.to_buffer()?;
    let fitted = resize::fit_within(
        &buffer,
        Some(max_width),
        Some(max_height),
        filter_from_u8(filter),
    )?;
    Ok(JsPixelBuffer::from_buffer(fitted.unwrap_or(buffer)))
}
