//! WASM-compatible wrapper types for images and results.
//!
//! These wrap the core squeeze types and handle the conversion between Rust and
//! JavaScript data representations.

use squeeze_core::{CompressError, CompressionResult, FilterType, PixelBuffer, SourceImage};
use wasm_bindgen::prelude::*;

/// An RGBA pixel buffer for JavaScript.
///
/// # Memory Management
///
/// The pixel data is stored in WASM memory. When you call `pixels()`, a copy is made
/// to JavaScript memory as a `Uint8Array`. Keep images in WASM memory between calls
/// and only extract pixels when they are needed (e.g. for an `ImageData` preview).
#[wasm_bindgen]
pub struct JsPixelBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

#[wasm_bindgen]
impl JsPixelBuffer {
    /// Create a new buffer from dimensions and RGBA pixel data (4 bytes per pixel).
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> JsPixelBuffer {
        JsPixelBuffer {
            width,
            height,
            pixels,
        }
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of bytes in the pixel buffer (width * height * 4).
    #[wasm_bindgen(getter)]
    pub fn byte_length(&self) -> usize {
        self.pixels.len()
    }

    /// Returns RGBA pixel data as Uint8Array (copies).
    pub fn pixels(&self) -> Vec<u8> {
        self.pixels.clone()
    }

    /// Explicitly free WASM memory.
    ///
    /// Optional; wasm-bindgen's finalizer will handle cleanup automatically.
    pub fn free(self) {}
}

impl JsPixelBuffer {
    pub(crate) fn from_buffer(buffer: PixelBuffer) -> Self {
        Self {
            width: buffer.width,
            height: buffer.height,
            pixels: buffer.pixels,
        }
    }

    /// Validated core buffer (clones the pixel data).
    pub(crate) fn to_buffer(&self) -> Result<PixelBuffer, CompressError> {
        PixelBuffer::try_new(self.width, self.height, self.pixels.clone())
    }
}

/// A decoded source image, ready for compression.
///
/// Holds the original encoded bytes so the engine can hand them back when a
/// re-encode would only make the file larger.
#[wasm_bindgen]
pub struct JsSourceImage {
    inner: SourceImage,
}

#[wasm_bindgen]
impl JsSourceImage {
    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    /// Size of the original encoded file.
    #[wasm_bindgen(getter)]
    pub fn byte_length(&self) -> usize {
        self.inner.byte_len
    }

    /// Detected source format ("jpeg", "png", "gif", ...).
    #[wasm_bindgen(getter)]
    pub fn format(&self) -> String {
        format_name(&self.inner)
    }

    /// RGBA preview pixels (copies).
    pub fn pixels(&self) -> Vec<u8> {
        self.inner.pixels.pixels.clone()
    }
}

impl JsSourceImage {
    pub(crate) fn from_source(inner: SourceImage) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &SourceImage {
        &self.inner
    }
}

fn format_name(source: &SourceImage) -> String {
    format!("{:?}", source.format).to_ascii_lowercase()
}

/// The outcome of a compression request.
#[wasm_bindgen]
pub struct JsCompressionResult {
    inner: CompressionResult,
}

#[wasm_bindgen]
impl JsCompressionResult {
    /// Encoded bytes as Uint8Array (copies).
    pub fn bytes(&self) -> Vec<u8> {
        self.inner.bytes.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn mime_type(&self) -> String {
        self.inner.mime_type().to_string()
    }

    /// File extension without the dot.
    #[wasm_bindgen(getter)]
    pub fn extension(&self) -> String {
        self.inner.extension().to_string()
    }

    #[wasm_bindgen(getter)]
    pub fn byte_length(&self) -> usize {
        self.inner.byte_len()
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    /// Final quality on a 0-100 scale, if the codec used one.
    #[wasm_bindgen(getter)]
    pub fn quality(&self) -> Option<u8> {
        self.inner
            .quality
            .map(|q| (q * 100.0).round().clamp(0.0, 100.0) as u8)
    }

    /// True when the original file was returned untouched.
    #[wasm_bindgen(getter)]
    pub fn is_original(&self) -> bool {
        self.inner.is_original
    }

    /// Whether the result met a byte budget.
    pub fn fits(&self, target_bytes: usize) -> bool {
        self.inner.fits(target_bytes)
    }
}

impl JsCompressionResult {
    pub(crate) fn from_result(inner: CompressionResult) -> Self {
        Self { inner }
    }
}

/// Convert a u8 filter type value to the core FilterType enum.
///
/// Values:
/// - 0 = Nearest (fastest, lowest quality)
/// - 1 = Bilinear
/// - 2 = CatmullRom (bicubic)
/// - 3 = Lanczos3 (best quality, slowest)
///
/// Any other value defaults to CatmullRom.
pub(crate) fn filter_from_u8(value: u8) -> FilterType {
    match value {
        0 => FilterType::Nearest,
        1 => FilterType::Bilinear,
        3 => FilterType::Lanczos3,
        _ => FilterType::CatmullRom,
    }
}

/// Convert a core error into the string `JsValue` the bindings throw.
pub(crate) fn to_js_error(error: CompressError) -> JsValue {
    JsValue::from_str(&error.to_string())
}
