//! Compression bindings.
//!
//! The contract and (optional) search configuration are plain JS objects with
//! camelCase keys; missing keys take their defaults. Progress is reported to an
//! optional `(phase, percent) => void` callback; errors thrown by the callback
//! are ignored.
//!
//! # Example
//!
//! ```typescript
//! import { compress_bytes } from '@squeeze/wasm';
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const result = compress_bytes(bytes, file.name, file.type,
//!   { quality: 80, targetBytes: 500_000, outputFormat: 'auto' },
//!   (phase, percent) => postMessage({ phase, percent }));
//! const blob = new Blob([result.bytes()], { type: result.mime_type });
//! ```

use crate::types::{to_js_error, JsCompressionResult, JsSourceImage};
use serde::de::DeserializeOwned;
use squeeze_core::{
    compress::{compress, compress_file},
    OutputContract, Phase, RasterEncoder, SearchConfig,
};
use wasm_bindgen::prelude::*;

/// Compress a decoded source image.
///
/// # Arguments
///
/// * `image` - Source from `decode_image`
/// * `contract` - `{ mode, quality, targetBytes, maxWidth, maxHeight, outputFormat }`
/// * `progress` - Optional `(phase, percent)` callback
///
/// An unreachable `targetBytes` does not throw; check `result.fits(target)`.
#[wasm_bindgen]
pub fn compress_image(
    image: &JsSourceImage,
    contract: JsValue,
    progress: Option<js_sys::Function>,
) -> Result<JsCompressionResult, JsValue> {
    compress_image_with_config(image, contract, JsValue::UNDEFINED, progress)
}

/// Like [`compress_image`], with a search configuration object overriding the
/// tuned defaults (`scaleSchedule`, `acceptRatio`, ...).
#[wasm_bindgen]
pub fn compress_image_with_config(
    image: &JsSourceImage,
    contract: JsValue,
    config: JsValue,
    progress: Option<js_sys::Function>,
) -> Result<JsCompressionResult, JsValue> {
    let contract: OutputContract = from_js_or_default(contract)?;
    let config: SearchConfig = from_js_or_default(config)?;
    let mut report = reporter(progress);
    compress(image.inner(), &contract, &RasterEncoder::new(), &config, &mut report)
        .map(JsCompressionResult::from_result)
        .map_err(to_js_error)
}

/// Decode and compress a file in one call.
#[wasm_bindgen]
pub fn compress_bytes(
    bytes: &[u8],
    file_name: &str,
    mime: &str,
    contract: JsValue,
    progress: Option<js_sys::Function>,
) -> Result<JsCompressionResult, JsValue> {
    let contract: OutputContract = from_js_or_default(contract)?;
    let mut report = reporter(progress);
    compress_file(
        bytes,
        file_name,
        mime,
        &contract,
        &RasterEncoder::new(),
        &SearchConfig::default(),
        &mut report,
    )
    .map(JsCompressionResult::from_result)
    .map_err(to_js_error)
}

/// Default search configuration as a JS object, for callers that want to tweak it.
#[wasm_bindgen]
pub fn default_search_config() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&SearchConfig::default())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn from_js_or_default<T: DeserializeOwned + Default>(value: JsValue) -> Result<T, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn reporter(callback: Option<js_sys::Function>) -> impl FnMut(Phase, u8) {
    move |phase, percent| {
        if let Some(callback) = &callback {
            let _ = callback.call2(
                &JsValue::NULL,
                &JsValue::from_str(phase.as_str()),
                &JsValue::from(percent),
            );
        }
    }
}
