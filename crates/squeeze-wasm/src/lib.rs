//! Squeeze WASM - WebAssembly bindings for the Squeeze recompression engine
//!
//! This crate exposes squeeze-core to JavaScript so a Web Worker can run
//! compression off the main thread. Cancel a request by terminating the worker.
//!
//! # Module Structure
//!
//! - `types` - WASM-compatible wrapper types for pixels, sources and results
//! - `decode` - Decoding, format resolution and rescaling bindings
//! - `compress` - Compression bindings with progress callbacks
//!
//! # Usage
//!
//! ```typescript
//! import init, { decode_image, compress_image } from '@squeeze/wasm';
//!
//! // Initialize WASM module (must call first)
//! await init();
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const source = decode_image(bytes, file.name, file.type);
//! const result = compress_image(source, { quality: 75, maxWidth: 2048 });
//! console.log(`${source.byte_length} -> ${result.byte_length} bytes`);
//! ```

use wasm_bindgen::prelude::*;

mod compress;
mod decode;
mod types;

// Re-export public types
pub use compress::{compress_bytes, compress_image, compress_image_with_config, default_search_config};
pub use decode::{decode_image, detect_format, fit_within, rescale, resolve_format};
pub use types::{JsCompressionResult, JsPixelBuffer, JsSourceImage};

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
